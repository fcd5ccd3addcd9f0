/*!
 * Resource Set Tests
 */

use pretty_assertions::assert_eq;
use procgroup::{
    FixedMemoryProbe, HardwareMemory, LogTarget, LoggerFactory, LoopbackTransport, ResourceSet,
    RuntimeConfig, RuntimeError, RuntimeView,
};
use serial_test::serial;
use std::sync::Arc;

fn two_member_group() -> RuntimeView {
    let config = RuntimeConfig::default()
        .with_group_log(LogTarget::Null)
        .with_rank_log(LogTarget::Null);
    RuntimeView::builder()
        .with_config(config)
        .with_transport(Arc::new(LoopbackTransport::with_group(2, 1)))
        .with_memory_probe(Arc::new(FixedMemoryProbe(8 << 30)))
        .build()
        .unwrap()
}

#[test]
fn test_null_resource_set() {
    let rs = ResourceSet::new();

    assert!(rs.is_null());
    assert!(rs.is_empty());
    assert!(!rs.is_mine());
    assert!(!rs.has_memory());
    assert!(!rs.has_logger());
    assert!(matches!(rs.rank(), Err(RuntimeError::PreconditionViolation(_))));
    assert!(matches!(rs.memory(), Err(RuntimeError::PreconditionViolation(_))));
    assert!(matches!(rs.logger(), Err(RuntimeError::PreconditionViolation(_))));
    assert_eq!(rs, ResourceSet::default());
}

#[test]
fn test_null_rejects_logger() {
    let mut rs = ResourceSet::new();
    assert!(rs.set_logger(LoggerFactory::null()).is_err());
    assert!(rs.is_null());
}

#[test]
#[serial]
fn test_bound_differs_from_null() {
    let rt = RuntimeView::new().unwrap();
    let mine = rt.my_resource_set();

    assert!(!mine.is_null());
    assert!(!mine.is_empty());
    assert!(mine.has_memory());
    assert!(mine.has_logger());
    assert_ne!(mine, ResourceSet::new());
}

#[test]
#[serial]
fn test_peer_has_memory_but_no_logger() {
    let rt = two_member_group();
    let peer = rt.at(0).unwrap();

    assert_eq!(peer.rank().unwrap(), 0);
    assert!(!peer.is_mine());
    assert_eq!(peer.memory().unwrap(), HardwareMemory::with_total_space(8 << 30));
    assert!(matches!(peer.logger(), Err(RuntimeError::PreconditionViolation(_))));
}

#[test]
#[serial]
fn test_copies_are_independent() {
    let rt = two_member_group();
    let original = rt.my_resource_set();
    let mut copy = original.clone();
    assert_eq!(copy, original);

    let (logger, _sink) = LoggerFactory::buffer("replacement");
    copy.set_logger(logger.clone()).unwrap();

    assert_eq!(copy.logger().unwrap(), logger);
    assert_ne!(original.logger().unwrap(), logger);
    assert_ne!(copy, original);
    // The runtime keeps handing out the original
    assert_eq!(rt.my_resource_set(), original);
}

#[test]
#[serial]
fn test_logger_threshold_per_copy() {
    let rt = two_member_group();
    let rs = rt.my_resource_set();

    let mut a = rs.logger().unwrap();
    let b = rs.logger().unwrap();
    a.set_severity(procgroup::Severity::Critical);

    assert_eq!(a, b);
    assert_ne!(a.severity(), b.severity());
}
