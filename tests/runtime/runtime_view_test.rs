/*!
 * Runtime View Tests
 * Startup/attach semantics, rank queries and collectives
 */

use pretty_assertions::assert_eq;
use procgroup::runtime::default_transport;
use procgroup::{
    FixedMemoryProbe, HardwareMemory, LogTarget, Logger, LoggerFactory, LoopbackTransport,
    RuntimeConfig, RuntimeError, RuntimeView, Severity, Transport,
};
use serial_test::serial;
use std::sync::Arc;

const GIB: u64 = 1 << 30;

fn quiet() -> RuntimeConfig {
    RuntimeConfig::default()
        .with_group_log(LogTarget::Null)
        .with_rank_log(LogTarget::Null)
}

fn group(size: usize, rank: usize) -> (Arc<LoopbackTransport>, RuntimeView) {
    let transport = Arc::new(LoopbackTransport::with_group(size, rank));
    let rt = RuntimeView::builder()
        .with_config(quiet())
        .with_transport(transport.clone())
        .with_memory_probe(Arc::new(FixedMemoryProbe(16 * GIB)))
        .build()
        .expect("loopback group should start");
    (transport, rt)
}

#[test]
#[serial]
fn test_default_construction() {
    let first = RuntimeView::new().expect("default runtime");
    assert!(first.size() >= 1);
    assert!(first.has_me());
    assert!(first.started_transport());

    let second = RuntimeView::new().expect("attach to running runtime");
    assert!(!second.started_transport());
    assert_eq!(first, second);
    assert_eq!(first.instance_id(), second.instance_id());
    assert_eq!(first.transport_name(), "loopback");
}

#[test]
#[serial]
fn test_clone_keeps_started_flag() {
    let rt = RuntimeView::new().unwrap();
    let copy = rt.clone();
    assert_eq!(copy, rt);
    assert_eq!(copy.started_transport(), rt.started_transport());
}

#[test]
#[serial]
fn test_at_bounds() {
    let rt = RuntimeView::new().unwrap();
    let n = rt.size();

    assert!(rt.at(n - 1).is_ok());
    match rt.at(n) {
        Err(RuntimeError::OutOfRange { index, size }) => {
            assert_eq!(index, n);
            assert_eq!(size, n);
        }
        other => panic!("expected OutOfRange, got {:?}", other),
    }
    assert!(matches!(rt.at(n + 10), Err(RuntimeError::OutOfRange { .. })));
}

#[test]
#[serial]
fn test_my_resource_set() {
    let rt = RuntimeView::new().unwrap();
    let me = rt.my_resource_set();

    assert!(me.is_mine());
    assert!(!me.is_null());
    assert_eq!(me.rank().unwrap(), rt.my_rank());
    assert_eq!(rt.at(rt.my_rank()).unwrap(), me);

    for i in 0..rt.size() {
        assert_eq!(rt.at(i).unwrap().is_mine(), i == rt.my_rank());
    }
}

#[test]
#[serial]
fn test_memory_from_host_probe() {
    let rt = RuntimeView::new().unwrap();
    let rs = rt.my_resource_set();
    let m = rs.memory().unwrap();

    assert!(m.total_space() > 0);
    assert_eq!(m, rs.memory().unwrap());
}

#[test]
#[serial]
fn test_count_single_member() {
    let rt = RuntimeView::new().unwrap();
    let mine = rt.my_resource_set().memory().unwrap();

    assert_eq!(rt.count(&mine), 1);
    assert_eq!(rt.count(&HardwareMemory::empty()), 0);
    assert_eq!(rt.equal_range(&mine), vec![rt.my_resource_set()]);
}

#[test]
#[serial]
fn test_loopback_group_view() {
    let (_transport, rt) = group(4, 2);

    assert_eq!(rt.size(), 4);
    assert_eq!(rt.my_rank(), 2);
    assert!(rt.started_transport());

    let peer = rt.at(0).unwrap();
    assert!(!peer.is_mine());
    assert!(peer.has_memory());
    assert!(!peer.has_logger());
    assert_eq!(peer.memory().unwrap(), HardwareMemory::with_total_space(16 * GIB));

    let mine = rt.my_resource_set();
    assert!(mine.has_logger());
    assert_ne!(peer, mine);

    let memory = mine.memory().unwrap();
    assert_eq!(rt.count(&memory), 4);
    assert_eq!(rt.count(&HardwareMemory::with_total_space(GIB)), 0);

    let ranks: Vec<usize> = rt.equal_range(&memory).iter().map(|rs| rs.rank().unwrap()).collect();
    assert_eq!(ranks, vec![0, 1, 2, 3]);

    let mine_count = rt.iter().filter(|rs| rs.is_mine()).count();
    assert_eq!(mine_count, 1);
}

#[test]
#[serial]
fn test_args_only_forwarded_on_first_activation() {
    let transport = Arc::new(LoopbackTransport::new());
    let first = RuntimeView::builder()
        .with_config(quiet())
        .with_transport(transport.clone())
        .with_args(["--verbose", "-n", "2"])
        .build()
        .unwrap();
    assert!(first.started_transport());
    assert_eq!(transport.last_args(), vec!["--verbose", "-n", "2"]);

    let second = RuntimeView::with_args(["--other"]).unwrap();
    assert!(!second.started_transport());
    assert_eq!(second, first);
    assert_eq!(transport.init_count(), 1);
    assert_eq!(transport.last_args(), vec!["--verbose", "-n", "2"]);
}

#[test]
#[serial]
fn test_restart_after_release() {
    let transport = default_transport();
    let before = transport.init_count();

    let first_id = {
        let rt = RuntimeView::new().unwrap();
        assert!(rt.started_transport());
        rt.register_teardown(|| {});
        rt.instance_id()
    };
    assert!(!transport.is_initialized());
    assert!(!procgroup::runtime::is_active());

    let rt = RuntimeView::new().unwrap();
    assert!(rt.started_transport());
    assert_eq!(rt.pending_teardowns(), 0);
    assert_ne!(rt.instance_id(), first_id);
    assert_eq!(transport.init_count(), before + 2);
}

#[test]
#[serial]
fn test_group_logger_bound_on_root_only() {
    let rt = RuntimeView::new().unwrap();
    assert_eq!(rt.my_rank(), 0);
    assert!(rt.logger().is_bound());
    drop(rt);

    let (_transport, peer) = group(3, 1);
    assert_eq!(peer.logger(), Logger::new());
    // Unbound loggers accept calls without failing
    peer.logger().info("nobody hears this").critical("or this");
}

#[test]
#[serial]
fn test_set_logger_shared_across_handles() {
    let rt = RuntimeView::builder().with_config(quiet()).build().unwrap();
    let other = rt.clone();
    let (logger, sink) = LoggerFactory::buffer("group");

    rt.set_logger(logger.clone());
    assert_eq!(other.logger(), logger);

    other.logger().info("hello").debug("hidden").warn("careful");
    assert_eq!(sink.messages(), vec!["hello", "careful"]);
}

#[test]
#[serial]
fn test_configured_severity_applies() {
    let config = quiet().with_severity(Severity::Error);
    let rt = RuntimeView::builder().with_config(config).build().unwrap();
    assert_eq!(rt.logger().severity(), Severity::Error);
    assert_eq!(rt.my_resource_set().logger().unwrap().severity(), Severity::Error);
}

#[test]
#[serial]
fn test_gather_and_reduce() {
    let (_transport, rt) = group(3, 0);

    let gathered = rt.gather(&vec!["Hello".to_string(); 3]).unwrap();
    assert_eq!(gathered, vec![vec!["Hello".to_string(); 3]; 3]);

    let sum = rt.reduce(&2u64, |a, b| a + b).unwrap();
    assert_eq!(sum, 6);

    rt.barrier().unwrap();
}

#[test]
#[serial]
fn test_group_severity_shared_across_handles() {
    let rt = RuntimeView::builder().with_config(quiet()).build().unwrap();
    let other = rt.clone();
    let (logger, sink) = LoggerFactory::buffer("group");
    rt.set_logger(logger);

    // Only the copy changes
    rt.logger().set_severity(Severity::Critical);
    assert_eq!(rt.logger().severity(), Severity::Info);

    rt.set_severity(Severity::Critical);
    assert_eq!(other.logger().severity(), Severity::Critical);

    for level in Severity::ALL {
        other.logger().log_at(level, format!("at {}", level));
    }
    assert_eq!(sink.records().len(), 1);
    assert_eq!(sink.records()[0].0, Severity::Critical);
}

#[test]
#[serial]
fn test_with_logger_mutates_in_place() {
    let rt = RuntimeView::builder().with_config(quiet()).build().unwrap();
    let (logger, sink) = LoggerFactory::buffer("group");
    rt.set_logger(logger);

    let name = rt.with_logger(|log| {
        log.set_severity(Severity::Debug).debug("now visible");
        log.name().map(str::to_string)
    });
    assert_eq!(name.as_deref(), Some("group"));

    rt.logger().debug("still visible");
    assert_eq!(sink.messages(), vec!["now visible", "still visible"]);
}
