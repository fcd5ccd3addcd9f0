/*!
 * Transport Boundary Tests
 * Exercises startup/shutdown against a mocked transport
 */

use mockall::mock;
use procgroup::transport::TransportResult;
use procgroup::{
    FixedMemoryProbe, GroupSize, LogTarget, Rank, RuntimeConfig, RuntimeError, RuntimeView,
    Transport, TransportError,
};
use serial_test::serial;
use std::sync::Arc;

mock! {
    pub Net {}

    impl Transport for Net {
        fn is_initialized(&self) -> bool;
        fn initialize(&self, args: &[String]) -> TransportResult<()>;
        fn finalize(&self) -> TransportResult<()>;
        fn rank(&self) -> Rank;
        fn size(&self) -> GroupSize;
        fn barrier(&self) -> TransportResult<()>;
        fn all_gather(&self, payload: &[u8]) -> TransportResult<Vec<Vec<u8>>>;
    }
}

fn start(net: MockNet, args: &[&str]) -> Result<RuntimeView, RuntimeError> {
    let config = RuntimeConfig::default()
        .with_group_log(LogTarget::Null)
        .with_rank_log(LogTarget::Null)
        .with_args(args.iter().copied());
    RuntimeView::builder()
        .with_config(config)
        .with_transport(Arc::new(net))
        .with_memory_probe(Arc::new(FixedMemoryProbe(4 << 30)))
        .build()
}

fn group_of(net: &mut MockNet, size: GroupSize, rank: Rank) {
    net.expect_size().return_const(size);
    net.expect_rank().return_const(rank);
    net.expect_all_gather()
        .returning(move |payload| Ok(vec![payload.to_vec(); size]));
}

#[test]
#[serial]
fn test_starts_and_finalizes_once() {
    let mut net = MockNet::new();
    net.expect_is_initialized().times(1).return_const(false);
    net.expect_initialize()
        .withf(|args| args == ["-np".to_string(), "2".to_string()])
        .times(1)
        .returning(|_| Ok(()));
    group_of(&mut net, 2, 1);
    net.expect_finalize().times(1).returning(|| Ok(()));

    let rt = start(net, &["-np", "2"]).unwrap();
    assert!(rt.started_transport());
    assert_eq!(rt.size(), 2);
    assert_eq!(rt.my_rank(), 1);
    assert_eq!(rt.transport_name(), "transport");
    drop(rt);

    assert!(last_report_finalized());
}

#[test]
#[serial]
fn test_host_initialized_transport_untouched() {
    let mut net = MockNet::new();
    net.expect_is_initialized().return_const(true);
    net.expect_initialize().times(0);
    net.expect_finalize().times(0);
    group_of(&mut net, 3, 0);

    let rt = start(net, &[]).unwrap();
    assert!(!rt.started_transport());
    assert_eq!(rt.size(), 3);
    drop(rt);

    assert!(!last_report_finalized());
}

#[test]
#[serial]
fn test_initialize_failure() {
    let mut net = MockNet::new();
    net.expect_is_initialized().return_const(false);
    net.expect_initialize()
        .times(1)
        .returning(|_| Err(TransportError::InitFailed("no launcher".into())));
    net.expect_finalize().times(0);

    match start(net, &[]) {
        Err(RuntimeError::InitializationFailure(msg)) => assert!(msg.contains("no launcher")),
        other => panic!("expected InitializationFailure, got {:?}", other),
    }
    assert!(!procgroup::runtime::is_active());
}

#[test]
#[serial]
fn test_failed_exchange_finalizes_started_transport() {
    let mut net = MockNet::new();
    net.expect_is_initialized().return_const(false);
    net.expect_initialize().times(1).returning(|_| Ok(()));
    net.expect_size().return_const(2usize);
    net.expect_rank().return_const(0usize);
    net.expect_all_gather()
        .returning(|_| Err(TransportError::CollectiveFailed("peer vanished".into())));
    net.expect_finalize().times(1).returning(|| Ok(()));

    let err = start(net, &[]).unwrap_err();
    assert!(matches!(err, RuntimeError::InitializationFailure(_)));
    assert!(!procgroup::runtime::is_active());
}

#[test]
#[serial]
fn test_empty_group_rejected() {
    let mut net = MockNet::new();
    net.expect_is_initialized().return_const(true);
    net.expect_size().return_const(0usize);
    net.expect_finalize().times(0);

    let err = start(net, &[]).unwrap_err();
    assert!(matches!(err, RuntimeError::InitializationFailure(_)));
}

#[test]
#[serial]
fn test_barrier_forwarded() {
    let mut net = MockNet::new();
    net.expect_is_initialized().return_const(true);
    group_of(&mut net, 1, 0);
    net.expect_barrier()
        .times(1)
        .returning(|| Err(TransportError::NotInitialized));

    let rt = start(net, &[]).unwrap();
    let err = rt.barrier().unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Transport(TransportError::NotInitialized)
    ));
}

#[test]
#[serial]
fn test_gather_uses_all_gather() {
    let mut net = MockNet::new();
    net.expect_is_initialized().return_const(true);
    net.expect_size().return_const(2usize);
    net.expect_rank().return_const(0usize);
    let memory = bincode::serialize(&procgroup::HardwareMemory::with_total_space(4 << 30)).unwrap();
    let value = bincode::serialize(&7i32).unwrap();
    let peer = bincode::serialize(&35i32).unwrap();
    net.expect_all_gather()
        .withf(move |p| p == memory.as_slice())
        .returning(move |p| Ok(vec![p.to_vec(); 2]));
    net.expect_all_gather()
        .withf(move |p| p == value.as_slice())
        .returning(move |p| Ok(vec![p.to_vec(), peer.clone()]));

    let rt = start(net, &[]).unwrap();
    assert_eq!(rt.gather(&7i32).unwrap(), vec![7, 35]);
    assert_eq!(rt.reduce(&7i32, |a, b| a + b).unwrap(), 42);
}

fn last_report_finalized() -> bool {
    procgroup::last_teardown_report()
        .map(|report| report.transport_finalized)
        .unwrap_or(false)
}
