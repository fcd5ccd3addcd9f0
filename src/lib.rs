/*!
 * Process Group Runtime
 *
 * One consistent view, per process, of the cooperating processes in a
 * distributed run: how many there are, which resources (memory, logging)
 * belong to the caller or to a given peer, and ordered startup/shutdown of
 * the transport they share.
 */

pub mod core;
pub mod hardware;
pub mod logging;
pub mod monitoring;
pub mod runtime;
pub mod transport;

// Re-exports
pub use crate::core::{Bytes, GroupSize, Rank, RuntimeError, RuntimeResult};
pub use hardware::{FixedMemoryProbe, HardwareMemory, MemoryProbe, SystemMemoryProbe};
pub use logging::{LogSink, LogTarget, Logger, LoggerFactory, Severity};
pub use monitoring::init_tracing;
pub use runtime::{
    last_teardown_report, ResourceSet, RuntimeBuilder, RuntimeConfig, RuntimeView,
    TeardownReport, TeardownStack,
};
pub use transport::{LoopbackTransport, Transport, TransportError};
