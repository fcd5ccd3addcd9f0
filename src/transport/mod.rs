/*!
 * Transport Module
 * Message-passing boundary and the in-tree loopback implementation
 */

pub mod loopback;
pub mod traits;

pub use loopback::LoopbackTransport;
pub use traits::{Transport, TransportError, TransportResult};
