/*!
 * Transport Traits
 * Boundary to the message-passing substrate shared by the process group
 */

use crate::core::types::{GroupSize, Rank};
use miette::Diagnostic;
use thiserror::Error;

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum TransportError {
    #[error("Transport failed to initialize: {0}")]
    #[diagnostic(code(transport::init_failed))]
    InitFailed(String),

    #[error("Transport failed to finalize: {0}")]
    #[diagnostic(code(transport::finalize_failed))]
    FinalizeFailed(String),

    #[error("Collective operation failed: {0}")]
    #[diagnostic(
        code(transport::collective_failed),
        help("All members must take part in every collective, in the same order.")
    )]
    CollectiveFailed(String),

    #[error("Transport is not initialized")]
    #[diagnostic(code(transport::not_initialized))]
    NotInitialized,
}

/// Message-passing transport.
///
/// Calls other than `is_initialized` and `initialize` are only made while the
/// transport is initialized. Collectives block until every member joins.
pub trait Transport: Send + Sync {
    /// Short name for diagnostics
    fn name(&self) -> &str {
        "transport"
    }

    /// Whether the transport is currently running in this process
    fn is_initialized(&self) -> bool;

    /// Start the transport, forwarding command-line style arguments
    fn initialize(&self, args: &[String]) -> TransportResult<()>;

    fn finalize(&self) -> TransportResult<()>;

    /// Rank of the calling process
    fn rank(&self) -> Rank;

    /// Number of members in the group
    fn size(&self) -> GroupSize;

    fn barrier(&self) -> TransportResult<()>;

    /// Every member contributes `payload`; the result holds one entry per
    /// rank, indexed by rank
    fn all_gather(&self, payload: &[u8]) -> TransportResult<Vec<Vec<u8>>>;
}
