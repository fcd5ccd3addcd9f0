/*!
 * Error Types
 * Centralized error handling with thiserror and miette diagnostics
 */

use miette::Diagnostic;
use thiserror::Error;

pub use crate::transport::TransportError;

/// Unified runtime error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum RuntimeError {
    #[error("{index} is not in the range [0, {size})")]
    #[diagnostic(
        code(runtime::out_of_range),
        help("Resource sets are indexed by rank. Valid ranks are 0..size().")
    )]
    OutOfRange { index: usize, size: usize },

    #[error("Precondition violated: {0}")]
    #[diagnostic(
        code(runtime::precondition),
        help("Check is_null()/has_memory()/has_logger() before accessing the resource.")
    )]
    PreconditionViolation(String),

    #[error("Transport initialization failed: {0}")]
    #[diagnostic(
        code(runtime::initialization_failed),
        help("The transport could not be started. This is fatal for the process.")
    )]
    InitializationFailure(String),

    #[error("Transport error: {0}")]
    #[diagnostic(transparent)]
    Transport(#[from] TransportError),

    #[error("Serialization error: {0}")]
    #[diagnostic(
        code(runtime::serialization),
        help("Collective payloads must round-trip through bincode.")
    )]
    Serialization(String),
}

impl RuntimeError {
    pub fn precondition(reason: impl Into<String>) -> Self {
        Self::PreconditionViolation(reason.into())
    }

    pub fn out_of_range(index: usize, size: usize) -> Self {
        Self::OutOfRange { index, size }
    }
}

impl From<bincode::Error> for RuntimeError {
    fn from(err: bincode::Error) -> Self {
        RuntimeError::Serialization(err.to_string())
    }
}
