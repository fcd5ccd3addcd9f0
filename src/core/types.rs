/*!
 * Core Types
 * Common types used across the runtime
 */

/// Zero-based index of a member within the process group
pub type Rank = usize;

/// Number of members in the process group
pub type GroupSize = usize;

/// Byte count for memory capacities
pub type Bytes = u64;

/// Common result type for runtime operations
pub type RuntimeResult<T> = Result<T, super::errors::RuntimeError>;
