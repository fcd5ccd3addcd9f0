/*!
 * Hardware Memory
 * Value type describing the memory capacity available to one resource set
 */

use crate::core::types::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Total memory capacity of a resource.
///
/// Either empty (nothing known about the memory) or a non-zero capacity in
/// bytes. A capacity of zero is normalized to empty, so equality is plain
/// value equality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HardwareMemory {
    total: Option<Bytes>,
}

impl HardwareMemory {
    /// Memory with no information attached
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self { total: None }
    }

    #[inline]
    #[must_use]
    pub const fn with_total_space(bytes: Bytes) -> Self {
        if bytes == 0 {
            Self::empty()
        } else {
            Self { total: Some(bytes) }
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.total.is_none()
    }

    /// Capacity in bytes, 0 when empty
    #[inline]
    pub const fn total_space(&self) -> Bytes {
        match self.total {
            Some(bytes) => bytes,
            None => 0,
        }
    }
}

impl From<Bytes> for HardwareMemory {
    fn from(bytes: Bytes) -> Self {
        Self::with_total_space(bytes)
    }
}

impl fmt::Display for HardwareMemory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.total {
            Some(bytes) => write!(f, "{} bytes", bytes),
            None => write!(f, "<empty>"),
        }
    }
}
