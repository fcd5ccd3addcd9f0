/*!
 * Memory Probes
 * Boundary to OS memory introspection
 */

use super::memory::HardwareMemory;
use crate::core::types::Bytes;
use sysinfo::System;

/// Source of the local process's memory capacity
pub trait MemoryProbe: Send + Sync {
    /// Total memory available to this process, in bytes
    fn total_memory(&self) -> Bytes;

    fn probe(&self) -> HardwareMemory {
        HardwareMemory::with_total_space(self.total_memory())
    }
}

/// Queries the host through `sysinfo`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMemoryProbe;

impl SystemMemoryProbe {
    pub fn new() -> Self {
        Self
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn total_memory(&self) -> Bytes {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.total_memory()
    }
}

/// Reports a constant capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedMemoryProbe(pub Bytes);

impl MemoryProbe for FixedMemoryProbe {
    fn total_memory(&self) -> Bytes {
        self.0
    }
}
