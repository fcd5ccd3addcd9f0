/*!
 * Hardware Module
 * Memory capacity values and host introspection
 */

pub mod memory;
pub mod probe;

pub use memory::HardwareMemory;
pub use probe::{FixedMemoryProbe, MemoryProbe, SystemMemoryProbe};
