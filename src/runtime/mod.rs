/*!
 * Runtime Module
 * Process-group handle, resource sets and teardown ordering
 */

pub mod config;
mod control;
pub mod resource_set;
pub mod teardown;
pub mod view;

pub use config::RuntimeConfig;
pub use control::{default_transport, is_active, last_teardown_report};
pub use resource_set::ResourceSet;
pub use teardown::{TeardownFailure, TeardownReport, TeardownStack};
pub use view::{RuntimeBuilder, RuntimeView};
