/*!
 * Monitoring
 * Structured tracing for runtime lifecycle events
 */

mod tracer;

pub use tracer::{init_tracing, LifecycleSpan, TRACE_JSON_ENV};
