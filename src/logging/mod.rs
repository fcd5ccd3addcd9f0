/*!
 * Logging Module
 * Thin, ownership-safe facade over one sink per resource
 */

pub mod facade;
pub mod factory;
pub mod severity;
pub mod sink;

pub use facade::Logger;
pub use factory::{LogTarget, LoggerFactory, ParseLogTargetError};
pub use severity::{ParseSeverityError, Severity};
pub use sink::{BufferSink, FileSink, LogSink, NullSink, StderrSink, StdoutSink, TracingSink};
