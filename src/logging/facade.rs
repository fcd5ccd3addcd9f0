/*!
 * Logger Facade
 * Severity-filtered handle over one shared sink
 *
 * A Logger is either unbound (no sink, every call is accepted and dropped)
 * or bound to exactly one sink plus its own minimum severity. Cloning a
 * Logger copies the threshold and shares the sink, so adjusting the
 * threshold on a copy never affects the original.
 */

use super::severity::Severity;
use super::sink::LogSink;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Logger {
    sink: Option<Arc<dyn LogSink>>,
    threshold: Severity,
}

impl Logger {
    /// Unbound logger
    pub fn new() -> Self {
        Self::default()
    }

    /// Logger writing to `sink` at the default threshold (info)
    pub fn bound(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink: Some(sink),
            threshold: Severity::default(),
        }
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.sink.is_some()
    }

    #[inline]
    pub fn severity(&self) -> Severity {
        self.threshold
    }

    /// Name of the sink, if any
    pub fn name(&self) -> Option<&str> {
        self.sink.as_deref().map(|s| s.name())
    }

    /// Messages below `level` are suppressed from now on
    pub fn set_severity(&mut self, level: Severity) -> &mut Self {
        self.threshold = level;
        self
    }

    /// Builder-style `set_severity`
    #[must_use]
    pub fn with_severity(mut self, level: Severity) -> Self {
        self.threshold = level;
        self
    }

    #[inline]
    pub fn would_log(&self, level: Severity) -> bool {
        self.sink.is_some() && level >= self.threshold
    }

    /// Log at info
    pub fn log(&mut self, message: impl AsRef<str>) -> &mut Self {
        self.log_at(Severity::Info, message)
    }

    pub fn log_at(&mut self, level: Severity, message: impl AsRef<str>) -> &mut Self {
        if let Some(sink) = &self.sink {
            if level >= self.threshold {
                if let Err(e) = sink.write(level, message.as_ref()) {
                    tracing::warn!(sink = sink.name(), error = %e, "log sink write failed");
                }
            }
        }
        self
    }

    pub fn trace(&mut self, message: impl AsRef<str>) -> &mut Self {
        self.log_at(Severity::Trace, message)
    }

    pub fn debug(&mut self, message: impl AsRef<str>) -> &mut Self {
        self.log_at(Severity::Debug, message)
    }

    pub fn info(&mut self, message: impl AsRef<str>) -> &mut Self {
        self.log_at(Severity::Info, message)
    }

    pub fn warn(&mut self, message: impl AsRef<str>) -> &mut Self {
        self.log_at(Severity::Warn, message)
    }

    pub fn error(&mut self, message: impl AsRef<str>) -> &mut Self {
        self.log_at(Severity::Error, message)
    }

    pub fn critical(&mut self, message: impl AsRef<str>) -> &mut Self {
        self.log_at(Severity::Critical, message)
    }

    pub fn flush(&self) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.flush() {
                tracing::warn!(sink = sink.name(), error = %e, "log sink flush failed");
            }
        }
    }
}

/// Unbound loggers are equal to each other; bound loggers are equal when
/// they share a sink. Thresholds are not compared.
impl PartialEq for Logger {
    fn eq(&self, other: &Self) -> bool {
        match (&self.sink, &other.sink) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Logger {}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("sink", &self.name())
            .field("threshold", &self.threshold)
            .finish()
    }
}
