/*!
 * Log Sinks
 * Backends a Logger writes to
 *
 * Sinks are configured once and shared. A Logger references its sink, it
 * never owns one exclusively, so two facades pointing at the same sink
 * write to the same place.
 */

use super::severity::Severity;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::OffsetDateTime;

/// Backend for log output
pub trait LogSink: Send + Sync {
    /// Name shown in every line (e.g. "Rank 0")
    fn name(&self) -> &str;

    /// Write one already-filtered message
    fn write(&self, severity: Severity, message: &str) -> io::Result<()>;

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Render `[timestamp] [name] [level] message`
pub fn format_line(name: &str, severity: Severity, message: &str) -> String {
    let now = OffsetDateTime::now_utc();
    let stamp = now
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
        ))
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    format!("[{}] [{}] [{}] {}", stamp, name, severity, message)
}

/// Writes to standard output
#[derive(Debug)]
pub struct StdoutSink {
    name: String,
}

impl StdoutSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl LogSink for StdoutSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, severity: Severity, message: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", format_line(&self.name, severity, message))
    }

    fn flush(&self) -> io::Result<()> {
        io::stdout().lock().flush()
    }
}

/// Writes to standard error
#[derive(Debug)]
pub struct StderrSink {
    name: String,
}

impl StderrSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl LogSink for StderrSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, severity: Severity, message: &str) -> io::Result<()> {
        let mut err = io::stderr().lock();
        writeln!(err, "{}", format_line(&self.name, severity, message))
    }
}

/// Appends to a file, creating it if needed
#[derive(Debug)]
pub struct FileSink {
    name: String,
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            name: name.into(),
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, severity: Severity, message: &str) -> io::Result<()> {
        let line = format_line(&self.name, severity, message);
        let mut file = self.file.lock();
        writeln!(file, "{}", line)
    }

    fn flush(&self) -> io::Result<()> {
        self.file.lock().flush()
    }
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn name(&self) -> &str {
        "null"
    }

    fn write(&self, _severity: Severity, _message: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Keeps messages in memory so they can be inspected
#[derive(Debug, Default)]
pub struct BufferSink {
    name: String,
    records: Mutex<Vec<(Severity, String)>>,
}

impl BufferSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Messages in emission order, without formatting
    pub fn messages(&self) -> Vec<String> {
        self.records.lock().iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn records(&self) -> Vec<(Severity, String)> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl LogSink for BufferSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, severity: Severity, message: &str) -> io::Result<()> {
        self.records.lock().push((severity, message.to_string()));
        Ok(())
    }
}

/// Forwards into the process's `tracing` subscriber
#[derive(Debug)]
pub struct TracingSink {
    name: String,
}

impl TracingSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl LogSink for TracingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, severity: Severity, message: &str) -> io::Result<()> {
        let logger = self.name.as_str();
        match severity {
            Severity::Trace => tracing::trace!(logger, "{}", message),
            Severity::Debug => tracing::debug!(logger, "{}", message),
            Severity::Info => tracing::info!(logger, "{}", message),
            Severity::Warn => tracing::warn!(logger, "{}", message),
            Severity::Error => tracing::error!(logger, "{}", message),
            Severity::Critical => tracing::error!(logger, critical = true, "{}", message),
        }
        Ok(())
    }
}
