/*!
 * Logger Factory
 * Constructors for the standard loggers
 */

use super::facade::Logger;
use super::sink::{BufferSink, FileSink, NullSink, StderrSink, StdoutSink, TracingSink};
use crate::core::types::Rank;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Where a configured logger writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum LogTarget {
    Stdout,
    Stderr,
    File(PathBuf),
    Null,
    Tracing,
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogTarget::Stdout => write!(f, "stdout"),
            LogTarget::Stderr => write!(f, "stderr"),
            LogTarget::File(path) => write!(f, "file:{}", path.display()),
            LogTarget::Null => write!(f, "null"),
            LogTarget::Tracing => write!(f, "tracing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log target: {0} (expected stdout, stderr, null, tracing or file:<path>)")]
pub struct ParseLogTargetError(pub String);

impl FromStr for LogTarget {
    type Err = ParseLogTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(path) = trimmed.strip_prefix("file:") {
            if path.is_empty() {
                return Err(ParseLogTargetError(trimmed.to_string()));
            }
            return Ok(LogTarget::File(PathBuf::from(path)));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "stdout" => Ok(LogTarget::Stdout),
            "stderr" => Ok(LogTarget::Stderr),
            "null" | "none" => Ok(LogTarget::Null),
            "tracing" => Ok(LogTarget::Tracing),
            _ => Err(ParseLogTargetError(trimmed.to_string())),
        }
    }
}

pub struct LoggerFactory;

impl LoggerFactory {
    pub fn stdout(name: impl Into<String>) -> Logger {
        Logger::bound(Arc::new(StdoutSink::new(name)))
    }

    pub fn stderr(name: impl Into<String>) -> Logger {
        Logger::bound(Arc::new(StderrSink::new(name)))
    }

    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> io::Result<Logger> {
        let sink = FileSink::open(name, path.into())?;
        Ok(Logger::bound(Arc::new(sink)))
    }

    /// Bound logger that discards output. Unlike an unbound logger it
    /// compares equal only to its own copies.
    pub fn null() -> Logger {
        Logger::bound(Arc::new(NullSink))
    }

    /// In-memory logger; the returned sink lets callers read what was logged
    pub fn buffer(name: impl Into<String>) -> (Logger, Arc<BufferSink>) {
        let sink = Arc::new(BufferSink::new(name));
        (Logger::bound(sink.clone()), sink)
    }

    pub fn tracing(name: impl Into<String>) -> Logger {
        Logger::bound(Arc::new(TracingSink::new(name)))
    }

    pub fn from_target(target: &LogTarget, name: impl Into<String>) -> io::Result<Logger> {
        Ok(match target {
            LogTarget::Stdout => Self::stdout(name),
            LogTarget::Stderr => Self::stderr(name),
            LogTarget::File(path) => Self::file(name, path.clone())?,
            LogTarget::Null => Self::null(),
            LogTarget::Tracing => Self::tracing(name),
        })
    }

    /// Group-level logger: the root rank prints to stdout, everyone else is
    /// unbound so output is not repeated once per process
    pub fn default_global_logger(rank: Rank) -> Logger {
        if rank == 0 {
            Self::stdout("Rank 0")
        } else {
            Logger::new()
        }
    }
}
