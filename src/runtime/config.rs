/*!
 * Runtime Configuration
 *
 * Environment variables:
 * - PROCGROUP_GROUP_LOG: group logger target (default: stdout)
 * - PROCGROUP_RANK_LOG: per-rank logger target (default: stderr)
 * - PROCGROUP_LOG_SEVERITY: threshold for both loggers (default: info)
 *
 * Targets are `stdout`, `stderr`, `null`, `tracing` or `file:<path>`.
 */

use crate::logging::{LogTarget, Severity};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

pub const GROUP_LOG_ENV: &str = "PROCGROUP_GROUP_LOG";
pub const RANK_LOG_ENV: &str = "PROCGROUP_RANK_LOG";
pub const SEVERITY_ENV: &str = "PROCGROUP_LOG_SEVERITY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Forwarded to the transport on first activation only
    pub args: Vec<String>,
    /// Group-level logger; only the root rank binds it
    pub group_log: LogTarget,
    /// Logger attached to the calling process's resource set
    pub rank_log: LogTarget,
    pub severity: Severity,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            group_log: LogTarget::Stdout,
            rank_log: LogTarget::Stderr,
            severity: Severity::Info,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by whatever the environment sets
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(target) = parse_var(&lookup, GROUP_LOG_ENV) {
            config.group_log = target;
        }
        if let Some(target) = parse_var(&lookup, RANK_LOG_ENV) {
            config.rank_log = target;
        }
        if let Some(severity) = parse_var(&lookup, SEVERITY_ENV) {
            config.severity = severity;
        }
        config
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_group_log(mut self, target: LogTarget) -> Self {
        self.group_log = target;
        self
    }

    #[must_use]
    pub fn with_rank_log(mut self, target: LogTarget) -> Self {
        self.rank_log = target;
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(variable = key, value = %raw, error = %e, "ignoring invalid setting");
            None
        }
    }
}
