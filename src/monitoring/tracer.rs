/*!
 * Structured Tracing
 * Process-level subscriber setup and lifecycle spans
 */

use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

pub const TRACE_JSON_ENV: &str = "PROCGROUP_TRACE_JSON";

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - PROCGROUP_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns false when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "structured tracing initialized");
    }
    installed
}

/// Span covering one lifecycle phase (startup, teardown) of a runtime
/// instance. Logs its duration when dropped.
pub struct LifecycleSpan {
    span: tracing::Span,
    start: Instant,
    phase: &'static str,
    instance: Uuid,
}

impl LifecycleSpan {
    pub fn new(phase: &'static str, instance: Uuid) -> Self {
        let span = span!(
            Level::DEBUG,
            "runtime_lifecycle",
            instance = %instance,
            phase = phase,
            rank = tracing::field::Empty,
            size = tracing::field::Empty,
            result = tracing::field::Empty,
        );
        span.in_scope(|| debug!(phase, instance = %instance, "lifecycle phase started"));

        Self {
            span,
            start: Instant::now(),
            phase,
            instance,
        }
    }

    pub fn record_group(&self, rank: usize, size: usize) {
        self.span.record("rank", rank);
        self.span.record("size", size);
    }

    pub fn record_result(&self, success: bool) {
        self.span
            .record("result", if success { "success" } else { "error" });
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for LifecycleSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        if duration.as_secs() >= 5 {
            warn!(
                instance = %self.instance,
                phase = self.phase,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow lifecycle phase"
            );
        } else {
            debug!(
                instance = %self.instance,
                phase = self.phase,
                duration_us = duration.as_micros() as u64,
                "lifecycle phase completed"
            );
        }
    }
}
