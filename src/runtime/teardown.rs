/*!
 * Teardown Stack
 *
 * Callbacks tied to the lifetime of one transport instance. They run once,
 * most recently registered first, while the transport is still up, so
 * cleanup code can depend on it.
 *
 * A failing callback (error or panic) never stops the drain. Failures are
 * collected into the report handed back once every callback has run.
 */

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::{debug, warn};

type Callback = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// One callback that did not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    /// Registration position, 0 = registered first
    pub position: usize,
    pub message: String,
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "teardown callback #{} failed: {}", self.position, self.message)
    }
}

/// Outcome of draining a stack and releasing its transport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub callbacks_run: usize,
    pub failures: Vec<TeardownFailure>,
    pub transport_finalized: bool,
    pub finalize_error: Option<String>,
    pub duration_micros: u64,
}

impl TeardownReport {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.finalize_error.is_none()
    }
}

#[derive(Default)]
pub struct TeardownStack {
    callbacks: Vec<Callback>,
    drained: bool,
}

impl TeardownStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F>(&mut self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push_fallible(move || {
            callback();
            Ok(())
        });
    }

    pub fn push_fallible<F>(&mut self, callback: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        if self.drained {
            warn!("teardown callback registered after drain, discarding");
            return;
        }
        self.callbacks.push(Box::new(callback));
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn is_drained(&self) -> bool {
        self.drained
    }

    /// Run every callback in reverse registration order.
    ///
    /// Only the first call does anything; later calls return an empty report.
    pub fn drain(&mut self) -> TeardownReport {
        if self.drained {
            return TeardownReport::default();
        }
        self.drained = true;

        let start = Instant::now();
        let callbacks = std::mem::take(&mut self.callbacks);
        let mut report = TeardownReport::default();

        for (position, callback) in callbacks.into_iter().enumerate().rev() {
            report.callbacks_run += 1;
            let outcome = catch_unwind(AssertUnwindSafe(callback));
            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("{:#}", e),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };
            report.failures.push(TeardownFailure { position, message });
        }

        report.duration_micros = start.elapsed().as_micros() as u64;
        debug!(
            callbacks = report.callbacks_run,
            failures = report.failures.len(),
            duration_us = report.duration_micros,
            "teardown stack drained"
        );
        report
    }
}

impl fmt::Debug for TeardownStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeardownStack")
            .field("pending", &self.callbacks.len())
            .field("drained", &self.drained)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
