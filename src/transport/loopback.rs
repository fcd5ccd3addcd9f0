/*!
 * Loopback Transport
 * In-process transport for single-process runs and tests
 *
 * A loopback group of size N models N identical members: every collective
 * sees the local contribution from each peer.
 */

use super::traits::{Transport, TransportError, TransportResult};
use crate::core::types::{GroupSize, Rank};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

#[derive(Debug)]
pub struct LoopbackTransport {
    size: GroupSize,
    rank: Rank,
    initialized: AtomicBool,
    init_calls: AtomicUsize,
    finalize_calls: AtomicUsize,
    last_args: Mutex<Vec<String>>,
}

impl LoopbackTransport {
    /// One-member group
    pub fn new() -> Self {
        Self::with_group(1, 0)
    }

    /// Group of `size` members with the caller at `rank`.
    ///
    /// # Panics
    ///
    /// Panics when `size` is zero or `rank >= size`.
    pub fn with_group(size: GroupSize, rank: Rank) -> Self {
        assert!(size > 0, "a process group has at least one member");
        assert!(rank < size, "rank {} outside group of size {}", rank, size);
        Self {
            size,
            rank,
            initialized: AtomicBool::new(false),
            init_calls: AtomicUsize::new(0),
            finalize_calls: AtomicUsize::new(0),
            last_args: Mutex::new(Vec::new()),
        }
    }

    /// Already running, as if a host environment started it
    #[must_use]
    pub fn preinitialized(self) -> Self {
        self.initialized.store(true, Ordering::SeqCst);
        self
    }

    pub fn init_count(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn finalize_count(&self) -> usize {
        self.finalize_calls.load(Ordering::SeqCst)
    }

    /// Arguments passed to the most recent `initialize`
    pub fn last_args(&self) -> Vec<String> {
        self.last_args.lock().clone()
    }

    fn ensure_initialized(&self) -> TransportResult<()> {
        if self.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::NotInitialized)
        }
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LoopbackTransport {
    fn name(&self) -> &str {
        "loopback"
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn initialize(&self, args: &[String]) -> TransportResult<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(TransportError::InitFailed("already initialized".into()));
        }
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_args.lock() = args.to_vec();
        debug!(size = self.size, rank = self.rank, args = ?args, "loopback transport up");
        Ok(())
    }

    fn finalize(&self) -> TransportResult<()> {
        if !self.initialized.swap(false, Ordering::SeqCst) {
            return Err(TransportError::FinalizeFailed("not running".into()));
        }
        self.finalize_calls.fetch_add(1, Ordering::SeqCst);
        debug!(size = self.size, rank = self.rank, "loopback transport down");
        Ok(())
    }

    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> GroupSize {
        self.size
    }

    fn barrier(&self) -> TransportResult<()> {
        self.ensure_initialized()
    }

    fn all_gather(&self, payload: &[u8]) -> TransportResult<Vec<Vec<u8>>> {
        self.ensure_initialized()?;
        Ok(vec![payload.to_vec(); self.size])
    }
}
