/*!
 * Runtime Control Block
 *
 * Process-wide state shared by every RuntimeView handle: the transport
 * instance, what was learned about the group at startup, the group logger
 * and the teardown stack.
 *
 * # Lifecycle
 *
 * Idle → Active → Draining → Idle
 *
 * - The first handle in a process starts the transport, or attaches to one
 *   a host environment already started.
 * - Further handles attach to the live block and never reinitialize.
 * - Releasing the last handle marks the registry Draining, drops the
 *   registry lock, drains the teardown stack (LIFO, transport still up) and
 *   then finalizes the transport, but only if this block started it.
 *
 * Acquisition and the decision to tear down are serialized on one
 * process-wide lock, so the transition to zero handles is observed exactly
 * once. Callbacks run without that lock held. Other threads acquiring
 * during a drain wait for it to finish; the draining thread itself is
 * refused.
 */

use super::config::RuntimeConfig;
use super::teardown::{TeardownReport, TeardownStack};
use crate::core::errors::RuntimeError;
use crate::core::types::{GroupSize, Rank, RuntimeResult};
use crate::hardware::{HardwareMemory, MemoryProbe, SystemMemoryProbe};
use crate::logging::{LogTarget, Logger, LoggerFactory, Severity};
use crate::monitoring::LifecycleSpan;
use crate::transport::{LoopbackTransport, Transport};
use parking_lot::{const_mutex, Condvar, Mutex};
use std::sync::{Arc, OnceLock, Weak};
use std::thread::{self, ThreadId};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

enum Registry {
    Idle,
    Active(Weak<ControlBlock>),
    /// Teardown in progress on the given thread
    Draining(ThreadId),
}

static REGISTRY: Mutex<Registry> = const_mutex(Registry::Idle);

static DRAINED: Condvar = Condvar::new();

static LAST_REPORT: Mutex<Option<TeardownReport>> = const_mutex(None);

static DEFAULT_TRANSPORT: OnceLock<Arc<LoopbackTransport>> = OnceLock::new();

/// Transport used when a builder does not supply one: a one-member
/// loopback group shared by the whole process
pub fn default_transport() -> Arc<LoopbackTransport> {
    DEFAULT_TRANSPORT
        .get_or_init(|| Arc::new(LoopbackTransport::new()))
        .clone()
}

/// Report of the most recent teardown completed in this process
pub fn last_teardown_report() -> Option<TeardownReport> {
    LAST_REPORT.lock().clone()
}

/// Whether a runtime instance is currently live in this process.
/// False while the last instance is being torn down.
pub fn is_active() -> bool {
    matches!(&*REGISTRY.lock(), Registry::Active(block) if block.strong_count() > 0)
}

/// Everything needed to bring up a new instance
#[derive(Default)]
pub(crate) struct Activation {
    pub config: RuntimeConfig,
    pub transport: Option<Arc<dyn Transport>>,
    pub probe: Option<Arc<dyn MemoryProbe>>,
}

pub(crate) struct ControlBlock {
    id: Uuid,
    transport: Arc<dyn Transport>,
    owns_transport: bool,
    rank: Rank,
    size: GroupSize,
    /// Indexed by rank
    memories: Vec<HardwareMemory>,
    rank_logger: Logger,
    group_logger: Mutex<Logger>,
    teardown: Mutex<TeardownStack>,
}

/// Attach to the live instance or start a new one.
///
/// Returns the block and whether this call started the transport. Waits
/// while another thread is tearing an instance down; fails when called
/// from inside a teardown callback.
pub(crate) fn acquire(activation: Activation) -> RuntimeResult<(Arc<ControlBlock>, bool)> {
    let mut registry = REGISTRY.lock();

    loop {
        let draining_on = match &*registry {
            Registry::Draining(owner) => Some(*owner),
            _ => None,
        };
        match draining_on {
            Some(owner) if owner == thread::current().id() => {
                return Err(RuntimeError::precondition(
                    "runtime requested from its own teardown callback",
                ));
            }
            Some(_) => DRAINED.wait(&mut registry),
            None => break,
        }
    }

    if let Registry::Active(current) = &*registry {
        if let Some(block) = current.upgrade() {
            if !activation.config.args.is_empty() {
                debug!(
                    instance = %block.id,
                    ignored = ?activation.config.args,
                    "transport already active, startup arguments ignored"
                );
            }
            return Ok((block, false));
        }
    }

    let block = Arc::new(ControlBlock::start(activation)?);
    *registry = Registry::Active(Arc::downgrade(&block));
    let started = block.owns_transport;
    Ok((block, started))
}

/// Drop one handle's reference. The last reference tears the instance down.
pub(crate) fn release(slot: &mut Option<Arc<ControlBlock>>) {
    let Some(block) = slot.take() else {
        return;
    };

    let mut registry = REGISTRY.lock();
    let block = match Arc::try_unwrap(block) {
        Ok(block) => block,
        // Other handles remain; this reference is dropped while still locked
        Err(shared) => {
            drop(shared);
            return;
        }
    };
    *registry = Registry::Draining(thread::current().id());
    drop(registry);

    let _drain = DrainGuard;
    let report = block.teardown();
    *LAST_REPORT.lock() = Some(report);
}

/// Returns the registry to Idle and wakes waiting acquirers, even if
/// teardown unwinds
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        *REGISTRY.lock() = Registry::Idle;
        DRAINED.notify_all();
    }
}

impl ControlBlock {
    fn start(activation: Activation) -> RuntimeResult<Self> {
        let Activation {
            config,
            transport,
            probe,
        } = activation;
        let transport = match transport {
            Some(transport) => transport,
            None => default_transport() as Arc<dyn Transport>,
        };
        let probe = match probe {
            Some(probe) => probe,
            None => Arc::new(SystemMemoryProbe::new()) as Arc<dyn MemoryProbe>,
        };

        let id = Uuid::new_v4();
        let span = LifecycleSpan::new("startup", id);
        let _entered = span.enter();

        let owns_transport = if transport.is_initialized() {
            debug!(transport = transport.name(), "attaching to running transport");
            false
        } else {
            transport
                .initialize(&config.args)
                .map_err(|e| RuntimeError::InitializationFailure(e.to_string()))?;
            true
        };

        match Self::discover(id, transport.clone(), owns_transport, probe.as_ref(), &config) {
            Ok(block) => {
                span.record_group(block.rank, block.size);
                span.record_result(true);
                info!(
                    instance = %id,
                    transport = block.transport.name(),
                    rank = block.rank,
                    size = block.size,
                    started = owns_transport,
                    "runtime active"
                );
                Ok(block)
            }
            Err(e) => {
                span.record_result(false);
                if owns_transport {
                    if let Err(fe) = transport.finalize() {
                        warn!(error = %fe, "finalize after failed startup also failed");
                    }
                }
                Err(e)
            }
        }
    }

    /// Learn the group layout and exchange memory capacities with every peer
    fn discover(
        id: Uuid,
        transport: Arc<dyn Transport>,
        owns_transport: bool,
        probe: &dyn MemoryProbe,
        config: &RuntimeConfig,
    ) -> RuntimeResult<Self> {
        let size = transport.size();
        if size == 0 {
            return Err(RuntimeError::InitializationFailure(
                "transport reported an empty group".into(),
            ));
        }
        let rank = transport.rank();
        if rank >= size {
            return Err(RuntimeError::InitializationFailure(format!(
                "rank {} outside group of size {}",
                rank, size
            )));
        }

        let local = probe.probe();
        let payload = bincode::serialize(&local)?;
        let gathered = transport
            .all_gather(&payload)
            .map_err(|e| RuntimeError::InitializationFailure(e.to_string()))?;
        if gathered.len() != size {
            return Err(RuntimeError::InitializationFailure(format!(
                "memory exchange returned {} entries for a group of {}",
                gathered.len(),
                size
            )));
        }
        let memories = gathered
            .iter()
            .map(|bytes| bincode::deserialize::<HardwareMemory>(bytes))
            .collect::<Result<Vec<_>, _>>()?;

        let group_logger = if rank == 0 {
            make_logger(&config.group_log, "Rank 0", config.severity)
        } else {
            Logger::new()
        };
        let rank_logger = make_logger(&config.rank_log, &format!("Rank {}", rank), config.severity);

        Ok(Self {
            id,
            transport,
            owns_transport,
            rank,
            size,
            memories,
            rank_logger,
            group_logger: Mutex::new(group_logger),
            teardown: Mutex::new(TeardownStack::new()),
        })
    }

    fn teardown(self) -> TeardownReport {
        let ControlBlock {
            id,
            transport,
            owns_transport,
            teardown,
            group_logger,
            rank_logger,
            ..
        } = self;

        let span = LifecycleSpan::new("teardown", id);
        let _entered = span.enter();

        let mut stack = teardown.into_inner();
        let mut report = stack.drain();
        for failure in &report.failures {
            error!(
                instance = %id,
                position = failure.position,
                error = %failure.message,
                "teardown callback failed"
            );
        }

        group_logger.into_inner().flush();
        rank_logger.flush();

        if owns_transport {
            match transport.finalize() {
                Ok(()) => report.transport_finalized = true,
                Err(e) => {
                    error!(instance = %id, error = %e, "transport finalize failed");
                    report.finalize_error = Some(e.to_string());
                }
            }
        } else {
            debug!(instance = %id, "transport owned elsewhere, left running");
        }

        span.record_result(report.is_success());
        info!(
            instance = %id,
            callbacks = report.callbacks_run,
            failures = report.failures.len(),
            finalized = report.transport_finalized,
            "runtime released"
        );
        report
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn rank(&self) -> Rank {
        self.rank
    }

    pub(crate) fn size(&self) -> GroupSize {
        self.size
    }

    pub(crate) fn memory_of(&self, rank: Rank) -> Option<HardwareMemory> {
        self.memories.get(rank).copied()
    }

    pub(crate) fn memories(&self) -> &[HardwareMemory] {
        &self.memories
    }

    pub(crate) fn rank_logger(&self) -> &Logger {
        &self.rank_logger
    }

    pub(crate) fn group_logger(&self) -> Logger {
        self.group_logger.lock().clone()
    }

    pub(crate) fn set_group_logger(&self, logger: Logger) {
        *self.group_logger.lock() = logger;
    }

    /// `f` must not call back into the group logger accessors
    pub(crate) fn with_group_logger<R>(&self, f: impl FnOnce(&mut Logger) -> R) -> R {
        f(&mut self.group_logger.lock())
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub(crate) fn push_teardown<F>(&self, callback: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.teardown.lock().push_fallible(callback);
    }

    pub(crate) fn pending_teardowns(&self) -> usize {
        self.teardown.lock().len()
    }
}

fn make_logger(target: &LogTarget, name: &str, severity: Severity) -> Logger {
    let logger = LoggerFactory::from_target(target, name).unwrap_or_else(|e| {
        warn!(log_target = %target, error = %e, "log target unavailable, using stderr");
        LoggerFactory::stderr(name)
    });
    logger.with_severity(severity)
}
