/*!
 * Runtime View
 * Process-wide entry point to the process group
 *
 * # Example
 *
 * ```ignore
 * let rt = RuntimeView::new()?;
 * rt.logger().info(format!("running on {} ranks", rt.size()));
 *
 * let me = rt.my_resource_set();
 * let memory = me.memory()?;
 *
 * rt.register_teardown(|| flush_checkpoints());
 * // Dropping the last handle runs flush_checkpoints, then finalizes
 * ```
 */

use super::config::RuntimeConfig;
use super::control::{self, Activation, ControlBlock};
use super::resource_set::ResourceSet;
use crate::core::errors::RuntimeError;
use crate::core::types::{GroupSize, Rank, RuntimeResult};
use crate::hardware::{HardwareMemory, MemoryProbe};
use crate::logging::{Logger, Severity};
use crate::transport::{Transport, TransportError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Handle to the process-wide runtime.
///
/// Handles are cheap to clone. All handles in a process refer to the same
/// instance and compare equal. The instance is torn down when the last
/// handle is dropped.
pub struct RuntimeView {
    block: Option<Arc<ControlBlock>>,
    started: bool,
}

impl RuntimeView {
    /// Attach to the running instance, starting the transport if needed
    pub fn new() -> RuntimeResult<Self> {
        Self::builder().build()
    }

    /// Like `new`, forwarding `args` to the transport if this call starts
    /// it. Ignored when an instance is already live.
    pub fn with_args<I, S>(args: I) -> RuntimeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder().with_args(args).build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    fn inner(&self) -> &ControlBlock {
        self.block
            .as_deref()
            .expect("RuntimeView used after release")
    }

    /// True only for the handle (and its clones) whose construction
    /// started the transport
    pub fn started_transport(&self) -> bool {
        self.started
    }

    /// Number of resource sets in the group, always at least one
    pub fn size(&self) -> GroupSize {
        self.inner().size()
    }

    /// Whether the calling process is a member of the group
    pub fn has_me(&self) -> bool {
        self.inner().rank() < self.size()
    }

    pub fn my_rank(&self) -> Rank {
        self.inner().rank()
    }

    pub fn at(&self, index: Rank) -> RuntimeResult<ResourceSet> {
        let size = self.size();
        if index >= size {
            return Err(RuntimeError::out_of_range(index, size));
        }
        Ok(self.resource_set(index))
    }

    pub fn my_resource_set(&self) -> ResourceSet {
        self.resource_set(self.inner().rank())
    }

    fn resource_set(&self, rank: Rank) -> ResourceSet {
        let block = self.inner();
        let is_mine = rank == block.rank();
        let logger = is_mine.then(|| block.rank_logger().clone());
        ResourceSet::bound(rank, is_mine, block.memory_of(rank), logger)
    }

    /// Resource sets in rank order
    pub fn iter(&self) -> impl Iterator<Item = ResourceSet> + '_ {
        (0..self.size()).map(move |rank| self.resource_set(rank))
    }

    /// Number of members whose memory equals `memory`
    pub fn count(&self, memory: &HardwareMemory) -> usize {
        self.inner()
            .memories()
            .iter()
            .filter(|m| *m == memory)
            .count()
    }

    /// Members whose memory equals `memory`, in rank order
    pub fn equal_range(&self, memory: &HardwareMemory) -> Vec<ResourceSet> {
        self.inner()
            .memories()
            .iter()
            .enumerate()
            .filter(|(_, m)| *m == memory)
            .map(|(rank, _)| self.resource_set(rank))
            .collect()
    }

    /// Copy of the group-level logger. Bound on the root rank only, unless
    /// replaced. Changing the threshold on the copy does not affect the
    /// shared logger; use `set_severity` or `with_logger` for that.
    pub fn logger(&self) -> Logger {
        self.inner().group_logger()
    }

    /// Change the shared group logger's threshold for every handle
    pub fn set_severity(&self, level: Severity) {
        self.with_logger(|logger| {
            logger.set_severity(level);
        });
    }

    /// Run `f` against the shared group logger in place.
    ///
    /// `f` must not call `logger`, `set_logger`, `set_severity` or
    /// `with_logger` on any handle.
    ///
    /// ```ignore
    /// rt.with_logger(|log| {
    ///     log.set_severity(Severity::Debug).debug("verbose from here on");
    /// });
    /// ```
    pub fn with_logger<R>(&self, f: impl FnOnce(&mut Logger) -> R) -> R {
        self.inner().with_group_logger(f)
    }

    /// Replace the group logger for every handle in this process
    pub fn set_logger(&self, logger: Logger) {
        self.inner().set_group_logger(logger);
    }

    /// Run `callback` when the instance is torn down, before the transport
    /// is finalized. Callbacks run most recently registered first, without
    /// the registry lock held. Constructing a `RuntimeView` from inside a
    /// callback fails with `PreconditionViolation`; other threads doing so
    /// wait until teardown completes.
    pub fn register_teardown<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner().push_teardown(move || {
            callback();
            Ok(())
        });
    }

    /// Like `register_teardown`; an error is recorded in the teardown
    /// report without stopping the remaining callbacks
    pub fn register_fallible_teardown<F>(&self, callback: F)
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.inner().push_teardown(callback);
    }

    pub fn pending_teardowns(&self) -> usize {
        self.inner().pending_teardowns()
    }

    pub fn barrier(&self) -> RuntimeResult<()> {
        self.inner().transport().barrier()?;
        Ok(())
    }

    /// Collect `value` from every member, indexed by rank
    pub fn gather<T>(&self, value: &T) -> RuntimeResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let payload = bincode::serialize(value)?;
        let gathered = self.inner().transport().all_gather(&payload)?;
        gathered
            .iter()
            .map(|bytes| bincode::deserialize(bytes).map_err(RuntimeError::from))
            .collect()
    }

    /// Combine `value` from every member with `op`, in rank order
    pub fn reduce<T, F>(&self, value: &T, op: F) -> RuntimeResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(T, T) -> T,
    {
        self.gather(value)?
            .into_iter()
            .reduce(op)
            .ok_or_else(|| {
                TransportError::CollectiveFailed("reduce over an empty group".into()).into()
            })
    }

    /// Identifier of the shared instance, for diagnostics
    pub fn instance_id(&self) -> Uuid {
        self.inner().id()
    }

    pub fn transport_name(&self) -> &str {
        self.inner().transport().name()
    }
}

impl Clone for RuntimeView {
    fn clone(&self) -> Self {
        Self {
            block: self.block.clone(),
            started: self.started,
        }
    }
}

impl Drop for RuntimeView {
    fn drop(&mut self) {
        control::release(&mut self.block);
    }
}

/// Handles are equal when they share the live instance
impl PartialEq for RuntimeView {
    fn eq(&self, other: &Self) -> bool {
        match (&self.block, &other.block) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for RuntimeView {}

impl fmt::Debug for RuntimeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block.as_deref() {
            Some(block) => f
                .debug_struct("RuntimeView")
                .field("instance", &block.id())
                .field("rank", &block.rank())
                .field("size", &block.size())
                .field("started_transport", &self.started)
                .finish(),
            None => f.write_str("RuntimeView(<released>)"),
        }
    }
}

/// Configures how the transport is brought up.
///
/// Settings only take effect on the activation that starts a new instance;
/// when one is already live the builder attaches to it.
pub struct RuntimeBuilder {
    activation: Activation,
}

impl RuntimeBuilder {
    /// Starts from `RuntimeConfig::from_env()`
    pub fn new() -> Self {
        Self {
            activation: Activation {
                config: RuntimeConfig::from_env(),
                ..Activation::default()
            },
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.activation.config.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the whole configuration, arguments included
    #[must_use]
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.activation.config = config;
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.activation.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn with_memory_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.activation.probe = Some(probe);
        self
    }

    pub fn build(self) -> RuntimeResult<RuntimeView> {
        let (block, started) = control::acquire(self.activation)?;
        Ok(RuntimeView {
            block: Some(block),
            started,
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
