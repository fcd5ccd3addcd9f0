/*!
 * Resource Set
 * View of the resources belonging to one member of the process group
 *
 * A resource set is either null (default, bound to no rank) or bound to a
 * rank. Bound sets are only produced by a RuntimeView. Accessors hand out
 * copies, so nothing obtained from a resource set can change it.
 */

use crate::core::errors::RuntimeError;
use crate::core::types::{Rank, RuntimeResult};
use crate::hardware::HardwareMemory;
use crate::logging::Logger;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    rank: Rank,
    is_mine: bool,
    memory: Option<HardwareMemory>,
    logger: Option<Logger>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Binding {
    #[default]
    Null,
    Bound(Bound),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSet {
    binding: Binding,
}

impl ResourceSet {
    /// Null resource set
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bound(
        rank: Rank,
        is_mine: bool,
        memory: Option<HardwareMemory>,
        logger: Option<Logger>,
    ) -> Self {
        Self {
            binding: Binding::Bound(Bound {
                rank,
                is_mine,
                memory,
                logger,
            }),
        }
    }

    fn require_bound(&self, what: &str) -> RuntimeResult<&Bound> {
        match &self.binding {
            Binding::Bound(bound) => Ok(bound),
            Binding::Null => Err(RuntimeError::precondition(format!(
                "{} requested from a null ResourceSet",
                what
            ))),
        }
    }

    pub fn rank(&self) -> RuntimeResult<Rank> {
        self.require_bound("rank").map(|bound| bound.rank)
    }

    /// True only for the set describing the calling process
    pub fn is_mine(&self) -> bool {
        matches!(&self.binding, Binding::Bound(bound) if bound.is_mine)
    }

    pub fn has_memory(&self) -> bool {
        matches!(&self.binding, Binding::Bound(Bound { memory: Some(_), .. }))
    }

    pub fn memory(&self) -> RuntimeResult<HardwareMemory> {
        let bound = self.require_bound("memory")?;
        bound.memory.ok_or_else(|| {
            RuntimeError::precondition(format!("rank {} has no memory information", bound.rank))
        })
    }

    pub fn has_logger(&self) -> bool {
        matches!(&self.binding, Binding::Bound(Bound { logger: Some(_), .. }))
    }

    pub fn logger(&self) -> RuntimeResult<Logger> {
        let bound = self.require_bound("logger")?;
        bound.logger.clone().ok_or_else(|| {
            RuntimeError::precondition(format!("rank {} has no logger", bound.rank))
        })
    }

    /// Replace this copy's logger
    pub fn set_logger(&mut self, logger: Logger) -> RuntimeResult<()> {
        match &mut self.binding {
            Binding::Bound(bound) => {
                bound.logger = Some(logger);
                Ok(())
            }
            Binding::Null => Err(RuntimeError::precondition(
                "cannot attach a logger to a null ResourceSet",
            )),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.binding, Binding::Null)
    }

    /// Same as `is_null`: only null sets carry no resources
    pub fn is_empty(&self) -> bool {
        self.is_null()
    }
}
