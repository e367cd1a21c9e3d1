//! Turns built component handles into fresh per-shard stage state.

use crate::component::{ComponentHandle, ComponentKind};
use crate::error::{JobError, Result, ResultExt};
use crate::pipeline::plan::PipelinePlan;
use crate::pipeline::stage::{AnyStage, BuiltinStage};
use crate::pipeline::stages::{
    CaloCellStage, CaloNtupleStage, ClusterStage, EventReaderStage, RawNtupleStage, RingerStage,
    TruthStage,
};
use crate::source::{FileSourceProvider, SourceProvider};
use std::sync::Arc;

/// Creates stage instances. Shared by all shards; every call to
/// [`StageFactory::instantiate`] returns independent state.
#[derive(Clone)]
pub struct StageFactory {
    sources: Arc<dyn SourceProvider>,
}

impl StageFactory {
    pub fn new(sources: Arc<dyn SourceProvider>) -> Self {
        Self { sources }
    }

    /// Factory reading events from the reader's `FileName`.
    pub fn with_files() -> Self {
        Self::new(Arc::new(FileSourceProvider))
    }

    /// Instantiate every non-source stage once and discard it. Surfaces
    /// cross-component configuration errors before any shard starts.
    pub fn check(&self, plan: &PipelinePlan) -> Result<()> {
        for handle in plan.stages() {
            if handle.kind() != ComponentKind::EventReader {
                self.create(handle)?;
            }
        }
        Ok(())
    }

    /// Events available from the plan's source, when it knows.
    pub fn available_events(&self, plan: &PipelinePlan) -> Result<Option<u64>> {
        let reader = plan
            .source()
            .ok_or_else(|| JobError::InvalidState("plan has no event source".into()))?;
        let source = self.sources.open(reader)?;
        Ok(source.event_count())
    }

    /// Fresh stage state for one shard, in plan order.
    pub fn instantiate(&self, plan: &PipelinePlan) -> Result<Vec<AnyStage>> {
        plan.stages()
            .iter()
            .map(|handle| {
                self.create(handle)
                    .map(AnyStage::Builtin)
                    .with_context(|| format!("Failed to instantiate '{}'", handle.name()))
            })
            .collect()
    }

    pub fn create(&self, handle: &ComponentHandle) -> Result<BuiltinStage> {
        let stage = match handle.kind() {
            ComponentKind::EventReader => {
                let source = self.sources.open(handle)?;
                BuiltinStage::EventReader(EventReaderStage::from_handle(handle, source)?)
            }
            ComponentKind::TruthParticleMaker => {
                BuiltinStage::Truth(TruthStage::from_handle(handle)?)
            }
            ComponentKind::CaloCellMaker => {
                BuiltinStage::CaloCells(CaloCellStage::from_handle(handle)?)
            }
            ComponentKind::CaloClusterMaker => {
                BuiltinStage::Clusters(ClusterStage::from_handle(handle)?)
            }
            ComponentKind::CaloRingerBuilder => {
                BuiltinStage::Ringer(RingerStage::from_handle(handle)?)
            }
            ComponentKind::CaloNtupleMaker => {
                BuiltinStage::CaloNtuple(CaloNtupleStage::from_handle(handle)?)
            }
            ComponentKind::RawNtupleMaker => {
                BuiltinStage::RawNtuple(RawNtupleStage::from_handle(handle)?)
            }
            ComponentKind::PulseGenerator | ComponentKind::OptimalFilter => {
                return Err(JobError::InvalidState(format!(
                    "tool '{}' cannot run as a stage",
                    handle.name()
                )))
            }
        };
        Ok(stage)
    }
}

impl std::fmt::Debug for StageFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageFactory").finish_non_exhaustive()
    }
}
