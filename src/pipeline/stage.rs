//! Stage abstraction for the per-shard executable pipeline.
//!
//! Two-layer design:
//! - **`StagePlugin` trait** for stages defined outside this crate.
//! - **`BuiltinStage` enum** for the built-in algorithms, so the event loop
//!   dispatches through a match instead of a vtable.
//!
//! `AnyStage` wraps either variant so the executor handles both uniformly.

use crate::error::Result;
use crate::output::PartitionWriter;
use crate::pipeline::record::EventRecord;
use crate::pipeline::stages::{
    CaloCellStage, CaloNtupleStage, ClusterStage, EventReaderStage, RawNtupleStage, RingerStage,
    TruthStage,
};

/// Record keys a stage reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageContract {
    pub consumes: Vec<String>,
    pub produces: Vec<String>,
}

/// Context passed to a stage for each event.
pub struct StageContext<'a> {
    /// Global event index.
    pub index: u64,
    /// The event being built.
    pub record: &'a mut EventRecord,
    /// The shard's partition; writes are staged until the event commits.
    pub output: &'a mut PartitionWriter,
}

/// Trait for stages that are not built in.
pub trait StagePlugin: Send {
    fn name(&self) -> &str;

    fn contract(&self) -> StageContract;

    /// Called once per shard before the first event. Book tables and
    /// histograms here.
    fn initialize(&mut self, _output: &mut PartitionWriter) -> Result<()> {
        Ok(())
    }

    /// Called for every event, in index order.
    fn execute(&mut self, ctx: &mut StageContext) -> Result<()>;

    /// Called once per shard after the last completed event.
    fn finalize(&mut self, _output: &mut PartitionWriter) -> Result<()> {
        Ok(())
    }
}

/// Enum dispatch for built-in stages.
pub enum BuiltinStage {
    EventReader(EventReaderStage),
    Truth(TruthStage),
    CaloCells(CaloCellStage),
    Clusters(ClusterStage),
    Ringer(RingerStage),
    CaloNtuple(CaloNtupleStage),
    RawNtuple(RawNtupleStage),
}

impl BuiltinStage {
    pub fn name(&self) -> &str {
        match self {
            BuiltinStage::EventReader(s) => s.name(),
            BuiltinStage::Truth(s) => s.name(),
            BuiltinStage::CaloCells(s) => s.name(),
            BuiltinStage::Clusters(s) => s.name(),
            BuiltinStage::Ringer(s) => s.name(),
            BuiltinStage::CaloNtuple(s) => s.name(),
            BuiltinStage::RawNtuple(s) => s.name(),
        }
    }

    pub fn initialize(&mut self, output: &mut PartitionWriter) -> Result<()> {
        match self {
            BuiltinStage::EventReader(_) => Ok(()),
            BuiltinStage::Truth(s) => s.initialize(output),
            BuiltinStage::CaloCells(s) => s.initialize(output),
            BuiltinStage::Clusters(s) => s.initialize(output),
            BuiltinStage::Ringer(s) => s.initialize(output),
            BuiltinStage::CaloNtuple(s) => s.initialize(output),
            BuiltinStage::RawNtuple(s) => s.initialize(output),
        }
    }

    pub fn execute(&mut self, ctx: &mut StageContext) -> Result<()> {
        match self {
            BuiltinStage::EventReader(s) => s.execute(ctx),
            BuiltinStage::Truth(s) => s.execute(ctx),
            BuiltinStage::CaloCells(s) => s.execute(ctx),
            BuiltinStage::Clusters(s) => s.execute(ctx),
            BuiltinStage::Ringer(s) => s.execute(ctx),
            BuiltinStage::CaloNtuple(s) => s.execute(ctx),
            BuiltinStage::RawNtuple(s) => s.execute(ctx),
        }
    }
}

/// Wrapper that holds either a built-in stage or a plugin.
pub enum AnyStage {
    Builtin(BuiltinStage),
    Plugin(Box<dyn StagePlugin>),
}

impl AnyStage {
    pub fn name(&self) -> &str {
        match self {
            AnyStage::Builtin(s) => s.name(),
            AnyStage::Plugin(s) => s.name(),
        }
    }

    pub fn initialize(&mut self, output: &mut PartitionWriter) -> Result<()> {
        match self {
            AnyStage::Builtin(s) => s.initialize(output),
            AnyStage::Plugin(s) => s.initialize(output),
        }
    }

    pub fn execute(&mut self, ctx: &mut StageContext) -> Result<()> {
        match self {
            AnyStage::Builtin(s) => s.execute(ctx),
            AnyStage::Plugin(s) => s.execute(ctx),
        }
    }

    pub fn finalize(&mut self, output: &mut PartitionWriter) -> Result<()> {
        match self {
            AnyStage::Builtin(_) => Ok(()),
            AnyStage::Plugin(s) => s.finalize(output),
        }
    }
}
