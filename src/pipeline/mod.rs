//! Linear reconstruction pipeline.
//!
//! Components are appended to a [`Pipeline`] in execution order and frozen
//! into a [`PipelinePlan`] once the job starts. Every worker shard then asks
//! the [`StageFactory`] for its own stage instances and drives them with a
//! [`ShardExecutor`].
//!
//! # Architecture
//!
//! ```text
//! [EventReader] ──► [TruthParticleMaker] ──► [CaloCellMaker × N] ──► [CaloClusterMaker]
//!                                                                          │
//!                               [CaloNtupleMaker] ◄── [CaloRingerBuilder] ◄┘
//! ```
//!
//! # Design
//!
//! - **Enum dispatch on hot path**: `BuiltinStage` enum for all built-in stages.
//! - **Shared-nothing shards**: the plan is read-only, stage state is per shard.
//! - **Transactional events**: output of a failed event never reaches the partition.

pub mod composition;
pub mod error;
pub mod executor;
pub mod factory;
pub mod plan;
pub mod record;
pub mod stage;
pub mod stages;

pub use composition::Pipeline;
pub use error::{PipelineError, PipelineResult};
pub use executor::{ShardExecutor, EVENTS_PROCESSED};
pub use factory::StageFactory;
pub use plan::{PipelinePlan, PlanStats};
pub use record::{CaloSampling, Container, EventRecord};
pub use stage::{AnyStage, BuiltinStage, StageContext, StageContract, StagePlugin};
