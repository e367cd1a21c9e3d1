//! # recojob-rs: multithreaded calorimeter reconstruction jobs
//!
//! Configures a chain of reconstruction components through a strict,
//! schema-checked property system, runs it over N independent worker shards
//! and reduces the per-shard partitions into one result file.
//!
//! ## Architecture
//!
//! - **Components**: `Component` + `PropertyBag` with an allow-list per
//!   `ComponentKind`; `build()` freezes a component into a `ComponentHandle`
//! - **Pipeline**: linear source → algorithms → writer chain, validated for
//!   ordering and record-key dependencies before anything runs
//! - **Job**: `ComponentAccumulator` splits the events into contiguous
//!   ranges and runs one `WorkerShard` per thread, each with its own stages
//!   and partition
//! - **Output**: transactional `PartitionWriter` per shard and a deterministic
//!   `ShardMerger` (concatenate tables, sum histograms and counters)
//!
//! ## Example
//!
//! ```ignore
//! use recojob_rs::{
//!     config::JobConfig,
//!     job::{build_reco_pipeline, ComponentAccumulator, RunOptions},
//!     pipeline::StageFactory,
//! };
//!
//! fn main() -> recojob_rs::Result<()> {
//!     let config = JobConfig::load("job.toml")?;
//!     let pipeline = build_reco_pipeline(&config)?;
//!     let mut acc = ComponentAccumulator::new(
//!         "ComponentAccumulator",
//!         pipeline,
//!         StageFactory::with_files(),
//!         RunOptions::from_config(&config),
//!     )?;
//!     let report = acc.run(config.number_of_events)?;
//!     println!("merged: {:?}", report.merge);
//!     Ok(())
//! }
//! ```

pub mod component;
pub mod config;
pub mod error;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod source;

// Re-export commonly used types
pub use component::{Component, ComponentHandle, ComponentKind, PropertyBag, PropertyValue};
pub use config::{JobConfig, MergePolicy, OutputLevel, OutputMode};
pub use error::{JobError, Result, ResultExt};
pub use job::{ComponentAccumulator, JobReport, RunOptions, RunState};
pub use output::{MergeError, MergeResult, ShardMerger};
pub use pipeline::{Pipeline, PipelineError, PipelinePlan, StageFactory};
