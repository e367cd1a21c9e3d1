//! Running a configured pipeline as a multithreaded job.
//!
//! [`ComponentAccumulator`] freezes the pipeline, splits the requested events
//! into one contiguous range per worker, runs every [`WorkerShard`] on its own
//! thread and hands the partitions to the
//! [`ShardMerger`](crate::output::ShardMerger).

pub mod accumulator;
pub mod options;
pub mod shard;

pub use accumulator::{split_ranges, CancelHandle, ComponentAccumulator, JobReport, RunOptions, RunState};
pub use crate::output::partition_path;
pub use options::build_reco_pipeline;
pub use shard::{ShardOutcome, ShardReport, WorkerShard};
