//! One worker shard: an event range, its partition and its own stage state.

use crate::error::{JobError, Result};
use crate::output::{partition_path, PartitionWriter};
use crate::pipeline::{PipelinePlan, ShardExecutor, StageFactory};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A contiguous slice of the job's events and where its output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerShard {
    pub index: usize,
    pub range: Range<u64>,
    pub partition_path: PathBuf,
}

/// How a shard ended.
#[derive(Debug)]
pub enum ShardOutcome {
    /// Every event in the range was committed.
    Success(PathBuf),
    /// The shard stopped early. The partition, when one could be written,
    /// holds the events completed before the error.
    Failure(JobError, Option<PathBuf>),
}

/// Message sent by a shard when it is done.
#[derive(Debug)]
pub struct ShardReport {
    pub shard_index: usize,
    pub range: Range<u64>,
    pub completed_events: u64,
    pub outcome: ShardOutcome,
    pub elapsed: Duration,
}

impl ShardReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ShardOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&JobError> {
        match &self.outcome {
            ShardOutcome::Success(_) => None,
            ShardOutcome::Failure(e, _) => Some(e),
        }
    }

    pub fn partition_path(&self) -> Option<&Path> {
        match &self.outcome {
            ShardOutcome::Success(path) => Some(path),
            ShardOutcome::Failure(_, path) => path.as_deref(),
        }
    }

    /// Report for a shard whose thread died before it could report.
    pub(crate) fn crashed(shard: &WorkerShard, message: String, elapsed: Duration) -> Self {
        Self {
            shard_index: shard.index,
            range: shard.range.clone(),
            completed_events: 0,
            outcome: ShardOutcome::Failure(
                JobError::ShardFailure {
                    stage: "<worker>".to_string(),
                    index: shard.range.start,
                    message,
                },
                None,
            ),
            elapsed,
        }
    }
}

impl WorkerShard {
    /// Shard `index` over `range`, writing next to `output` as `<stem>_<index>.<ext>`.
    pub fn new(index: usize, range: Range<u64>, output: &Path) -> Self {
        Self {
            index,
            range,
            partition_path: partition_path(output, index),
        }
    }

    pub fn len(&self) -> u64 {
        self.range.end.saturating_sub(self.range.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the full plan over this shard's range. Never panics on stage
    /// errors; every outcome is folded into the returned report.
    pub fn run(
        &self,
        plan: &PipelinePlan,
        factory: &StageFactory,
        seed: u64,
        cancel: Arc<AtomicBool>,
    ) -> ShardReport {
        let span = tracing::info_span!("shard", index = self.index);
        let _enter = span.enter();
        let start = Instant::now();

        tracing::debug!(
            "Starting events {}..{} -> {}",
            self.range.start,
            self.range.end,
            self.partition_path.display()
        );

        let mut writer =
            PartitionWriter::new(&self.partition_path, self.index, self.range.clone(), seed);
        let result = self.execute(plan, factory, cancel, &mut writer);
        let completed_events = writer.completed_events();

        let outcome = match result {
            Ok(_) => match writer.finalize(true) {
                Ok(path) => ShardOutcome::Success(path),
                Err(e) => ShardOutcome::Failure(e, None),
            },
            Err(e) => {
                if e.is_cancelled() {
                    tracing::warn!("Cancelled after {} events", completed_events);
                } else {
                    tracing::error!("Shard failed: {}", e);
                }
                let partial = writer
                    .finalize(false)
                    .map_err(|fe| tracing::error!("Could not write partial partition: {}", fe))
                    .ok();
                ShardOutcome::Failure(e, partial)
            }
        };

        let elapsed = start.elapsed();
        tracing::info!(
            "Shard {} finished: {} events in {:.2?}",
            self.index,
            completed_events,
            elapsed
        );

        ShardReport {
            shard_index: self.index,
            range: self.range.clone(),
            completed_events,
            outcome,
            elapsed,
        }
    }

    fn execute(
        &self,
        plan: &PipelinePlan,
        factory: &StageFactory,
        cancel: Arc<AtomicBool>,
        writer: &mut PartitionWriter,
    ) -> Result<u64> {
        let stages = factory.instantiate(plan)?;
        let mut executor = ShardExecutor::new(stages, cancel);
        executor.run(self.range.clone(), writer)
    }
}
