//! Per-shard event loop.
//!
//! Each shard runs its own [`ShardExecutor`] over a contiguous index range:
//! 1. Initialize every stage against the shard's partition.
//! 2. For each index, check the cancel flag, open an event on the partition
//!    and run the stages in order on a fresh [`EventRecord`].
//! 3. Commit the event, or roll it back and stop on the first error.
//! 4. Finalize the stages once the range is exhausted.

use crate::error::{JobError, Result, ResultExt};
use crate::output::PartitionWriter;
use crate::pipeline::record::EventRecord;
use crate::pipeline::stage::{AnyStage, StageContext};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Counter incremented once per committed event.
pub const EVENTS_PROCESSED: &str = "events_processed";

/// Runs a shard's stages over its event range.
pub struct ShardExecutor {
    stages: Vec<AnyStage>,
    /// `<stage>/executions` counter names, one per stage.
    counters: Vec<String>,
    cancel: Arc<AtomicBool>,
}

impl ShardExecutor {
    pub fn new(stages: Vec<AnyStage>, cancel: Arc<AtomicBool>) -> Self {
        let counters = stages
            .iter()
            .map(|s| format!("{}/executions", s.name()))
            .collect();
        Self {
            stages,
            counters,
            cancel,
        }
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|s| s.name())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Process `range` in index order. Returns the number of committed events.
    ///
    /// On error the open event is rolled back; everything committed before it
    /// stays in `output`.
    pub fn run(&mut self, range: Range<u64>, output: &mut PartitionWriter) -> Result<u64> {
        for stage in &mut self.stages {
            let name = stage.name().to_string();
            stage
                .initialize(output)
                .with_context(|| format!("Failed to initialize stage '{name}'"))?;
        }

        let mut completed = 0u64;
        for index in range {
            if self.is_cancelled() {
                tracing::info!(
                    shard = output.shard_index(),
                    completed,
                    "Cancellation observed at event {}",
                    index
                );
                return Err(JobError::Cancelled { completed });
            }

            if let Err(e) = self.process_event(index, output) {
                output.rollback_event();
                return Err(e);
            }
            completed += 1;
        }

        for stage in &mut self.stages {
            let name = stage.name().to_string();
            stage
                .finalize(output)
                .with_context(|| format!("Failed to finalize stage '{name}'"))?;
        }
        Ok(completed)
    }

    fn process_event(&mut self, index: u64, output: &mut PartitionWriter) -> Result<()> {
        output.begin_event(index)?;
        let mut record = EventRecord::new();

        for (stage, counter) in self.stages.iter_mut().zip(&self.counters) {
            let mut ctx = StageContext {
                index,
                record: &mut record,
                output: &mut *output,
            };
            stage
                .execute(&mut ctx)
                .map_err(|e| stage_failure(stage.name(), index, e))?;
            output.increment(counter, 1)?;
        }

        output.increment(EVENTS_PROCESSED, 1)?;
        output.commit_event()
    }
}

/// Source and cancellation errors pass through; anything else is reported
/// against the stage that raised it.
fn stage_failure(stage: &str, index: u64, err: JobError) -> JobError {
    match err {
        e @ (JobError::Source { .. } | JobError::Cancelled { .. } | JobError::ShardFailure { .. }) => e,
        other => JobError::ShardFailure {
            stage: stage.to_string(),
            index,
            message: other.to_string(),
        },
    }
}
