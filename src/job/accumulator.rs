//! Job orchestration: split the events, run the shards in parallel, merge.
//!
//! ```text
//!                 ┌─► shard 0 [0, 4)  ─► reco_0.json ─┐
//! [Accumulator] ──┼─► shard 1 [4, 7)  ─► reco_1.json ─┼─► [ShardMerger] ─► reco.json
//!                 └─► shard 2 [7, 10) ─► reco_2.json ─┘
//! ```

use crate::config::{JobConfig, MergePolicy, DEFAULT_SEED};
use crate::error::{JobError, Result};
use crate::job::shard::{ShardOutcome, ShardReport, WorkerShard};
use crate::output::{MergeResult, ShardMerger};
use crate::pipeline::{Pipeline, PipelinePlan, StageFactory};
use std::ops::Range;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Lifecycle of one accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Merged,
    Failed,
}

/// Cooperative cancellation shared with every shard. Shards check it
/// between events.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// Run-phase settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub threads: usize,
    pub output: PathBuf,
    pub seed: u64,
    pub merge_policy: MergePolicy,
    pub keep_partitions: bool,
}

impl RunOptions {
    pub fn new(output: impl Into<PathBuf>, threads: usize) -> Self {
        Self {
            threads,
            output: output.into(),
            seed: DEFAULT_SEED,
            merge_policy: MergePolicy::FailClosed,
            keep_partitions: false,
        }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self {
            threads: config.number_of_threads,
            output: config.output_path(),
            seed: config.seed,
            merge_policy: config.merge_policy,
            keep_partitions: config.keep_partitions,
        }
    }

    pub fn merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn keep_partitions(mut self, keep: bool) -> Self {
        self.keep_partitions = keep;
        self
    }
}

/// What a run produced.
#[derive(Debug)]
pub struct JobReport {
    pub state: RunState,
    pub total_events: u64,
    /// One report per shard, by shard index.
    pub shards: Vec<ShardReport>,
    pub merge: Option<MergeResult>,
}

impl JobReport {
    /// Merged with every shard included.
    pub fn is_success(&self) -> bool {
        self.state == RunState::Merged && self.shards.iter().all(|s| s.is_success())
    }

    pub fn failed_shards(&self) -> Vec<usize> {
        self.shards
            .iter()
            .filter(|s| !s.is_success())
            .map(|s| s.shard_index)
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &JobError)> {
        self.shards
            .iter()
            .filter_map(|s| s.error().map(|e| (s.shard_index, e)))
    }

    pub fn completed_events(&self) -> u64 {
        self.shards.iter().map(|s| s.completed_events).sum()
    }
}

/// Split `total` events into `workers` contiguous ranges whose sizes differ
/// by at most one; the first `total % workers` ranges get the extra event.
pub fn split_ranges(total: u64, workers: usize) -> Vec<Range<u64>> {
    if workers == 0 {
        return Vec::new();
    }
    let n = workers as u64;
    let base = total / n;
    let remainder = total % n;

    let mut start = 0;
    (0..n)
        .map(|i| {
            let len = base + u64::from(i < remainder);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

/// Owns the frozen pipeline and drives one job through shards and merge.
pub struct ComponentAccumulator {
    name: String,
    plan: PipelinePlan,
    factory: StageFactory,
    options: RunOptions,
    state: RunState,
    shards: Vec<WorkerShard>,
    cancel: CancelHandle,
}

impl ComponentAccumulator {
    /// Freeze `pipeline` and check that every stage can be instantiated.
    /// Configuration errors surface here, before any shard exists.
    pub fn new(
        name: impl Into<String>,
        pipeline: Pipeline,
        factory: StageFactory,
        options: RunOptions,
    ) -> Result<Self> {
        if options.threads == 0 {
            return Err(JobError::Config(
                "number of threads must be at least 1".to_string(),
            ));
        }

        let plan = pipeline.freeze()?;
        factory.check(&plan)?;

        let name = name.into();
        tracing::info!(
            "{}: {} stages, {} threads, output {}",
            name,
            plan.len(),
            options.threads,
            options.output.display()
        );

        Ok(Self {
            name,
            plan,
            factory,
            options,
            state: RunState::Idle,
            shards: Vec::new(),
            cancel: CancelHandle::new(),
        })
    }

    /// Use an externally created cancel handle.
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plan(&self) -> &PipelinePlan {
        &self.plan
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn shards(&self) -> &[WorkerShard] {
        &self.shards
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Partition paths the shards of this run write, in shard order.
    pub fn partition_paths(&self) -> Vec<PathBuf> {
        self.shards.iter().map(|s| s.partition_path.clone()).collect()
    }

    /// Process `events` events (all events of the source when `None`), then
    /// merge according to the merge policy.
    ///
    /// Shard failures do not make this return `Err`; they are listed in the
    /// report. `Err` means the job never started or the merge failed.
    pub fn run(&mut self, events: Option<u64>) -> Result<JobReport> {
        if self.state != RunState::Idle {
            return Err(JobError::InvalidState(format!(
                "{} has already run ({:?})",
                self.name, self.state
            )));
        }

        let total = match events {
            Some(n) => n,
            None => self.factory.available_events(&self.plan)?.ok_or_else(|| {
                JobError::Config("event source cannot report its size; give a number of events".into())
            })?,
        };

        self.shards = split_ranges(total, self.options.threads)
            .into_iter()
            .enumerate()
            .map(|(index, range)| WorkerShard::new(index, range, &self.options.output))
            .collect();

        self.state = RunState::Running;
        let start = Instant::now();
        tracing::info!(
            "Running {} events on {} shards",
            total,
            self.shards.len()
        );

        let reports = self.run_shards();
        tracing::info!("All shards joined after {:.2?}", start.elapsed());

        self.finish(total, reports)
    }

    fn run_shards(&self) -> Vec<ShardReport> {
        let (tx, rx) = crossbeam_channel::unbounded::<ShardReport>();
        let plan = &self.plan;
        let factory = &self.factory;
        let seed = self.options.seed;

        std::thread::scope(|scope| {
            for shard in &self.shards {
                let tx = tx.clone();
                let cancel = self.cancel.flag();
                scope.spawn(move || {
                    let start = Instant::now();
                    let report = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        shard.run(plan, factory, seed, cancel)
                    }))
                    .unwrap_or_else(|payload| {
                        let message = panic_message(payload.as_ref());
                        tracing::error!("Shard {} panicked: {}", shard.index, message);
                        ShardReport::crashed(shard, message, start.elapsed())
                    });
                    let _ = tx.send(report);
                });
            }
        });
        drop(tx);

        let mut reports: Vec<ShardReport> = rx.iter().collect();
        reports.sort_by_key(|r| r.shard_index);
        reports
    }

    fn finish(&mut self, total_events: u64, shards: Vec<ShardReport>) -> Result<JobReport> {
        let mut report = JobReport {
            state: RunState::Failed,
            total_events,
            shards,
            merge: None,
        };

        let failed = report.failed_shards();
        for (index, err) in report.failures() {
            tracing::error!("Shard {} failed: {}", index, err);
        }

        let merger = ShardMerger::new(&self.options.output)
            .keep_partitions(self.options.keep_partitions);

        let merged = if failed.is_empty() {
            merger.merge(&self.partition_paths())
        } else {
            match self.options.merge_policy {
                MergePolicy::FailClosed => {
                    tracing::error!(
                        "{} of {} shards failed; partitions left on disk, nothing merged",
                        failed.len(),
                        report.shards.len()
                    );
                    self.state = RunState::Failed;
                    return Ok(report);
                }
                MergePolicy::BestEffort => {
                    let succeeded: Vec<PathBuf> = report
                        .shards
                        .iter()
                        .filter_map(|s| match &s.outcome {
                            ShardOutcome::Success(path) => Some(path.clone()),
                            ShardOutcome::Failure(..) => None,
                        })
                        .collect();
                    tracing::warn!(
                        "Best-effort merge of {} shards, skipping {:?}",
                        succeeded.len(),
                        failed
                    );
                    merger.merge_available(&succeeded, &failed)
                }
            }
        };

        match merged {
            Ok(result) => {
                self.state = RunState::Merged;
                report.state = RunState::Merged;
                report.merge = Some(result);
                Ok(report)
            }
            Err(e) => {
                self.state = RunState::Failed;
                Err(JobError::Merge(e))
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
