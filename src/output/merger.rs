//! Deterministic reduction of shard partitions into one result file.

use crate::output::histogram::Histogram1D;
use crate::output::partition::{
    check_histograms, shard_index_from_path, write_durable, Partition, Table,
};
use crate::output::MergeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// The merged result document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedOutput {
    /// Shard indices folded in, ascending.
    pub merged_shards: Vec<usize>,
    /// Shards that failed or whose partition could not be used.
    #[serde(default)]
    pub failed_shards: Vec<usize>,
    pub seed: u64,
    pub events: u64,
    pub created_at: DateTime<Utc>,
    pub tables: BTreeMap<String, Table>,
    pub histograms: BTreeMap<String, Histogram1D>,
    pub counters: BTreeMap<String, u64>,
}

impl MergedOutput {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = fs::read_to_string(path)?;
        let output: MergedOutput = serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        check_histograms(&output.histograms)?;
        Ok(output)
    }
}

/// Outcome of a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    pub output_path: PathBuf,
    pub merged_shards: usize,
    pub shard_indices: Vec<usize>,
    pub failed_shards: Vec<usize>,
    pub events: u64,
}

impl MergeResult {
    pub fn is_partial(&self) -> bool {
        !self.failed_shards.is_empty()
    }
}

/// Folds partitions into `destination`.
///
/// Runs single-threaded. The destination is written through a synced
/// temporary file and renamed into place; partitions are removed only after
/// that rename succeeded.
#[derive(Debug, Clone)]
pub struct ShardMerger {
    destination: PathBuf,
    keep_partitions: bool,
}

impl ShardMerger {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            keep_partitions: false,
        }
    }

    /// Leave partitions on disk after a successful merge.
    pub fn keep_partitions(mut self, keep: bool) -> Self {
        self.keep_partitions = keep;
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Merge every partition. Any missing, unreadable or incomplete partition
    /// fails the merge; nothing is written and nothing is deleted.
    pub fn merge(&self, partition_paths: &[PathBuf]) -> Result<MergeResult, MergeError> {
        let mut loaded = Vec::with_capacity(partition_paths.len());
        for (position, path) in partition_paths.iter().enumerate() {
            loaded.push(load_partition(position, path)?);
        }
        self.fold_and_commit(loaded, Vec::new())
    }

    /// Merge whatever can be loaded. Shards listed in `failed` and partitions
    /// that are missing, unreadable or incomplete are reported in
    /// `MergeResult::failed_shards` and left on disk.
    pub fn merge_available(
        &self,
        partition_paths: &[PathBuf],
        failed: &[usize],
    ) -> Result<MergeResult, MergeError> {
        let mut failed_shards: BTreeSet<usize> = failed.iter().copied().collect();
        let mut loaded = Vec::with_capacity(partition_paths.len());
        for (position, path) in partition_paths.iter().enumerate() {
            match load_partition(position, path) {
                Ok(entry) => loaded.push(entry),
                Err(e) => {
                    tracing::warn!("Skipping partition in best-effort merge: {}", e);
                    if let Some(shard) = e.shard() {
                        failed_shards.insert(shard);
                    }
                }
            }
        }
        self.fold_and_commit(loaded, failed_shards.into_iter().collect())
    }

    fn fold_and_commit(
        &self,
        mut loaded: Vec<(PathBuf, Partition)>,
        failed_shards: Vec<usize>,
    ) -> Result<MergeResult, MergeError> {
        if loaded.is_empty() {
            return Err(MergeError::NoPartitions);
        }

        // Shard-index order, whatever order the paths came in.
        loaded.sort_by_key(|(_, p)| p.shard_index);
        for pair in loaded.windows(2) {
            if pair[0].1.shard_index == pair[1].1.shard_index {
                return Err(MergeError::DuplicateShard {
                    shard: pair[0].1.shard_index,
                });
            }
        }

        let output = fold(&loaded, failed_shards)?;

        let json = serde_json::to_vec_pretty(&output)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        write_durable(&self.destination, &json)?;

        tracing::info!(
            "Merged {} partition(s), {} event(s) into {}",
            output.merged_shards.len(),
            output.events,
            self.destination.display()
        );

        if !self.keep_partitions {
            for (path, _) in &loaded {
                if path == &self.destination {
                    continue;
                }
                if let Err(e) = fs::remove_file(path) {
                    tracing::warn!("Failed to remove partition {}: {}", path.display(), e);
                }
            }
        }

        Ok(MergeResult {
            output_path: self.destination.clone(),
            merged_shards: output.merged_shards.len(),
            shard_indices: output.merged_shards,
            failed_shards: output.failed_shards,
            events: output.events,
        })
    }
}

fn load_partition(position: usize, path: &Path) -> Result<(PathBuf, Partition), MergeError> {
    let shard = shard_index_from_path(path).unwrap_or(position);
    if !path.exists() {
        return Err(MergeError::MissingPartition {
            shard,
            path: path.to_path_buf(),
        });
    }
    let partition = Partition::load(path).map_err(|e| MergeError::CorruptPartition {
        shard,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if let Some(named) = shard_index_from_path(path) {
        if named != partition.shard_index {
            return Err(MergeError::CorruptPartition {
                shard: named,
                path: path.to_path_buf(),
                reason: format!("file holds shard {}", partition.shard_index),
            });
        }
    }

    if !partition.complete {
        return Err(MergeError::IncompletePartition {
            shard: partition.shard_index,
            completed: partition.completed_events,
            expected: partition.end_event.saturating_sub(partition.first_event),
        });
    }
    Ok((path.to_path_buf(), partition))
}

/// Fold partitions already sorted by shard index.
fn fold(
    loaded: &[(PathBuf, Partition)],
    failed_shards: Vec<usize>,
) -> Result<MergedOutput, MergeError> {
    let mut tables: BTreeMap<String, Table> = BTreeMap::new();
    let mut histograms: BTreeMap<String, Histogram1D> = BTreeMap::new();
    let mut counters: BTreeMap<String, u64> = BTreeMap::new();
    let mut events = 0;

    for (_, partition) in loaded {
        let shard = partition.shard_index;
        events += partition.completed_events;

        for (name, table) in &partition.tables {
            match tables.get_mut(name) {
                Some(merged) if merged.columns == table.columns => {
                    merged.rows.extend(table.rows.iter().cloned());
                }
                Some(_) => {
                    return Err(MergeError::IncompatibleTable {
                        key: name.clone(),
                        shard,
                    })
                }
                None => {
                    tables.insert(name.clone(), table.clone());
                }
            }
        }

        for (name, hist) in &partition.histograms {
            match histograms.get_mut(name) {
                Some(merged) => {
                    if !merged.add(hist) {
                        return Err(MergeError::IncompatibleHistogram {
                            key: name.clone(),
                            shard,
                        });
                    }
                }
                None => {
                    histograms.insert(name.clone(), hist.clone());
                }
            }
        }

        for (name, value) in &partition.counters {
            *counters.entry(name.clone()).or_insert(0) += value;
        }
    }

    Ok(MergedOutput {
        merged_shards: loaded.iter().map(|(_, p)| p.shard_index).collect(),
        failed_shards,
        seed: loaded.first().map(|(_, p)| p.seed).unwrap_or_default(),
        events,
        created_at: Utc::now(),
        tables,
        histograms,
        counters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::partition::{partition_path, ColumnValue};
    use tempfile::TempDir;

    fn write_partition(base: &Path, shard: usize, rows: &[i64], hist_fill: f64) -> PathBuf {
        let mut p = Partition::new(shard, 0..rows.len() as u64, 512);
        let mut table = Table::new(&["EventNumber"]);
        table.rows = rows.iter().map(|r| vec![ColumnValue::Int(*r)]).collect();
        p.tables.insert("physics".into(), table);
        let mut h = Histogram1D::new(4, 0.0, 4.0);
        h.fill(hist_fill, 1.0);
        p.histograms.insert("Expert/Clusters/et".into(), h);
        p.counters.insert("events_processed".into(), rows.len() as u64);
        p.completed_events = rows.len() as u64;
        p.complete = true;
        let path = partition_path(base, shard);
        p.save_durable(&path).unwrap();
        path
    }

    fn event_numbers(out: &MergedOutput) -> Vec<i64> {
        out.tables["physics"]
            .rows
            .iter()
            .map(|r| match r[0] {
                ColumnValue::Int(v) => v,
                _ => panic!("unexpected column type"),
            })
            .collect()
    }

    #[test]
    fn test_merge_concatenates_in_shard_order() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("reco.json");
        let p0 = write_partition(&base, 0, &[0, 1], 0.5);
        let p1 = write_partition(&base, 1, &[2], 1.5);
        let p2 = write_partition(&base, 2, &[3, 4], 1.5);

        let result = ShardMerger::new(&base)
            .merge(&[p2.clone(), p0.clone(), p1.clone()])
            .unwrap();
        assert_eq!(result.merged_shards, 3);
        assert_eq!(result.events, 5);
        assert!(!p0.exists() && !p1.exists() && !p2.exists());

        let out = MergedOutput::load(&base).unwrap();
        assert_eq!(event_numbers(&out), vec![0, 1, 2, 3, 4]);
        assert_eq!(out.counters["events_processed"], 5);
        let h = &out.histograms["Expert/Clusters/et"];
        assert_eq!(h.counts[1], 1.0);
        assert_eq!(h.counts[2], 2.0);
    }

    #[test]
    fn test_missing_partition_leaves_others() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("reco.json");
        let paths: Vec<PathBuf> = (0..4).map(|i| write_partition(&base, i, &[i as i64], 0.5)).collect();
        fs::remove_file(&paths[2]).unwrap();

        let err = ShardMerger::new(&base).merge(&paths).unwrap_err();
        assert!(matches!(err, MergeError::MissingPartition { shard: 2, .. }));
        assert!(!base.exists());
        for i in [0, 1, 3] {
            assert!(paths[i].exists());
        }
    }

    #[test]
    fn test_best_effort_skips_unusable() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("reco.json");
        let paths: Vec<PathBuf> = (0..3).map(|i| write_partition(&base, i, &[i as i64], 0.5)).collect();
        fs::write(&paths[1], "garbage").unwrap();

        let result = ShardMerger::new(&base).merge_available(&paths, &[]).unwrap();
        assert_eq!(result.shard_indices, vec![0, 2]);
        assert_eq!(result.failed_shards, vec![1]);
        assert!(result.is_partial());
        assert!(paths[1].exists());
    }

    #[test]
    fn test_incompatible_histogram() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("reco.json");
        let p0 = write_partition(&base, 0, &[0], 0.5);
        let mut other = Partition::load(&write_partition(&base, 1, &[1], 0.5)).unwrap();
        other
            .histograms
            .insert("Expert/Clusters/et".into(), Histogram1D::new(8, 0.0, 4.0));
        let p1 = partition_path(&base, 1);
        other.save_durable(&p1).unwrap();

        let err = ShardMerger::new(&base).merge(&[p0.clone(), p1]).unwrap_err();
        assert!(matches!(err, MergeError::IncompatibleHistogram { shard: 1, .. }));
        assert!(p0.exists());
    }

    #[test]
    fn test_keep_partitions() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("reco.json");
        let p0 = write_partition(&base, 0, &[0], 0.5);
        ShardMerger::new(&base)
            .keep_partitions(true)
            .merge(&[p0.clone()])
            .unwrap();
        assert!(p0.exists());
        assert!(base.exists());
    }

    #[test]
    fn test_no_partitions() {
        let dir = TempDir::new().unwrap();
        let err = ShardMerger::new(dir.path().join("reco.json")).merge(&[]).unwrap_err();
        assert!(matches!(err, MergeError::NoPartitions));
    }
}
