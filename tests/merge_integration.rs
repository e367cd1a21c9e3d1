//! Shard merging on real partitions written by `PartitionWriter`

mod common;

use common::event_numbers;
use proptest::prelude::*;
use recojob_rs::output::{
    partition_path, ColumnValue, MergeError, MergedOutput, Partition, PartitionWriter,
    ShardMerger,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write one partition covering `range`, one row and one fill per event.
fn write_shard(base: &Path, shard: usize, range: std::ops::Range<u64>) -> PathBuf {
    let mut writer = PartitionWriter::new(partition_path(base, shard), shard, range.clone(), 512);
    writer.book_table("physics", &["EventNumber", "cl_et"]).unwrap();
    writer.book_histogram("Expert/Clusters/et", 10, 0.0, 10.0).unwrap();
    for index in range {
        writer.begin_event(index).unwrap();
        writer
            .write("physics", vec![ColumnValue::from(index), ColumnValue::Float(index as f64)])
            .unwrap();
        writer.fill("Expert/Clusters/et", (index % 10) as f64, 1.0).unwrap();
        writer.increment("events_processed", 1).unwrap();
        writer.commit_event().unwrap();
    }
    writer.finalize(true).unwrap()
}

/// Write a partition for a shard that stopped after `completed` of its events.
fn write_truncated_shard(
    base: &Path,
    shard: usize,
    range: std::ops::Range<u64>,
    completed: u64,
) -> PathBuf {
    let mut writer = PartitionWriter::new(partition_path(base, shard), shard, range.clone(), 512);
    writer.book_table("physics", &["EventNumber", "cl_et"]).unwrap();
    for index in range.start..range.start + completed {
        writer.begin_event(index).unwrap();
        writer
            .write("physics", vec![ColumnValue::from(index), ColumnValue::Float(index as f64)])
            .unwrap();
        writer.commit_event().unwrap();
    }
    writer.finalize(false).unwrap()
}

fn four_shards(base: &Path) -> Vec<PathBuf> {
    vec![
        write_shard(base, 0, 0..3),
        write_shard(base, 1, 3..6),
        write_shard(base, 2, 6..8),
        write_shard(base, 3, 8..10),
    ]
}

#[test]
fn test_missing_shard_two_of_four() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("reco.json");
    let paths = four_shards(&base);
    std::fs::remove_file(&paths[2]).unwrap();

    let err = ShardMerger::new(&base).merge(&paths).unwrap_err();
    assert!(matches!(err, MergeError::MissingPartition { shard: 2, .. }));
    assert_eq!(err.shard(), Some(2));
    assert!(err.to_string().contains("shard 2"));

    assert!(!base.exists());
    for i in [0, 1, 3] {
        assert!(paths[i].exists(), "partition {i} must survive a failed merge");
    }
}

#[test]
fn test_corrupt_partition_fails_merge() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("reco.json");
    let paths = four_shards(&base);
    std::fs::write(&paths[1], b"{ not json").unwrap();

    let err = ShardMerger::new(&base).merge(&paths).unwrap_err();
    assert!(matches!(err, MergeError::CorruptPartition { shard: 1, .. }));
    assert!(paths.iter().all(|p| p.exists()));
}

#[test]
fn test_remerge_from_kept_partitions() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("reco.json");
    let paths = four_shards(&base);

    let first = ShardMerger::new(&base).keep_partitions(true).merge(&paths).unwrap();
    assert!(paths.iter().all(|p| p.exists()));
    let once = MergedOutput::load(&base).unwrap();

    let second = ShardMerger::new(&base).merge(&paths).unwrap();
    assert_eq!(first.events, second.events);
    assert!(paths.iter().all(|p| !p.exists()));
    let twice = MergedOutput::load(&base).unwrap();

    assert_eq!(once.tables, twice.tables);
    assert_eq!(once.histograms, twice.histograms);
    assert_eq!(once.counters, twice.counters);
}

#[test]
fn test_duplicate_shard_rejected() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("reco.json");
    let p0 = write_shard(&base, 0, 0..2);
    let copy = dir.path().join("copy_0.json");
    std::fs::copy(&p0, &copy).unwrap();

    let err = ShardMerger::new(&base).merge(&[p0.clone(), copy]).unwrap_err();
    assert!(matches!(err, MergeError::DuplicateShard { shard: 0 }));
    assert!(p0.exists());
}

#[test]
fn test_incomplete_partition_fails_merge() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("reco.json");
    let paths = vec![write_shard(&base, 0, 0..5), write_truncated_shard(&base, 1, 5..10, 2)];

    let err = ShardMerger::new(&base).merge(&paths).unwrap_err();
    assert!(matches!(
        err,
        MergeError::IncompletePartition { shard: 1, completed: 2, expected: 5 }
    ));
    assert_eq!(err.shard(), Some(1));
    assert!(!base.exists());
    assert!(paths.iter().all(|p| p.exists()));
}

#[test]
fn test_best_effort_reports_incomplete_shard() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("reco.json");
    let paths = vec![write_shard(&base, 0, 0..5), write_truncated_shard(&base, 1, 5..10, 2)];

    let result = ShardMerger::new(&base).merge_available(&paths, &[]).unwrap();
    assert!(result.is_partial());
    assert_eq!(result.shard_indices, vec![0]);
    assert_eq!(result.failed_shards, vec![1]);
    assert_eq!(result.events, 5);

    let merged = MergedOutput::load(&base).unwrap();
    assert_eq!(merged.failed_shards, vec![1]);
    assert_eq!(event_numbers(&merged, "physics"), (0..5).collect::<Vec<i64>>());
    assert!(!paths[0].exists());
    assert!(paths[1].exists(), "truncated partition stays for inspection");
}

#[test]
fn test_partition_named_for_another_shard() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("reco.json");
    let p0 = write_shard(&base, 0, 0..2);
    let misnamed = partition_path(&base, 2);
    std::fs::copy(&p0, &misnamed).unwrap();

    let err = ShardMerger::new(&base).merge(&[p0.clone(), misnamed.clone()]).unwrap_err();
    assert!(matches!(err, MergeError::CorruptPartition { shard: 2, .. }));
    assert!(err.to_string().contains("file holds shard 0"));
    assert!(p0.exists() && misnamed.exists());
}

#[test]
fn test_malformed_histogram_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("reco.json");
    let paths = four_shards(&base);

    let mut partition = Partition::load(&paths[1]).unwrap();
    let hist = partition.histograms.get_mut("Expert/Clusters/et").unwrap();
    hist.counts.truncate(4);
    std::fs::write(&paths[1], serde_json::to_vec(&partition).unwrap()).unwrap();

    let err = ShardMerger::new(&base).merge(&paths).unwrap_err();
    assert!(matches!(err, MergeError::CorruptPartition { shard: 1, .. }));
    assert!(!base.exists());
    assert!(paths.iter().all(|p| p.exists()));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_merge_ignores_argument_order(order in Just(vec![0usize, 1, 2, 3]).prop_shuffle()) {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("reco.json");
        let paths = four_shards(&base);

        let shuffled: Vec<PathBuf> = order.iter().map(|&i| paths[i].clone()).collect();
        let result = ShardMerger::new(&base).merge(&shuffled).unwrap();
        prop_assert_eq!(result.shard_indices, vec![0, 1, 2, 3]);

        let merged = MergedOutput::load(&base).unwrap();
        prop_assert_eq!(event_numbers(&merged, "physics"), (0..10).collect::<Vec<i64>>());
        prop_assert_eq!(merged.counters["events_processed"], 10);
        prop_assert_eq!(merged.histograms["Expert/Clusters/et"].entries, 10);
    }
}
