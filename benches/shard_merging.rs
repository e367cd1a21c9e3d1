//! Benchmarks for range splitting, histogram merging and shard merges
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use recojob_rs::job::split_ranges;
use recojob_rs::output::{partition_path, ColumnValue, Histogram1D, PartitionWriter, ShardMerger};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn bench_split_ranges(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_ranges");

    for workers in [1usize, 8, 64].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(workers), workers, |b, &workers| {
            b.iter(|| split_ranges(black_box(1_000_000), black_box(workers)))
        });
    }

    group.finish();
}

fn bench_histogram_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("histogram_add");

    for bins in [100usize, 1_000, 10_000].iter() {
        let mut source = Histogram1D::new(*bins, 0.0, 100.0);
        for i in 0..*bins {
            source.fill(i as f64 * 100.0 / *bins as f64, 1.0);
        }

        group.throughput(Throughput::Elements(*bins as u64));
        group.bench_with_input(BenchmarkId::from_parameter(bins), bins, |b, &bins| {
            let mut target = Histogram1D::new(bins, 0.0, 100.0);
            b.iter(|| target.add(black_box(&source)))
        });
    }

    group.finish();
}

fn write_partitions(base: &Path, shards: usize, events_per_shard: u64) -> Vec<PathBuf> {
    (0..shards)
        .map(|shard| {
            let start = shard as u64 * events_per_shard;
            let range = start..start + events_per_shard;
            let mut writer = PartitionWriter::new(partition_path(base, shard), shard, range.clone(), 512);
            writer
                .book_table("physics", &["EventNumber", "cl_et", "cl_rings"])
                .unwrap();
            writer.book_histogram("Expert/Clusters/et", 100, 0.0, 100_000.0).unwrap();
            for index in range {
                writer.begin_event(index).unwrap();
                writer
                    .write(
                        "physics",
                        vec![
                            ColumnValue::from(index),
                            ColumnValue::Float(20_000.0),
                            ColumnValue::List(vec![1.0; 100]),
                        ],
                    )
                    .unwrap();
                writer.fill("Expert/Clusters/et", 20_000.0, 1.0).unwrap();
                writer.increment("events_processed", 1).unwrap();
                writer.commit_event().unwrap();
            }
            writer.finalize(true).unwrap()
        })
        .collect()
}

fn bench_shard_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("shard_merge");
    group.sample_size(20);

    for shards in [2usize, 8].iter() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("reco.json");
        let paths = write_partitions(&base, *shards, 250);
        let merger = ShardMerger::new(&base).keep_partitions(true);

        group.throughput(Throughput::Elements(*shards as u64 * 250));
        group.bench_with_input(BenchmarkId::from_parameter(shards), &paths, |b, paths| {
            b.iter(|| merger.merge(black_box(paths)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_split_ranges, bench_histogram_add, bench_shard_merge);
criterion_main!(benches);
