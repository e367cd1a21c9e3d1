//! Shard output partitions and their reduction into one result file.
//!
//! Each worker shard owns a [`PartitionWriter`] writing a private
//! [`Partition`] document (`<base>_<shard>.<ext>`). Once every shard has
//! joined, [`ShardMerger`] folds the partitions into the destination file in
//! shard-index order: tables are concatenated, histograms and counters are
//! summed. Partitions are deleted only after the destination is durable.

pub mod histogram;
pub mod merger;
pub mod partition;
pub mod writer;

pub use histogram::Histogram1D;
pub use merger::{MergeResult, MergedOutput, ShardMerger};
pub use partition::{
    partition_path, shard_index_from_path, ColumnValue, Partition, Table,
};
pub use writer::PartitionWriter;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while merging partitions. Any of them fails the job and
/// leaves every partition on disk.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Partition for shard {shard} is missing: {path}")]
    MissingPartition { shard: usize, path: PathBuf },

    #[error("Partition for shard {shard} is unreadable ({path}): {reason}")]
    CorruptPartition {
        shard: usize,
        path: PathBuf,
        reason: String,
    },

    #[error("Partition for shard {shard} is incomplete: {completed} of {expected} events")]
    IncompletePartition {
        shard: usize,
        completed: u64,
        expected: u64,
    },

    #[error("Histogram '{key}' in shard {shard} has a binning incompatible with earlier shards")]
    IncompatibleHistogram { key: String, shard: usize },

    #[error("Table '{key}' in shard {shard} has columns incompatible with earlier shards")]
    IncompatibleTable { key: String, shard: usize },

    #[error("Shard {shard} appears in more than one partition")]
    DuplicateShard { shard: usize },

    #[error("No partitions to merge")]
    NoPartitions,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MergeError {
    /// Shard the error points at, if any.
    pub fn shard(&self) -> Option<usize> {
        match self {
            MergeError::MissingPartition { shard, .. }
            | MergeError::CorruptPartition { shard, .. }
            | MergeError::IncompletePartition { shard, .. }
            | MergeError::IncompatibleHistogram { shard, .. }
            | MergeError::IncompatibleTable { shard, .. }
            | MergeError::DuplicateShard { shard } => Some(*shard),
            MergeError::NoPartitions | MergeError::Io(_) => None,
        }
    }
}
