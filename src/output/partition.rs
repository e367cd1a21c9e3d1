//! On-disk partition document written by one worker shard.

use crate::config::DEFAULT_OUTPUT_EXTENSION;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// One ntuple cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    List(Vec<f64>),
}

impl From<bool> for ColumnValue {
    fn from(v: bool) -> Self {
        ColumnValue::Bool(v)
    }
}

impl From<i64> for ColumnValue {
    fn from(v: i64) -> Self {
        ColumnValue::Int(v)
    }
}

impl From<u64> for ColumnValue {
    fn from(v: u64) -> Self {
        ColumnValue::Int(v as i64)
    }
}

impl From<f64> for ColumnValue {
    fn from(v: f64) -> Self {
        ColumnValue::Float(v)
    }
}

impl From<Vec<f64>> for ColumnValue {
    fn from(v: Vec<f64>) -> Self {
        ColumnValue::List(v)
    }
}

/// Per-event rows with a fixed column layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ColumnValue>>,
}

impl Table {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&ColumnValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().filter_map(|row| row.get(idx)).collect())
    }
}

/// Everything one shard produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub shard_index: usize,
    /// Event index range assigned to the shard.
    pub first_event: u64,
    pub end_event: u64,
    /// Events fully processed and committed.
    pub completed_events: u64,
    /// False when the shard stopped early (failure or cancellation).
    pub complete: bool,
    pub seed: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
    #[serde(default)]
    pub histograms: BTreeMap<String, crate::output::Histogram1D>,
    #[serde(default)]
    pub counters: BTreeMap<String, u64>,
}

impl Partition {
    pub fn new(shard_index: usize, range: Range<u64>, seed: u64) -> Self {
        Self {
            shard_index,
            first_event: range.start,
            end_event: range.end,
            completed_events: 0,
            complete: false,
            seed,
            created_at: Utc::now(),
            tables: BTreeMap::new(),
            histograms: BTreeMap::new(),
            counters: BTreeMap::new(),
        }
    }

    pub fn range(&self) -> Range<u64> {
        self.first_event..self.end_event
    }

    /// Write the document to `path` through a synced temporary file and an
    /// atomic rename.
    pub fn save_durable(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        write_durable(path, &json)
    }

    /// Read a partition back. Histograms with a malformed binning are
    /// rejected as invalid data.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = fs::read_to_string(path)?;
        let partition: Partition = serde_json::from_str(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        check_histograms(&partition.histograms)?;
        Ok(partition)
    }
}

pub(crate) fn check_histograms(
    histograms: &BTreeMap<String, crate::output::Histogram1D>,
) -> std::io::Result<()> {
    match histograms.iter().find(|(_, h)| !h.is_well_formed()) {
        Some((name, h)) => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "histogram '{name}' has {} bins but {} counts",
                h.bins,
                h.counts.len()
            ),
        )),
        None => Ok(()),
    }
}

/// Write `bytes` to `<path>.tmp`, fsync, rename onto `path`, then sync the
/// parent directory where the platform allows it.
pub(crate) fn write_durable(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = tmp_path(path);
    let result = (|| {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
        return result;
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        // Directory fsync is not supported everywhere.
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Partition path for a shard: `<base>_<shard_index>.<ext>`.
pub fn partition_path(base: &Path, shard_index: usize) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = base
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_OUTPUT_EXTENSION.to_string());
    base.with_file_name(format!("{stem}_{shard_index}.{ext}"))
}

/// Shard index encoded in a partition file name, if it follows the
/// `<base>_<n>.<ext>` convention.
pub fn shard_index_from_path(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    let (_, idx) = stem.rsplit_once('_')?;
    idx.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partition_path_format() {
        let base = Path::new("/data/reco.json");
        assert_eq!(partition_path(base, 0), PathBuf::from("/data/reco_0.json"));
        assert_eq!(partition_path(base, 12), PathBuf::from("/data/reco_12.json"));
        assert_eq!(shard_index_from_path(&partition_path(base, 12)), Some(12));
        assert_eq!(shard_index_from_path(Path::new("reco.json")), None);
    }

    #[test]
    fn test_partition_path_without_extension() {
        assert_eq!(
            partition_path(Path::new("out"), 3),
            PathBuf::from("out_3.json")
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reco_1.json");

        let mut partition = Partition::new(1, 4..8, 512);
        let mut table = Table::new(&["EventNumber", "cl_et", "cl_rings", "cl_match"]);
        table.rows.push(vec![
            ColumnValue::Int(4),
            ColumnValue::Float(1.5),
            ColumnValue::List(vec![1.0, 2.0]),
            ColumnValue::Bool(true),
        ]);
        partition.tables.insert("physics".into(), table);
        partition.counters.insert("events_processed".into(), 4);
        partition.save_durable(&path).unwrap();

        assert!(!tmp_path(&path).exists());
        let loaded = Partition::load(&path).unwrap();
        assert_eq!(loaded, partition);
    }

    #[test]
    fn test_load_rejects_malformed_histogram() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reco_0.json");

        let mut partition = Partition::new(0, 0..1, 512);
        let mut hist = crate::output::Histogram1D::new(4, 0.0, 4.0);
        hist.counts.truncate(3);
        partition.histograms.insert("Expert/Clusters/et".into(), hist);
        partition.save_durable(&path).unwrap();

        let err = Partition::load(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("Expert/Clusters/et"));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reco_0.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Partition::load(&path).is_err());
    }
}
