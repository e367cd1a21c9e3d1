//! Transactional writer for a shard's partition.
//!
//! Rows, histogram fills and counter increments made while an event is open
//! are staged and only applied on [`PartitionWriter::commit_event`]. A failed
//! or cancelled event is rolled back, so a finalized partition always ends at
//! the last completed event.

use crate::error::{JobError, Result, ResultExt};
use crate::output::histogram::Histogram1D;
use crate::output::partition::{ColumnValue, Partition, Table};
use std::ops::Range;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
struct PendingEvent {
    index: u64,
    rows: Vec<(String, Vec<ColumnValue>)>,
    fills: Vec<(String, f64, f64)>,
    counters: Vec<(String, u64)>,
}

/// Partition writer owned by exactly one worker shard.
#[derive(Debug)]
pub struct PartitionWriter {
    path: PathBuf,
    partition: Partition,
    pending: Option<PendingEvent>,
}

impl PartitionWriter {
    pub fn new(path: impl Into<PathBuf>, shard_index: usize, range: Range<u64>, seed: u64) -> Self {
        Self {
            path: path.into(),
            partition: Partition::new(shard_index, range, seed),
            pending: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shard_index(&self) -> usize {
        self.partition.shard_index
    }

    pub fn completed_events(&self) -> u64 {
        self.partition.completed_events
    }

    /// Read-only view of committed content.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    // ── Booking ──

    /// Declare a table. Booking the same name twice with identical columns is a no-op.
    pub fn book_table(&mut self, name: &str, columns: &[&str]) -> Result<()> {
        let table = Table::new(columns);
        match self.partition.tables.get(name) {
            Some(existing) if existing.columns == table.columns => Ok(()),
            Some(_) => Err(JobError::InvalidState(format!(
                "table '{name}' already booked with different columns"
            ))),
            None => {
                self.partition.tables.insert(name.to_string(), table);
                Ok(())
            }
        }
    }

    pub fn book_histogram(&mut self, name: &str, bins: usize, low: f64, high: f64) -> Result<()> {
        let hist = Histogram1D::new(bins, low, high);
        match self.partition.histograms.get(name) {
            Some(existing) if existing.is_compatible(&hist) => Ok(()),
            Some(_) => Err(JobError::InvalidState(format!(
                "histogram '{name}' already booked with different binning"
            ))),
            None => {
                self.partition.histograms.insert(name.to_string(), hist);
                Ok(())
            }
        }
    }

    // ── Per-event staging ──

    pub fn begin_event(&mut self, index: u64) -> Result<()> {
        if let Some(open) = &self.pending {
            return Err(JobError::InvalidState(format!(
                "event {} is still open while starting event {index}",
                open.index
            )));
        }
        self.pending = Some(PendingEvent {
            index,
            ..PendingEvent::default()
        });
        Ok(())
    }

    fn pending_mut(&mut self) -> Result<&mut PendingEvent> {
        self.pending
            .as_mut()
            .ok_or_else(|| JobError::InvalidState("no event is open on this partition".into()))
    }

    /// Stage one row for `table`.
    pub fn write(&mut self, table: &str, row: Vec<ColumnValue>) -> Result<()> {
        let width = self
            .partition
            .tables
            .get(table)
            .map(|t| t.columns.len())
            .ok_or_else(|| JobError::InvalidState(format!("table '{table}' was not booked")))?;
        if row.len() != width {
            return Err(JobError::InvalidState(format!(
                "row for '{table}' has {} values, table has {width} columns",
                row.len()
            )));
        }
        self.pending_mut()?.rows.push((table.to_string(), row));
        Ok(())
    }

    pub fn fill(&mut self, histogram: &str, x: f64, weight: f64) -> Result<()> {
        if !self.partition.histograms.contains_key(histogram) {
            return Err(JobError::InvalidState(format!(
                "histogram '{histogram}' was not booked"
            )));
        }
        self.pending_mut()?
            .fills
            .push((histogram.to_string(), x, weight));
        Ok(())
    }

    pub fn increment(&mut self, counter: &str, by: u64) -> Result<()> {
        self.pending_mut()?.counters.push((counter.to_string(), by));
        Ok(())
    }

    /// Apply everything staged for the open event.
    pub fn commit_event(&mut self) -> Result<()> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| JobError::InvalidState("commit without an open event".into()))?;

        for (table, row) in pending.rows {
            if let Some(t) = self.partition.tables.get_mut(&table) {
                t.rows.push(row);
            }
        }
        for (name, x, w) in pending.fills {
            if let Some(h) = self.partition.histograms.get_mut(&name) {
                h.fill(x, w);
            }
        }
        for (name, by) in pending.counters {
            *self.partition.counters.entry(name).or_insert(0) += by;
        }
        self.partition.completed_events += 1;
        Ok(())
    }

    /// Drop everything staged for the open event.
    pub fn rollback_event(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(
                shard = self.partition.shard_index,
                event = pending.index,
                "Rolled back partial event"
            );
        }
    }

    /// Write the partition durably and return its path. Consumes the writer,
    /// so nothing can be written after finalization.
    pub fn finalize(mut self, complete: bool) -> Result<PathBuf> {
        self.rollback_event();
        self.partition.complete = complete;
        self.partition
            .save_durable(&self.path)
            .with_context(|| format!("Failed to write partition {}", self.path.display()))?;
        tracing::debug!(
            shard = self.partition.shard_index,
            events = self.partition.completed_events,
            complete,
            path = %self.path.display(),
            "Partition finalized"
        );
        Ok(self.path)
    }
}
