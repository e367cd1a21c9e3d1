//! Event sources feeding the pipeline's reader stage.
//!
//! The reader stage never touches files directly: it asks a
//! [`SourceProvider`] for a fresh [`EventSource`] when a shard instantiates
//! its stages, so every shard reads through its own handle.

use crate::component::ComponentHandle;
use crate::error::{JobError, Result, ResultExt};
use crate::pipeline::record::{Seed, TruthParticle};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One generated event as stored by the event generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedEvent {
    pub event_number: u64,
    #[serde(default)]
    pub avgmu: f64,
    #[serde(default)]
    pub seeds: Vec<Seed>,
    #[serde(default)]
    pub particles: Vec<TruthParticle>,
}

/// Result of a read.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRead {
    Event(GeneratedEvent),
    EndOfStream,
}

/// Random-access event source.
#[cfg_attr(test, mockall::automock)]
pub trait EventSource: Send {
    /// Read the event at `index`, or `EndOfStream` past the last event.
    fn read_event(&mut self, index: u64) -> Result<SourceRead>;

    /// Number of events available, when known up front.
    fn event_count(&self) -> Option<u64>;
}

/// Opens an independent source for the reader stage of one shard.
pub trait SourceProvider: Send + Sync {
    fn open(&self, reader: &ComponentHandle) -> Result<Box<dyn EventSource>>;
}

// ==================== JSON lines ====================

/// Events stored one JSON object per line.
///
/// Opening scans the file once for line offsets; reads seek straight to the
/// requested event.
#[derive(Debug)]
pub struct JsonLinesEventSource {
    path: PathBuf,
    reader: BufReader<File>,
    offsets: Vec<u64>,
}

impl JsonLinesEventSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .with_context(|| format!("Failed to open event file {}", path.display()))?;
        let mut reader = BufReader::new(file);

        let mut offsets = Vec::new();
        let mut offset = 0u64;
        let mut line = String::new();
        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .with_context(|| format!("Failed to scan event file {}", path.display()))?;
            if read == 0 {
                break;
            }
            if !line.trim().is_empty() {
                offsets.push(offset);
            }
            offset += read as u64;
        }

        tracing::debug!("Indexed {} events in {}", offsets.len(), path.display());
        Ok(Self {
            path,
            reader,
            offsets,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSource for JsonLinesEventSource {
    fn read_event(&mut self, index: u64) -> Result<SourceRead> {
        let Some(&offset) = usize::try_from(index).ok().and_then(|i| self.offsets.get(i)) else {
            return Ok(SourceRead::EndOfStream);
        };

        let source_error = |message: String| JobError::Source { index, message };

        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| source_error(e.to_string()))?;
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| source_error(e.to_string()))?;

        let event: GeneratedEvent = serde_json::from_str(line.trim())
            .map_err(|e| source_error(format!("malformed event: {e}")))?;
        Ok(SourceRead::Event(event))
    }

    fn event_count(&self) -> Option<u64> {
        Some(self.offsets.len() as u64)
    }
}

/// Opens a [`JsonLinesEventSource`] on the reader's `FileName`.
#[derive(Debug, Clone, Default)]
pub struct FileSourceProvider;

impl SourceProvider for FileSourceProvider {
    fn open(&self, reader: &ComponentHandle) -> Result<Box<dyn EventSource>> {
        let file = reader.text("FileName")?;
        if file.trim().is_empty() {
            return Err(JobError::Config(format!(
                "{} '{}' has no FileName",
                reader.kind(),
                reader.name()
            )));
        }
        Ok(Box::new(JsonLinesEventSource::open(file)?))
    }
}

// ==================== In memory ====================

/// Shared in-memory event list. Cloning is cheap, so it doubles as its own
/// provider.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSource {
    events: Arc<[GeneratedEvent]>,
}

impl MemoryEventSource {
    pub fn new(events: Vec<GeneratedEvent>) -> Self {
        Self {
            events: events.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSource for MemoryEventSource {
    fn read_event(&mut self, index: u64) -> Result<SourceRead> {
        Ok(usize::try_from(index)
            .ok()
            .and_then(|i| self.events.get(i))
            .cloned()
            .map_or(SourceRead::EndOfStream, SourceRead::Event))
    }

    fn event_count(&self) -> Option<u64> {
        Some(self.events.len() as u64)
    }
}

impl SourceProvider for MemoryEventSource {
    fn open(&self, _reader: &ComponentHandle) -> Result<Box<dyn EventSource>> {
        Ok(Box::new(self.clone()))
    }
}
