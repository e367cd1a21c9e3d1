//! Source providers that inject failures and cancellation

use recojob_rs::component::ComponentHandle;
use recojob_rs::error::{JobError, Result};
use recojob_rs::job::CancelHandle;
use recojob_rs::source::{EventSource, GeneratedEvent, MemoryEventSource, SourceProvider, SourceRead};
use std::sync::Arc;

/// Reads from memory and fails on one event index
pub struct FailingProvider {
    events: MemoryEventSource,
    fail_at: u64,
}

impl FailingProvider {
    pub fn new(events: Vec<GeneratedEvent>, fail_at: u64) -> Arc<Self> {
        Arc::new(Self {
            events: MemoryEventSource::new(events),
            fail_at,
        })
    }
}

struct FailingSource {
    inner: MemoryEventSource,
    fail_at: u64,
}

impl EventSource for FailingSource {
    fn read_event(&mut self, index: u64) -> Result<SourceRead> {
        if index == self.fail_at {
            return Err(JobError::InvalidState(format!("corrupt event {index}")));
        }
        self.inner.read_event(index)
    }

    fn event_count(&self) -> Option<u64> {
        self.inner.event_count()
    }
}

impl SourceProvider for FailingProvider {
    fn open(&self, _reader: &ComponentHandle) -> Result<Box<dyn EventSource>> {
        Ok(Box::new(FailingSource {
            inner: self.events.clone(),
            fail_at: self.fail_at,
        }))
    }
}

/// Reads from memory and requests job cancellation when one index is read
pub struct CancellingProvider {
    events: MemoryEventSource,
    cancel_at: u64,
    handle: CancelHandle,
}

impl CancellingProvider {
    pub fn new(events: Vec<GeneratedEvent>, cancel_at: u64, handle: CancelHandle) -> Arc<Self> {
        Arc::new(Self {
            events: MemoryEventSource::new(events),
            cancel_at,
            handle,
        })
    }
}

struct CancellingSource {
    inner: MemoryEventSource,
    cancel_at: u64,
    handle: CancelHandle,
}

impl EventSource for CancellingSource {
    fn read_event(&mut self, index: u64) -> Result<SourceRead> {
        if index == self.cancel_at {
            self.handle.cancel();
        }
        self.inner.read_event(index)
    }

    fn event_count(&self) -> Option<u64> {
        self.inner.event_count()
    }
}

impl SourceProvider for CancellingProvider {
    fn open(&self, _reader: &ComponentHandle) -> Result<Box<dyn EventSource>> {
        Ok(Box::new(CancellingSource {
            inner: self.events.clone(),
            cancel_at: self.cancel_at,
            handle: self.handle.clone(),
        }))
    }
}

/// Source that cannot tell how many events it holds
pub struct UnsizedProvider;

struct UnsizedSource;

impl EventSource for UnsizedSource {
    fn read_event(&mut self, _index: u64) -> Result<SourceRead> {
        Ok(SourceRead::EndOfStream)
    }

    fn event_count(&self) -> Option<u64> {
        None
    }
}

impl SourceProvider for UnsizedProvider {
    fn open(&self, _reader: &ComponentHandle) -> Result<Box<dyn EventSource>> {
        Ok(Box::new(UnsizedSource))
    }
}

/// Reads from memory and panics when one index is read
pub struct PanickingProvider {
    events: MemoryEventSource,
    panic_at: u64,
}

impl PanickingProvider {
    pub fn new(events: Vec<GeneratedEvent>, panic_at: u64) -> Arc<Self> {
        Arc::new(Self {
            events: MemoryEventSource::new(events),
            panic_at,
        })
    }
}

struct PanickingSource {
    inner: MemoryEventSource,
    panic_at: u64,
}

impl EventSource for PanickingSource {
    fn read_event(&mut self, index: u64) -> Result<SourceRead> {
        if index == self.panic_at {
            panic!("readout crashed on event {index}");
        }
        self.inner.read_event(index)
    }

    fn event_count(&self) -> Option<u64> {
        self.inner.event_count()
    }
}

impl SourceProvider for PanickingProvider {
    fn open(&self, _reader: &ComponentHandle) -> Result<Box<dyn EventSource>> {
        Ok(Box::new(PanickingSource {
            inner: self.events.clone(),
            panic_at: self.panic_at,
        }))
    }
}
