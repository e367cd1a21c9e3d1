//! Per-component diagnostics sink.
//!
//! Every stage receives its own `Messenger` at instantiation, carrying the
//! component name and the `OutputLevel` it was configured with. Messages below
//! that threshold are dropped before they reach `tracing`; the rest are
//! emitted with a `component` field so shard spans and component names show
//! up together in the log.

use crate::config::OutputLevel;
use std::fmt::Display;

#[derive(Debug, Clone)]
pub struct Messenger {
    name: String,
    level: OutputLevel,
}

impl Messenger {
    pub fn new(name: impl Into<String>, level: OutputLevel) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> OutputLevel {
        self.level
    }

    #[inline]
    pub fn enabled(&self, level: OutputLevel) -> bool {
        self.level.allows(level)
    }

    pub fn emit(&self, level: OutputLevel, msg: impl Display) {
        if !self.enabled(level) {
            return;
        }
        let component = self.name.as_str();
        match level {
            OutputLevel::Verbose => tracing::trace!(component, "{}", msg),
            OutputLevel::Debug => tracing::debug!(component, "{}", msg),
            OutputLevel::Info => tracing::info!(component, "{}", msg),
            OutputLevel::Warning => tracing::warn!(component, "{}", msg),
            OutputLevel::Error | OutputLevel::Fatal => tracing::error!(component, "{}", msg),
        }
    }

    pub fn verbose(&self, msg: impl Display) {
        self.emit(OutputLevel::Verbose, msg);
    }

    pub fn debug(&self, msg: impl Display) {
        self.emit(OutputLevel::Debug, msg);
    }

    pub fn info(&self, msg: impl Display) {
        self.emit(OutputLevel::Info, msg);
    }

    pub fn warning(&self, msg: impl Display) {
        self.emit(OutputLevel::Warning, msg);
    }

    pub fn error(&self, msg: impl Display) {
        self.emit(OutputLevel::Error, msg);
    }
}
