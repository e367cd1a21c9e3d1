//! Verbosity settings shared by the job and its components
//!
//! Components carry an `OutputLevel` property on the numeric scale used by
//! reconstruction job options (0 = most verbose, 5 = fatal only). This module
//! maps that scale onto `tracing` levels so the same number controls both the
//! global subscriber filter and per-component message suppression.

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Message verbosity of a job or component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "i64", into = "i64")]
pub enum OutputLevel {
    Verbose = 0,
    Debug = 1,
    Info = 2,
    #[default]
    Warning = 3,
    Error = 4,
    Fatal = 5,
}

impl OutputLevel {
    /// Get all levels from most to least verbose.
    pub fn all() -> &'static [OutputLevel] {
        &[
            OutputLevel::Verbose,
            OutputLevel::Debug,
            OutputLevel::Info,
            OutputLevel::Warning,
            OutputLevel::Error,
            OutputLevel::Fatal,
        ]
    }

    /// Parse from the numeric job-option scale.
    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            0 => Some(OutputLevel::Verbose),
            1 => Some(OutputLevel::Debug),
            2 => Some(OutputLevel::Info),
            3 => Some(OutputLevel::Warning),
            4 => Some(OutputLevel::Error),
            5 => Some(OutputLevel::Fatal),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OutputLevel::Verbose => "VERBOSE",
            OutputLevel::Debug => "DEBUG",
            OutputLevel::Info => "INFO",
            OutputLevel::Warning => "WARNING",
            OutputLevel::Error => "ERROR",
            OutputLevel::Fatal => "FATAL",
        }
    }

    /// The closest `tracing` filter.
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            OutputLevel::Verbose => LevelFilter::TRACE,
            OutputLevel::Debug => LevelFilter::DEBUG,
            OutputLevel::Info => LevelFilter::INFO,
            OutputLevel::Warning => LevelFilter::WARN,
            OutputLevel::Error | OutputLevel::Fatal => LevelFilter::ERROR,
        }
    }

    /// Default `EnvFilter` directive for the subscriber.
    pub fn filter_directive(&self) -> String {
        let crate_level = self.level_filter().to_string().to_lowercase();
        format!("warn,recojob_rs={crate_level},recojob={crate_level}")
    }

    /// Whether a message at `level` passes this threshold.
    pub fn allows(&self, level: OutputLevel) -> bool {
        level >= *self
    }
}

impl TryFrom<i64> for OutputLevel {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, String> {
        OutputLevel::from_level(value).ok_or_else(|| format!("invalid output level {value}"))
    }
}

impl From<OutputLevel> for i64 {
    fn from(level: OutputLevel) -> Self {
        level as i64
    }
}

impl std::fmt::Display for OutputLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
