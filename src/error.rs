//! Error handling for the reconstruction job runner
//!
//! This module defines the job-wide error taxonomy and a Result alias for use
//! throughout the crate. Configuration-time errors (`Schema`, `Frozen`,
//! `Pipeline`) abort a job before any worker starts; run-time errors
//! (`Source`, `ShardFailure`, `Cancelled`) stay inside the shard that raised
//! them; `Merge` fails the whole job.

use crate::component::ComponentKind;
use crate::output::MergeError;
use crate::pipeline::PipelineError;
use thiserror::Error;

/// Main error type for job operations
#[derive(Error, Debug)]
pub enum JobError {
    /// Unknown or misused property on a component
    #[error("Schema error: property '{key}' is not allowed for {kind} '{component}': {reason}")]
    Schema {
        component: String,
        kind: ComponentKind,
        key: String,
        reason: String,
    },

    /// Attempt to reconfigure a component whose handle is already built
    #[error("Component '{component}' is already built; property '{key}' can no longer change")]
    Frozen { component: String, key: String },

    /// Invalid pipeline composition
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Event source exhausted or unreadable
    #[error("Source error at event {index}: {message}")]
    Source { index: u64, message: String },

    /// Failure raised by a stage while processing an event
    #[error("Stage '{stage}' failed on event {index}: {message}")]
    ShardFailure {
        stage: String,
        index: u64,
        message: String,
    },

    /// Shard stopped at an event boundary because cancellation was requested
    #[error("Cancelled after {completed} completed events")]
    Cancelled { completed: u64 },

    /// Partition merging failed
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// Errors related to job configuration loading
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation not valid in the current run state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<JobError>,
    },
}

impl JobError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        JobError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build a schema error for `key` on the given component
    pub fn schema(
        component: impl Into<String>,
        kind: ComponentKind,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        JobError::Schema {
            component: component.into(),
            kind,
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error (or the error it wraps) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            JobError::Cancelled { .. } => true,
            JobError::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Whether this error belongs to the configuration phase
    pub fn is_configuration_error(&self) -> bool {
        match self {
            JobError::Schema { .. }
            | JobError::Frozen { .. }
            | JobError::Pipeline(_)
            | JobError::Config(_) => true,
            JobError::WithContext { source, .. } => source.is_configuration_error(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for JobError {
    fn from(err: serde_json::Error) -> Self {
        JobError::Serialization(err.to_string())
    }
}

/// Result type alias for job operations
pub type Result<T> = std::result::Result<T, JobError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| JobError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| JobError::Io(e).with_context(f()))
    }
}
