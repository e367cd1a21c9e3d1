//! Configuration module for reconstruction jobs
//!
//! This module handles job configuration including:
//! - Job files (TOML) describing input, output, threading and output mode
//! - Per-component property overrides applied through the schema-checked
//!   property system
//! - Verbosity settings (see [`settings`])
//!
//! # Job File
//!
//! ```toml
//! input_file = "pythia_events.jsonl"
//! output_file = "reco.json"
//! number_of_threads = 4
//! ntuple = "physics"
//! output_level = 3
//!
//! [properties.CaloClusterMaker]
//! EtaWindow = 0.2
//! ```
//!
//! CLI flags override whatever the job file sets.

pub mod settings;

pub use settings::*;

use crate::component::PropertyValue;
use crate::error::{JobError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Extension appended to output paths that have none
pub const DEFAULT_OUTPUT_EXTENSION: &str = "json";

/// Default output file name
pub const DEFAULT_OUTPUT_FILE: &str = "reco.json";

/// Fixed seed recorded in partitions; generation randomness lives upstream in the event generator
pub const DEFAULT_SEED: u64 = 512;

/// Bunch crossing spacing in nanoseconds
pub const DEFAULT_BUNCH_DURATION_NS: f64 = 25.0;

// ==================== Output Mode ====================

/// Which ntuple schema the terminal writer produces
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Clusters and rings for physics studies
    #[default]
    Physics,
    /// Cells around each seed for energy estimation studies
    Raw,
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputMode::Physics => write!(f, "physics"),
            OutputMode::Raw => write!(f, "raw"),
        }
    }
}

// ==================== Merge Policy ====================

/// What to do with shard outputs when some shards fail
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Any failed shard aborts the merge
    #[default]
    FailClosed,
    /// Merge the successful shards and report the failed ones
    BestEffort,
}

impl std::fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergePolicy::FailClosed => write!(f, "fail-closed"),
            MergePolicy::BestEffort => write!(f, "best-effort"),
        }
    }
}

// ==================== Job Config ====================

/// Complete description of one reconstruction job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Event file produced by the generator (JSON lines)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_file: Option<PathBuf>,

    /// Final merged output
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,

    /// Events to reconstruct; `None` means every event in the input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_events: Option<u64>,

    /// Worker shards running in parallel
    #[serde(default = "default_number_of_threads")]
    pub number_of_threads: usize,

    /// Ntuple schema
    #[serde(default)]
    pub ntuple: OutputMode,

    /// Verbosity for the job and every component
    #[serde(default)]
    pub output_level: OutputLevel,

    /// Seed recorded in partition metadata
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Behaviour when some shards fail
    #[serde(default)]
    pub merge_policy: MergePolicy,

    /// Keep per-shard partitions after a successful merge
    #[serde(default)]
    pub keep_partitions: bool,

    /// Property overrides keyed by component name
    #[serde(default)]
    pub properties: BTreeMap<String, BTreeMap<String, PropertyValue>>,
}

fn default_output_file() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FILE)
}

fn default_number_of_threads() -> usize {
    1
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            input_file: None,
            output_file: default_output_file(),
            number_of_events: None,
            number_of_threads: 1,
            ntuple: OutputMode::Physics,
            output_level: OutputLevel::Warning,
            seed: DEFAULT_SEED,
            merge_policy: MergePolicy::FailClosed,
            keep_partitions: false,
            properties: BTreeMap::new(),
        }
    }
}

impl JobConfig {
    /// Load a job file. `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            JobError::Config(format!("Failed to read job file {:?}: {}", path, e))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content).map_err(|e| {
                JobError::Config(format!("Failed to parse job file {:?}: {}", path, e))
            })
        } else {
            toml::from_str(&content).map_err(|e| {
                JobError::Config(format!("Failed to parse job file {:?}: {}", path, e))
            })
        }
    }

    /// Save the job as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    JobError::Config(format!("Failed to create job directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| JobError::Config(format!("Failed to serialize job: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            JobError::Config(format!("Failed to write job file {:?}: {}", path, e))
        })
    }

    /// Check the fields that must hold before any component is configured
    pub fn validate(&self) -> Result<()> {
        if self.number_of_threads == 0 {
            return Err(JobError::Config(
                "number_of_threads must be at least 1".to_string(),
            ));
        }
        if self.input_file.is_none() {
            return Err(JobError::Config("no input file given".to_string()));
        }
        Ok(())
    }

    /// Output path with the default extension appended when missing
    pub fn output_path(&self) -> PathBuf {
        normalize_output_path(&self.output_file)
    }

    /// Set a property override for a component
    pub fn set_override(
        &mut self,
        component: impl Into<String>,
        key: impl Into<String>,
        value: PropertyValue,
    ) {
        self.properties
            .entry(component.into())
            .or_default()
            .insert(key.into(), value);
    }
}

/// Append [`DEFAULT_OUTPUT_EXTENSION`] when `path` has no extension
pub fn normalize_output_path(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(DEFAULT_OUTPUT_EXTENSION)
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_config_default() {
        let config = JobConfig::default();
        assert_eq!(config.number_of_threads, 1);
        assert_eq!(config.ntuple, OutputMode::Physics);
        assert_eq!(config.merge_policy, MergePolicy::FailClosed);
        assert_eq!(config.seed, 512);
        assert!(config.properties.is_empty());
    }

    #[test]
    fn test_output_path_normalization() {
        assert_eq!(
            normalize_output_path(Path::new("out/reco")),
            PathBuf::from("out/reco.json")
        );
        assert_eq!(
            normalize_output_path(Path::new("out/reco.dat")),
            PathBuf::from("out/reco.dat")
        );
    }

    #[test]
    fn test_validate() {
        let mut config = JobConfig::default();
        assert!(config.validate().is_err());

        config.input_file = Some(PathBuf::from("events.jsonl"));
        assert!(config.validate().is_ok());

        config.number_of_threads = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_parsing() {
        let toml_src = r#"
            input_file = "events.jsonl"
            output_file = "reco"
            number_of_threads = 3
            number_of_events = 10
            ntuple = "raw"
            output_level = 1
            merge_policy = "best_effort"

            [properties.CaloClusterMaker]
            EtaWindow = 0.2
            MinCenterEnergy = 15
        "#;
        let config: JobConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.number_of_threads, 3);
        assert_eq!(config.number_of_events, Some(10));
        assert_eq!(config.ntuple, OutputMode::Raw);
        assert_eq!(config.output_level, OutputLevel::Debug);
        assert_eq!(config.merge_policy, MergePolicy::BestEffort);
        assert_eq!(config.output_path(), PathBuf::from("reco.json"));

        let cluster = &config.properties["CaloClusterMaker"];
        assert_eq!(cluster["EtaWindow"], PropertyValue::Number(0.2));
        assert_eq!(cluster["MinCenterEnergy"], PropertyValue::Int(15));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.toml");

        let mut config = JobConfig {
            input_file: Some(PathBuf::from("events.jsonl")),
            number_of_threads: 2,
            ..Default::default()
        };
        config.set_override("CaloRingerBuilder", "NRings", PropertyValue::Numbers(vec![8.0, 64.0]));
        config.save(&path).unwrap();

        let loaded = JobConfig::load(&path).unwrap();
        assert_eq!(loaded.number_of_threads, 2);
        assert_eq!(
            loaded.properties["CaloRingerBuilder"]["NRings"],
            PropertyValue::Numbers(vec![8.0, 64.0])
        );
    }
}
