//! Test data builders for events, event files and job configurations

use recojob_rs::config::{JobConfig, MergePolicy, OutputLevel, OutputMode};
use recojob_rs::pipeline::record::{Seed, TruthParticle};
use recojob_rs::source::GeneratedEvent;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Builder for generated events
pub struct EventBuilder {
    event_number: u64,
    avgmu: f64,
    seeds: Vec<Seed>,
    particles: Vec<TruthParticle>,
}

impl EventBuilder {
    pub fn new(event_number: u64) -> Self {
        Self {
            event_number,
            avgmu: 0.0,
            seeds: Vec::new(),
            particles: Vec::new(),
        }
    }

    pub fn avgmu(mut self, avgmu: f64) -> Self {
        self.avgmu = avgmu;
        self
    }

    /// An electron with a matching seed. Energy in GeV.
    pub fn electron(mut self, e_gev: f64, eta: f64, phi: f64) -> Self {
        let e = e_gev * 1000.0;
        self.particles.push(TruthParticle {
            pdg_id: 11,
            e,
            eta,
            phi,
        });
        self.seeds.push(Seed {
            eta,
            phi,
            et: e / eta.cosh(),
        });
        self
    }

    pub fn build(self) -> GeneratedEvent {
        GeneratedEvent {
            event_number: self.event_number,
            avgmu: self.avgmu,
            seeds: self.seeds,
            particles: self.particles,
        }
    }
}

/// `n` events with one central electron each
pub fn electron_events(n: u64) -> Vec<GeneratedEvent> {
    (0..n)
        .map(|i| {
            EventBuilder::new(i)
                .avgmu(40.0)
                .electron(20.0 + i as f64, 0.05 * (i % 10) as f64, 0.3)
                .build()
        })
        .collect()
}

/// Write events as JSON lines and return the file path
pub fn write_event_file(dir: &Path, events: &[GeneratedEvent]) -> PathBuf {
    let path = dir.join("events.jsonl");
    let mut file = std::fs::File::create(&path).unwrap();
    for event in events {
        writeln!(file, "{}", serde_json::to_string(event).unwrap()).unwrap();
    }
    path
}

/// Builder for job configurations
pub struct JobConfigBuilder {
    config: JobConfig,
}

impl JobConfigBuilder {
    pub fn new(output: &Path) -> Self {
        Self {
            config: JobConfig {
                input_file: Some(PathBuf::from("events.jsonl")),
                output_file: output.to_path_buf(),
                output_level: OutputLevel::Error,
                ..JobConfig::default()
            },
        }
    }

    pub fn input(mut self, input: &Path) -> Self {
        self.config.input_file = Some(input.to_path_buf());
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.config.number_of_threads = threads;
        self
    }

    pub fn events(mut self, events: u64) -> Self {
        self.config.number_of_events = Some(events);
        self
    }

    pub fn ntuple(mut self, mode: OutputMode) -> Self {
        self.config.ntuple = mode;
        self
    }

    pub fn merge_policy(mut self, policy: MergePolicy) -> Self {
        self.config.merge_policy = policy;
        self
    }

    pub fn build(self) -> JobConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = EventBuilder::new(7).avgmu(20.0).electron(50.0, 0.0, 1.0).build();
        assert_eq!(event.event_number, 7);
        assert_eq!(event.particles.len(), 1);
        assert_eq!(event.seeds[0].et, 50_000.0);
    }
}
