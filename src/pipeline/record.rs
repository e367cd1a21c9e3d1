//! Per-event record store and the containers that flow through it.
//!
//! Every event gets a fresh `EventRecord`. Stages read the containers they
//! consume by key and insert the ones they produce; the pipeline validator
//! guarantees that every consumed key was produced by an earlier stage.

use crate::error::{JobError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;

// ==================== Calorimeter samplings ====================

/// Longitudinal calorimeter samplings, used as enum tags in properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CaloSampling {
    PSB,
    PSE,
    EMB1,
    EMB2,
    EMB3,
    EMEC1,
    EMEC2,
    EMEC3,
    HEC1,
    HEC2,
    HEC3,
    TileCal1,
    TileCal2,
    TileCal3,
    TileExt1,
    TileExt2,
    TileExt3,
}

impl CaloSampling {
    pub fn all() -> &'static [CaloSampling] {
        use CaloSampling::*;
        &[
            PSB, PSE, EMB1, EMB2, EMB3, EMEC1, EMEC2, EMEC3, HEC1, HEC2, HEC3, TileCal1,
            TileCal2, TileCal3, TileExt1, TileExt2, TileExt3,
        ]
    }

    pub fn name(&self) -> &'static str {
        use CaloSampling::*;
        match self {
            PSB => "PSB",
            PSE => "PSE",
            EMB1 => "EMB1",
            EMB2 => "EMB2",
            EMB3 => "EMB3",
            EMEC1 => "EMEC1",
            EMEC2 => "EMEC2",
            EMEC3 => "EMEC3",
            HEC1 => "HEC1",
            HEC2 => "HEC2",
            HEC3 => "HEC3",
            TileCal1 => "TileCal1",
            TileCal2 => "TileCal2",
            TileCal3 => "TileCal3",
            TileExt1 => "TileExt1",
            TileExt2 => "TileExt2",
            TileExt3 => "TileExt3",
        }
    }

    /// Case-insensitive lookup by tag name.
    pub fn from_name(name: &str) -> Option<CaloSampling> {
        let name = name.trim();
        Self::all()
            .iter()
            .copied()
            .find(|s| s.name().eq_ignore_ascii_case(name))
    }

    /// Position in the canonical ordering of [`CaloSampling::all`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Depth index within its section: 0 for presamplers, 1..=3 otherwise.
    pub fn depth(&self) -> u8 {
        use CaloSampling::*;
        match self {
            PSB | PSE => 0,
            EMB1 | EMEC1 | HEC1 | TileCal1 | TileExt1 => 1,
            EMB2 | EMEC2 | HEC2 | TileCal2 | TileExt2 => 2,
            EMB3 | EMEC3 | HEC3 | TileCal3 | TileExt3 => 3,
        }
    }

    pub fn is_hadronic(&self) -> bool {
        use CaloSampling::*;
        matches!(
            self,
            HEC1 | HEC2 | HEC3 | TileCal1 | TileCal2 | TileCal3 | TileExt1 | TileExt2 | TileExt3
        )
    }

    /// |eta| coverage as `(min, max)`.
    pub fn eta_coverage(&self) -> (f64, f64) {
        use CaloSampling::*;
        match self {
            PSB | EMB1 | EMB2 | EMB3 => (0.0, 1.475),
            PSE => (1.5, 1.8),
            EMEC1 | EMEC2 | EMEC3 => (1.375, 3.2),
            HEC1 | HEC2 | HEC3 => (1.5, 3.2),
            TileCal1 | TileCal2 | TileCal3 => (0.0, 1.0),
            TileExt1 | TileExt2 | TileExt3 => (0.8, 1.7),
        }
    }

    pub fn covers(&self, eta: f64) -> bool {
        let (lo, hi) = self.eta_coverage();
        let abs = eta.abs();
        abs >= lo && abs < hi
    }

    /// Cell size as `(delta_eta, delta_phi)`.
    pub fn granularity(&self) -> (f64, f64) {
        match self.depth() {
            0 => (0.025, PI / 32.0),
            1 if !self.is_hadronic() => (0.003125, PI / 32.0),
            2 if !self.is_hadronic() => (0.025, PI / 128.0),
            3 if !self.is_hadronic() => (0.050, PI / 128.0),
            _ => (0.1, PI / 32.0),
        }
    }

    /// Share of a particle's energy deposited in this sampling.
    pub fn energy_fraction(&self) -> f64 {
        if self.is_hadronic() {
            match self.depth() {
                1 => 0.05,
                2 => 0.03,
                _ => 0.02,
            }
        } else {
            match self.depth() {
                0 => 0.05,
                1 => 0.25,
                2 => 0.50,
                _ => 0.10,
            }
        }
    }
}

impl std::fmt::Display for CaloSampling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ==================== Geometry helpers ====================

/// Azimuthal difference wrapped into `[-pi, pi)`.
pub fn delta_phi(a: f64, b: f64) -> f64 {
    let mut d = (a - b) % (2.0 * PI);
    if d >= PI {
        d -= 2.0 * PI;
    } else if d < -PI {
        d += 2.0 * PI;
    }
    d
}

pub fn delta_r(eta1: f64, phi1: f64, eta2: f64, phi2: f64) -> f64 {
    let deta = eta1 - eta2;
    let dphi = delta_phi(phi1, phi2);
    (deta * deta + dphi * dphi).sqrt()
}

/// Transverse energy from energy and pseudorapidity.
pub fn transverse(e: f64, eta: f64) -> f64 {
    e / eta.cosh()
}

// ==================== Containers ====================

/// Generator seed (a region of interest around a hard-scatter object).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    pub eta: f64,
    pub phi: f64,
    /// Transverse energy in MeV.
    pub et: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    pub event_number: u64,
    #[serde(default)]
    pub avgmu: f64,
    #[serde(default)]
    pub seeds: Vec<Seed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruthParticle {
    pub pdg_id: i32,
    /// Energy in MeV.
    pub e: f64,
    pub eta: f64,
    pub phi: f64,
}

impl TruthParticle {
    pub fn et(&self) -> f64 {
        transverse(self.e, self.eta)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaloCell {
    pub sampling: CaloSampling,
    pub eta: f64,
    pub phi: f64,
    pub deta: f64,
    pub dphi: f64,
    /// Deposited (truth) energy in MeV.
    pub truth_energy: f64,
    /// Readout samples from the pulse generator.
    pub samples: Vec<f64>,
    /// Energy estimated from the samples.
    pub energy: f64,
}

impl CaloCell {
    pub fn et(&self) -> f64 {
        transverse(self.energy, self.eta)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaloCluster {
    pub seed_index: usize,
    pub eta: f64,
    pub phi: f64,
    pub e: f64,
    pub et: f64,
    /// Summed truth energy of particles inside the window.
    pub truth_energy: f64,
    pub cells: Vec<CaloCell>,
}

impl CaloCluster {
    /// Summed cell energy over the given samplings.
    pub fn energy_in(&self, samplings: &[CaloSampling]) -> f64 {
        self.cells
            .iter()
            .filter(|c| samplings.contains(&c.sampling))
            .map(|c| c.energy)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaloRings {
    pub cluster_index: usize,
    pub rings: Vec<f64>,
}

/// A typed entry in the event record.
#[derive(Debug, Clone, PartialEq)]
pub enum Container {
    EventInfo(EventInfo),
    Particles(Vec<TruthParticle>),
    Cells(Vec<CaloCell>),
    Clusters(Vec<CaloCluster>),
    Rings(Vec<CaloRings>),
}

impl Container {
    pub fn type_name(&self) -> &'static str {
        match self {
            Container::EventInfo(_) => "EventInfo",
            Container::Particles(_) => "TruthParticleContainer",
            Container::Cells(_) => "CaloCellContainer",
            Container::Clusters(_) => "CaloClusterContainer",
            Container::Rings(_) => "CaloRingsContainer",
        }
    }
}

// ==================== Event record ====================

/// Keyed store holding everything produced for one event.
#[derive(Debug, Default)]
pub struct EventRecord {
    entries: BTreeMap<String, Container>,
}

impl EventRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a container; a key can be recorded only once per event.
    pub fn insert(&mut self, key: &str, container: Container) -> Result<()> {
        if self.entries.contains_key(key) {
            return Err(JobError::InvalidState(format!(
                "record '{key}' already exists in this event"
            )));
        }
        self.entries.insert(key.to_string(), container);
        Ok(())
    }

    /// Append cells to a cell collection, creating it if needed.
    pub fn extend_cells(&mut self, key: &str, cells: Vec<CaloCell>) -> Result<()> {
        match self.entries.get_mut(key) {
            Some(Container::Cells(existing)) => {
                existing.extend(cells);
                Ok(())
            }
            Some(other) => Err(Self::wrong_type(key, "CaloCellContainer", other)),
            None => {
                self.entries.insert(key.to_string(), Container::Cells(cells));
                Ok(())
            }
        }
    }

    fn lookup(&self, key: &str) -> Result<&Container> {
        self.entries
            .get(key)
            .ok_or_else(|| JobError::InvalidState(format!("record '{key}' is not in the event")))
    }

    fn wrong_type(key: &str, expected: &str, found: &Container) -> JobError {
        JobError::InvalidState(format!(
            "record '{key}' is a {}, expected {expected}",
            found.type_name()
        ))
    }

    pub fn event_info(&self, key: &str) -> Result<&EventInfo> {
        match self.lookup(key)? {
            Container::EventInfo(info) => Ok(info),
            other => Err(Self::wrong_type(key, "EventInfo", other)),
        }
    }

    pub fn particles(&self, key: &str) -> Result<&[TruthParticle]> {
        match self.lookup(key)? {
            Container::Particles(v) => Ok(v),
            other => Err(Self::wrong_type(key, "TruthParticleContainer", other)),
        }
    }

    pub fn cells(&self, key: &str) -> Result<&[CaloCell]> {
        match self.lookup(key)? {
            Container::Cells(v) => Ok(v),
            other => Err(Self::wrong_type(key, "CaloCellContainer", other)),
        }
    }

    pub fn clusters(&self, key: &str) -> Result<&[CaloCluster]> {
        match self.lookup(key)? {
            Container::Clusters(v) => Ok(v),
            other => Err(Self::wrong_type(key, "CaloClusterContainer", other)),
        }
    }

    pub fn rings(&self, key: &str) -> Result<&[CaloRings]> {
        match self.lookup(key)? {
            Container::Rings(v) => Ok(v),
            other => Err(Self::wrong_type(key, "CaloRingsContainer", other)),
        }
    }
}
