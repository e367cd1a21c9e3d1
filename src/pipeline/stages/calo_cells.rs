//! Cell digitization for one calorimeter sampling.
//!
//! Each truth particle covered by the sampling deposits `EnergyFraction` of
//! its energy over a 3x3 cell neighbourhood. The attached tools turn each
//! cell energy into readout samples (`PulseGenerator`) and back into an
//! energy estimate (`OptimalFilter`).

use super::histogram_key;
use crate::component::{ComponentHandle, ComponentKind, Messenger};
use crate::error::{JobError, Result};
use crate::output::PartitionWriter;
use crate::pipeline::record::{delta_phi, delta_r, CaloCell, CaloSampling};
use crate::pipeline::stage::StageContext;
use std::collections::BTreeMap;

/// Lateral sharing of the deposit: centre, edge and corner cells.
const CENTRE_WEIGHT: f64 = 1.0 / 2.0;
const EDGE_WEIGHT: f64 = 1.0 / 12.0;
const CORNER_WEIGHT: f64 = 1.0 / 24.0;

/// Seeds closer than this to a particle put it inside a region of interest.
const ROI_RADIUS: f64 = 0.4;

/// Pulse shaping tool.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseGenerator {
    shape: Vec<f64>,
}

impl PulseGenerator {
    pub fn from_handle(handle: &ComponentHandle) -> Result<Self> {
        Ok(Self {
            shape: handle.numbers("PulseShape")?.to_vec(),
        })
    }

    pub fn samples(&self) -> usize {
        self.shape.len()
    }

    /// Readout samples for a cell energy.
    pub fn shape(&self, energy: f64) -> Vec<f64> {
        self.shape.iter().map(|s| s * energy).collect()
    }
}

/// Linear energy estimation tool.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimalFilter {
    weights: Vec<f64>,
}

impl OptimalFilter {
    pub fn from_handle(handle: &ComponentHandle) -> Result<Self> {
        Ok(Self {
            weights: handle.numbers("WeightsEnergy")?.to_vec(),
        })
    }

    pub fn estimate(&self, samples: &[f64]) -> f64 {
        self.weights.iter().zip(samples).map(|(w, s)| w * s).sum()
    }
}

pub struct CaloCellStage {
    name: String,
    collection_key: String,
    event_key: String,
    truth_key: String,
    sampling: CaloSampling,
    energy_fraction: f64,
    delta_eta: f64,
    delta_phi: f64,
    only_roi: bool,
    detailed: bool,
    histogram_path: String,
    pulse: Option<PulseGenerator>,
    filter: Option<OptimalFilter>,
    msg: Messenger,
}

impl CaloCellStage {
    pub fn from_handle(handle: &ComponentHandle) -> Result<Self> {
        let pulse = handle
            .tool(ComponentKind::PulseGenerator)
            .map(PulseGenerator::from_handle)
            .transpose()?;
        let filter_tool = handle.tool(ComponentKind::OptimalFilter);
        let filter = filter_tool.map(OptimalFilter::from_handle).transpose()?;

        if let (Some(pulse), Some(filter), Some(tool)) = (&pulse, &filter, filter_tool) {
            if pulse.samples() != filter.weights.len() {
                return Err(JobError::schema(
                    tool.name(),
                    tool.kind(),
                    "WeightsEnergy",
                    format!(
                        "has {} weights but the pulse generator produces {} samples",
                        filter.weights.len(),
                        pulse.samples()
                    ),
                ));
            }
        }

        Ok(Self {
            name: handle.name().to_string(),
            collection_key: handle.text("CollectionKey")?.to_string(),
            event_key: handle.text("EventKey")?.to_string(),
            truth_key: handle.text("TruthKey")?.to_string(),
            sampling: handle.sampling("Layer")?,
            energy_fraction: handle.number("EnergyFraction")?,
            delta_eta: handle.number("DeltaEta")?,
            delta_phi: handle.number("DeltaPhi")?,
            only_roi: handle.boolean("OnlyRoI")?,
            detailed: handle.boolean("DetailedHistograms")?,
            histogram_path: handle.text("HistogramPath")?.to_string(),
            pulse,
            filter,
            msg: handle.messenger(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sampling(&self) -> CaloSampling {
        self.sampling
    }

    fn key(&self, leaf: &str) -> String {
        histogram_key(
            &self.histogram_path,
            &format!("{}/{}", self.sampling.name(), leaf),
        )
    }

    pub fn initialize(&mut self, output: &mut PartitionWriter) -> Result<()> {
        output.book_histogram(&self.key("cell_energy"), 100, 0.0, 100_000.0)?;
        output.book_histogram(&self.key("ncells"), 100, 0.0, 500.0)?;
        if self.detailed {
            output.book_histogram(&self.key("resolution"), 100, -1.0, 1.0)?;
        }
        Ok(())
    }

    fn digitize(&self, truth_energy: f64) -> (Vec<f64>, f64) {
        match (&self.pulse, &self.filter) {
            (Some(pulse), Some(filter)) => {
                let samples = pulse.shape(truth_energy);
                let estimate = filter.estimate(&samples);
                (samples, estimate)
            }
            (Some(pulse), None) => (pulse.shape(truth_energy), truth_energy),
            _ => (Vec::new(), truth_energy),
        }
    }

    pub fn execute(&mut self, ctx: &mut StageContext) -> Result<()> {
        let seeds = &ctx.record.event_info(&self.event_key)?.seeds;
        let particles = ctx.record.particles(&self.truth_key)?;

        let mut deposits: BTreeMap<(i64, i64), f64> = BTreeMap::new();
        for p in particles {
            if !self.sampling.covers(p.eta) {
                continue;
            }
            if self.only_roi
                && !seeds
                    .iter()
                    .any(|s| delta_r(s.eta, s.phi, p.eta, p.phi) < ROI_RADIUS)
            {
                continue;
            }

            let energy = p.e * self.energy_fraction;
            let ieta = (p.eta / self.delta_eta).round() as i64;
            let iphi = (delta_phi(p.phi, 0.0) / self.delta_phi).round() as i64;
            for de in -1..=1i64 {
                for dp in -1..=1i64 {
                    let weight = match de.abs() + dp.abs() {
                        0 => CENTRE_WEIGHT,
                        1 => EDGE_WEIGHT,
                        _ => CORNER_WEIGHT,
                    };
                    *deposits.entry((ieta + de, iphi + dp)).or_insert(0.0) += energy * weight;
                }
            }
        }

        let mut cells = Vec::with_capacity(deposits.len());
        for ((ieta, iphi), truth_energy) in deposits {
            if truth_energy <= 0.0 {
                continue;
            }
            let (samples, energy) = self.digitize(truth_energy);
            cells.push(CaloCell {
                sampling: self.sampling,
                eta: ieta as f64 * self.delta_eta,
                phi: delta_phi(iphi as f64 * self.delta_phi, 0.0),
                deta: self.delta_eta,
                dphi: self.delta_phi,
                truth_energy,
                samples,
                energy,
            });
        }

        for cell in &cells {
            ctx.output.fill(&self.key("cell_energy"), cell.energy, 1.0)?;
            if self.detailed {
                let resolution = (cell.energy - cell.truth_energy) / cell.truth_energy;
                ctx.output.fill(&self.key("resolution"), resolution, 1.0)?;
            }
        }
        ctx.output
            .fill(&self.key("ncells"), cells.len() as f64, 1.0)?;

        self.msg.verbose(format_args!(
            "{} cells in {}",
            cells.len(),
            self.sampling
        ));
        ctx.record.extend_cells(&self.collection_key, cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::output::PartitionWriter;
    use crate::pipeline::record::{Container, EventInfo, EventRecord, TruthParticle};

    fn stage(with_tools: bool) -> CaloCellStage {
        let mut c = Component::new("CaloCellMaker_EMB2", ComponentKind::CaloCellMaker);
        c.set_property("Layer", "EMB2").unwrap();
        if with_tools {
            c.attach(Component::new("pulse", ComponentKind::PulseGenerator))
                .unwrap();
            c.attach(Component::new("of", ComponentKind::OptimalFilter))
                .unwrap();
        }
        CaloCellStage::from_handle(c.build().unwrap()).unwrap()
    }

    fn record(eta: f64) -> EventRecord {
        let mut r = EventRecord::new();
        r.insert(
            "EventInfo",
            Container::EventInfo(EventInfo {
                event_number: 0,
                avgmu: 0.0,
                seeds: Vec::new(),
            }),
        )
        .unwrap();
        r.insert(
            "Particles",
            Container::Particles(vec![TruthParticle {
                pdg_id: 11,
                e: 10_000.0,
                eta,
                phi: 0.3,
            }]),
        )
        .unwrap();
        r
    }

    fn run(stage: &mut CaloCellStage, record: &mut EventRecord) {
        let dir = tempfile::TempDir::new().unwrap();
        let mut out = PartitionWriter::new(dir.path().join("p_0.json"), 0, 0..1, 0);
        stage.initialize(&mut out).unwrap();
        out.begin_event(0).unwrap();
        let mut ctx = StageContext {
            index: 0,
            record,
            output: &mut out,
        };
        stage.execute(&mut ctx).unwrap();
        out.commit_event().unwrap();
    }

    #[test]
    fn test_deposit_conserves_fraction() {
        let mut s = stage(true);
        let mut r = record(0.5);
        run(&mut s, &mut r);
        let cells = r.cells("Cells").unwrap();
        assert_eq!(cells.len(), 9);
        let total: f64 = cells.iter().map(|c| c.energy).sum();
        assert!((total - 10_000.0).abs() < 1e-6);
        assert!(cells.iter().all(|c| c.samples.len() == 5));
    }

    #[test]
    fn test_uncovered_particle_leaves_empty_collection() {
        let mut s = stage(false);
        let mut r = record(2.5);
        run(&mut s, &mut r);
        assert!(r.cells("Cells").unwrap().is_empty());
    }

    #[test]
    fn test_tool_mismatch_rejected() {
        let mut c = Component::new("cells", ComponentKind::CaloCellMaker);
        c.attach(Component::new("pulse", ComponentKind::PulseGenerator))
            .unwrap();
        let mut of = Component::new("of", ComponentKind::OptimalFilter);
        of.set_property("WeightsEnergy", vec![1.0, 1.0]).unwrap();
        c.attach(of).unwrap();
        let err = CaloCellStage::from_handle(c.build().unwrap()).err().unwrap();
        assert!(matches!(err, JobError::Schema { .. }));
    }
}
