//! Ring-shaped energy sums around each cluster's hottest cell.

use super::histogram_key;
use crate::component::{ComponentHandle, Messenger};
use crate::error::Result;
use crate::output::PartitionWriter;
use crate::pipeline::record::{delta_phi, CaloCell, CaloRings, CaloSampling, Container};
use crate::pipeline::stage::StageContext;

/// One group of samplings summed into `rings` concentric rings.
#[derive(Debug, Clone, PartialEq)]
pub struct RingSet {
    pub delta_eta: f64,
    pub delta_phi: f64,
    pub rings: usize,
    pub layers: Vec<CaloSampling>,
}

impl RingSet {
    /// Transverse energy per ring, centred on the hottest cell in the set's layers.
    pub fn sum(&self, cells: &[CaloCell]) -> Vec<f64> {
        let mut rings = vec![0.0; self.rings];
        let members: Vec<&CaloCell> = cells
            .iter()
            .filter(|c| self.layers.contains(&c.sampling))
            .collect();

        let Some(hottest) = members
            .iter()
            .max_by(|a, b| a.energy.total_cmp(&b.energy))
        else {
            return rings;
        };

        for cell in &members {
            let deta = (cell.eta - hottest.eta).abs() / self.delta_eta;
            let dphi = delta_phi(cell.phi, hottest.phi).abs() / self.delta_phi;
            let ring = deta.max(dphi).floor() as usize;
            if ring < self.rings {
                rings[ring] += cell.et();
            }
        }
        rings
    }
}

pub struct RingerStage {
    name: String,
    cluster_key: String,
    ringer_key: String,
    ring_sets: Vec<RingSet>,
    histogram_path: String,
    msg: Messenger,
}

impl RingerStage {
    pub fn from_handle(handle: &ComponentHandle) -> Result<Self> {
        let deta = handle.numbers("DeltaEtaRings")?;
        let dphi = handle.numbers("DeltaPhiRings")?;
        let counts = handle.numbers("NRings")?;
        let layers = handle.sampling_groups("LayerRings")?;

        let ring_sets = counts
            .iter()
            .zip(deta)
            .zip(dphi)
            .zip(layers)
            .map(|(((n, de), dp), layers)| RingSet {
                delta_eta: *de,
                delta_phi: *dp,
                rings: *n as usize,
                layers,
            })
            .collect();

        Ok(Self {
            name: handle.name().to_string(),
            cluster_key: handle.text("ClusterKey")?.to_string(),
            ringer_key: handle.text("RingerKey")?.to_string(),
            ring_sets,
            histogram_path: handle.text("HistogramPath")?.to_string(),
            msg: handle.messenger(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ring_sets(&self) -> &[RingSet] {
        &self.ring_sets
    }

    /// Total number of rings per cluster.
    pub fn ring_count(&self) -> usize {
        self.ring_sets.iter().map(|s| s.rings).sum()
    }

    fn key(&self, leaf: &str) -> String {
        histogram_key(&self.histogram_path, leaf)
    }

    pub fn initialize(&mut self, output: &mut PartitionWriter) -> Result<()> {
        output.book_histogram(&self.key("total_et"), 100, 0.0, 200_000.0)?;
        for i in 0..self.ring_sets.len() {
            output.book_histogram(&self.key(&format!("set_{i}_et")), 100, 0.0, 100_000.0)?;
        }
        Ok(())
    }

    pub fn execute(&mut self, ctx: &mut StageContext) -> Result<()> {
        let clusters = ctx.record.clusters(&self.cluster_key)?;

        let mut all = Vec::with_capacity(clusters.len());
        for (cluster_index, cluster) in clusters.iter().enumerate() {
            let mut rings = Vec::with_capacity(self.ring_count());
            for (i, set) in self.ring_sets.iter().enumerate() {
                let sums = set.sum(&cluster.cells);
                ctx.output
                    .fill(&self.key(&format!("set_{i}_et")), sums.iter().sum(), 1.0)?;
                rings.extend(sums);
            }
            ctx.output
                .fill(&self.key("total_et"), rings.iter().sum(), 1.0)?;
            all.push(CaloRings {
                cluster_index,
                rings,
            });
        }

        self.msg
            .verbose(format_args!("built rings for {} clusters", all.len()));
        ctx.record.insert(&self.ringer_key, Container::Rings(all))
    }
}
