//! Fixed-window clustering around generator seeds.

use super::histogram_key;
use crate::component::{ComponentHandle, Messenger};
use crate::error::Result;
use crate::output::PartitionWriter;
use crate::pipeline::record::{delta_phi, transverse, CaloCluster, Container};
use crate::pipeline::stage::StageContext;

pub struct ClusterStage {
    name: String,
    cells_key: String,
    event_key: String,
    cluster_key: String,
    truth_key: String,
    eta_window: f64,
    phi_window: f64,
    min_center_energy: f64,
    histogram_path: String,
    msg: Messenger,
}

impl ClusterStage {
    pub fn from_handle(handle: &ComponentHandle) -> Result<Self> {
        Ok(Self {
            name: handle.name().to_string(),
            cells_key: handle.text("CellsKey")?.to_string(),
            event_key: handle.text("EventKey")?.to_string(),
            cluster_key: handle.text("ClusterKey")?.to_string(),
            truth_key: handle.text("TruthKey")?.to_string(),
            eta_window: handle.number("EtaWindow")?,
            phi_window: handle.number("PhiWindow")?,
            min_center_energy: handle.number("MinCenterEnergy")?,
            histogram_path: handle.text("HistogramPath")?.to_string(),
            msg: handle.messenger(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn key(&self, leaf: &str) -> String {
        histogram_key(&self.histogram_path, leaf)
    }

    pub fn initialize(&mut self, output: &mut PartitionWriter) -> Result<()> {
        output.book_histogram(&self.key("et"), 100, 0.0, 200_000.0)?;
        output.book_histogram(&self.key("eta"), 100, -5.0, 5.0)?;
        output.book_histogram(&self.key("ncells"), 100, 0.0, 1000.0)?;
        Ok(())
    }

    fn in_window(&self, deta: f64, dphi: f64) -> bool {
        deta.abs() <= self.eta_window / 2.0 && dphi.abs() <= self.phi_window / 2.0
    }

    pub fn execute(&mut self, ctx: &mut StageContext) -> Result<()> {
        let info = ctx.record.event_info(&self.event_key)?;
        let cells = ctx.record.cells(&self.cells_key)?;
        let particles = ctx.record.particles(&self.truth_key)?;

        let mut clusters = Vec::new();
        for (seed_index, seed) in info.seeds.iter().enumerate() {
            if seed.et < self.min_center_energy {
                continue;
            }

            let members: Vec<_> = cells
                .iter()
                .filter(|c| self.in_window(c.eta - seed.eta, delta_phi(c.phi, seed.phi)))
                .cloned()
                .collect();

            let e: f64 = members.iter().map(|c| c.energy).sum();
            let (eta, phi) = if e > 0.0 {
                let eta = members.iter().map(|c| c.energy * c.eta).sum::<f64>() / e;
                let dphi = members
                    .iter()
                    .map(|c| c.energy * delta_phi(c.phi, seed.phi))
                    .sum::<f64>()
                    / e;
                (eta, delta_phi(seed.phi + dphi, 0.0))
            } else {
                (seed.eta, seed.phi)
            };

            let truth_energy = particles
                .iter()
                .filter(|p| self.in_window(p.eta - seed.eta, delta_phi(p.phi, seed.phi)))
                .map(|p| p.e)
                .sum();

            clusters.push(CaloCluster {
                seed_index,
                eta,
                phi,
                e,
                et: transverse(e, eta),
                truth_energy,
                cells: members,
            });
        }

        for cl in &clusters {
            ctx.output.fill(&self.key("et"), cl.et, 1.0)?;
            ctx.output.fill(&self.key("eta"), cl.eta, 1.0)?;
            ctx.output
                .fill(&self.key("ncells"), cl.cells.len() as f64, 1.0)?;
        }

        self.msg.debug(format_args!(
            "built {} clusters from {} seeds",
            clusters.len(),
            info.seeds.len()
        ));
        ctx.record
            .insert(&self.cluster_key, Container::Clusters(clusters))
    }
}
