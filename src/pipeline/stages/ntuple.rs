//! Physics ntuple writer: one row per generator seed.

use crate::component::{ComponentHandle, Messenger};
use crate::error::Result;
use crate::output::{ColumnValue, PartitionWriter};
use crate::pipeline::record::{delta_r, CaloCell, CaloCluster, CaloRings, CaloSampling};
use crate::pipeline::stage::StageContext;

use CaloSampling::*;

const EM1: &[CaloSampling] = &[EMB1, EMEC1];
const EM2: &[CaloSampling] = &[EMB2, EMEC2];
const EM3: &[CaloSampling] = &[EMB3, EMEC3];
const HAD1: &[CaloSampling] = &[HEC1, TileCal1, TileExt1];
const HAD2: &[CaloSampling] = &[HEC2, TileCal2, TileExt2];
const HAD3: &[CaloSampling] = &[HEC3, TileCal3, TileExt3];

const COLUMNS: &[&str] = &[
    "EventNumber",
    "avgmu",
    "seed_eta",
    "seed_phi",
    "seed_et",
    "cl_match",
    "cl_eta",
    "cl_phi",
    "cl_et",
    "cl_e1",
    "cl_e2",
    "cl_e3",
    "cl_ehad1",
    "cl_ehad2",
    "cl_ehad3",
    "cl_etot",
    "cl_f1",
    "cl_f3",
    "cl_rhad",
    "cl_ringer_match",
    "cl_rings",
];

const CELL_COLUMNS: &[&str] = &[
    "cl_cell_et",
    "cl_cell_eta",
    "cl_cell_phi",
    "cl_cell_deta",
    "cl_cell_dphi",
    "cl_cell_energy",
    "cl_cell_layer",
];

pub struct CaloNtupleStage {
    name: String,
    event_key: String,
    cluster_key: String,
    ringer_key: String,
    delta_r: f64,
    dump_cells: bool,
    ntuple_name: String,
    msg: Messenger,
}

impl CaloNtupleStage {
    pub fn from_handle(handle: &ComponentHandle) -> Result<Self> {
        Ok(Self {
            name: handle.name().to_string(),
            event_key: handle.text("EventKey")?.to_string(),
            cluster_key: handle.text("ClusterKey")?.to_string(),
            ringer_key: handle.text("RingerKey")?.to_string(),
            delta_r: handle.number("DeltaR")?,
            dump_cells: handle.boolean("DumpCells")?,
            ntuple_name: handle.text("NtupleName")?.to_string(),
            msg: handle.messenger(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = COLUMNS.to_vec();
        if self.dump_cells {
            columns.extend_from_slice(CELL_COLUMNS);
        }
        columns
    }

    pub fn initialize(&mut self, output: &mut PartitionWriter) -> Result<()> {
        output.book_table(&self.ntuple_name, &self.columns())
    }

    fn cluster_values(cluster: Option<&CaloCluster>, rings: Option<&CaloRings>) -> Vec<ColumnValue> {
        let Some(cl) = cluster else {
            let mut row = vec![ColumnValue::Bool(false)];
            row.extend(std::iter::repeat(ColumnValue::Float(-1.0)).take(COLUMNS.len() - 8));
            row.push(ColumnValue::Bool(false));
            row.push(ColumnValue::List(Vec::new()));
            return row;
        };

        let etot = cl.e;
        let fraction = |e: f64| if etot > 0.0 { e / etot } else { 0.0 };
        let e1 = cl.energy_in(EM1);
        let e3 = cl.energy_in(EM3);
        let ehad1 = cl.energy_in(HAD1);

        vec![
            ColumnValue::Bool(true),
            cl.eta.into(),
            cl.phi.into(),
            cl.et.into(),
            e1.into(),
            cl.energy_in(EM2).into(),
            e3.into(),
            ehad1.into(),
            cl.energy_in(HAD2).into(),
            cl.energy_in(HAD3).into(),
            etot.into(),
            fraction(e1).into(),
            fraction(e3).into(),
            fraction(ehad1).into(),
            ColumnValue::Bool(rings.is_some()),
            ColumnValue::List(rings.map(|r| r.rings.clone()).unwrap_or_default()),
        ]
    }

    fn cell_values(cluster: Option<&CaloCluster>) -> Vec<ColumnValue> {
        let cells = cluster.map(|c| c.cells.as_slice()).unwrap_or_default();
        vec![
            cell_list(cells, CaloCell::et),
            cell_list(cells, |c| c.eta),
            cell_list(cells, |c| c.phi),
            cell_list(cells, |c| c.deta),
            cell_list(cells, |c| c.dphi),
            cell_list(cells, |c| c.energy),
            cell_list(cells, |c| c.sampling.index() as f64),
        ]
    }

    pub fn execute(&mut self, ctx: &mut StageContext) -> Result<()> {
        let info = ctx.record.event_info(&self.event_key)?;
        let clusters = ctx.record.clusters(&self.cluster_key)?;
        let rings = ctx.record.rings(&self.ringer_key)?;

        for (seed_index, seed) in info.seeds.iter().enumerate() {
            // Closest cluster to the seed inside DeltaR.
            let matched = clusters
                .iter()
                .enumerate()
                .map(|(i, cl)| (i, cl, delta_r(cl.eta, cl.phi, seed.eta, seed.phi)))
                .filter(|(_, _, dr)| *dr < self.delta_r)
                .min_by(|a, b| a.2.total_cmp(&b.2));
            let cluster = matched.map(|(_, cl, _)| cl);
            let cluster_rings =
                matched.and_then(|(i, _, _)| rings.iter().find(|r| r.cluster_index == i));

            let mut row = vec![
                ColumnValue::from(info.event_number),
                info.avgmu.into(),
                seed.eta.into(),
                seed.phi.into(),
                seed.et.into(),
            ];
            row.extend(Self::cluster_values(cluster, cluster_rings));
            if self.dump_cells {
                row.extend(Self::cell_values(cluster));
            }

            self.msg.verbose(format_args!(
                "seed {} matched: {}",
                seed_index,
                cluster.is_some()
            ));
            ctx.output.write(&self.ntuple_name, row)?;
        }
        Ok(())
    }
}

fn cell_list(cells: &[CaloCell], f: impl Fn(&CaloCell) -> f64) -> ColumnValue {
    ColumnValue::List(cells.iter().map(f).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_row_width() {
        let values = CaloNtupleStage::cluster_values(None, None);
        assert_eq!(values.len() + 5, COLUMNS.len());
    }

    #[test]
    fn test_matched_row_width() {
        let cl = CaloCluster {
            seed_index: 0,
            eta: 0.1,
            phi: 0.1,
            e: 1000.0,
            et: 1000.0,
            truth_energy: 1000.0,
            cells: Vec::new(),
        };
        let values = CaloNtupleStage::cluster_values(Some(&cl), None);
        assert_eq!(values.len() + 5, COLUMNS.len());
        assert_eq!(CaloNtupleStage::cell_values(Some(&cl)).len(), CELL_COLUMNS.len());
    }
}
