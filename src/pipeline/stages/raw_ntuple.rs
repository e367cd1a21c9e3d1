//! Raw ntuple writer: the digitized cells around each seed, for energy
//! estimation studies.

use crate::component::{ComponentHandle, Messenger};
use crate::error::Result;
use crate::output::{ColumnValue, PartitionWriter};
use crate::pipeline::record::{delta_phi, CaloCell};
use crate::pipeline::stage::StageContext;

const COLUMNS: &[&str] = &[
    "EventNumber",
    "avgmu",
    "seed_eta",
    "seed_phi",
    "seed_et",
    "cell_eta",
    "cell_phi",
    "cell_deta",
    "cell_dphi",
    "cell_layer",
    "cell_truth_energy",
    "cell_energy",
    "cell_samples",
];

pub struct RawNtupleStage {
    name: String,
    event_key: String,
    cells_key: String,
    eta_window: f64,
    phi_window: f64,
    ntuple_name: String,
    msg: Messenger,
}

impl RawNtupleStage {
    pub fn from_handle(handle: &ComponentHandle) -> Result<Self> {
        Ok(Self {
            name: handle.name().to_string(),
            event_key: handle.text("EventKey")?.to_string(),
            cells_key: handle.text("CellsKey")?.to_string(),
            eta_window: handle.number("EtaWindow")?,
            phi_window: handle.number("PhiWindow")?,
            ntuple_name: handle.text("NtupleName")?.to_string(),
            msg: handle.messenger(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initialize(&mut self, output: &mut PartitionWriter) -> Result<()> {
        output.book_table(&self.ntuple_name, COLUMNS)
    }

    pub fn execute(&mut self, ctx: &mut StageContext) -> Result<()> {
        let info = ctx.record.event_info(&self.event_key)?;
        let cells = ctx.record.cells(&self.cells_key)?;

        for seed in &info.seeds {
            let selected: Vec<&CaloCell> = cells
                .iter()
                .filter(|c| {
                    (c.eta - seed.eta).abs() <= self.eta_window / 2.0
                        && delta_phi(c.phi, seed.phi).abs() <= self.phi_window / 2.0
                })
                .collect();

            let list = |f: fn(&CaloCell) -> f64| -> ColumnValue {
                ColumnValue::List(selected.iter().map(|&c| f(c)).collect())
            };
            let samples: Vec<f64> = selected
                .iter()
                .flat_map(|c| c.samples.iter().copied())
                .collect();

            let row = vec![
                ColumnValue::from(info.event_number),
                info.avgmu.into(),
                seed.eta.into(),
                seed.phi.into(),
                seed.et.into(),
                list(|c| c.eta),
                list(|c| c.phi),
                list(|c| c.deta),
                list(|c| c.dphi),
                list(|c| c.sampling.index() as f64),
                list(|c| c.truth_energy),
                list(|c| c.energy),
                ColumnValue::List(samples),
            ];

            self.msg
                .verbose(format_args!("{} cells around seed", selected.len()));
            ctx.output.write(&self.ntuple_name, row)?;
        }
        Ok(())
    }
}
