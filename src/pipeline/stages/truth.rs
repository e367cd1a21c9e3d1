//! Truth particle selection.

use super::histogram_key;
use crate::component::{ComponentHandle, Messenger};
use crate::error::Result;
use crate::output::PartitionWriter;
use crate::pipeline::record::{Container, TruthParticle};
use crate::pipeline::stage::StageContext;

pub struct TruthStage {
    name: String,
    event_key: String,
    input_key: String,
    truth_key: String,
    min_energy: f64,
    max_abs_eta: f64,
    histogram_path: String,
    msg: Messenger,
}

impl TruthStage {
    pub fn from_handle(handle: &ComponentHandle) -> Result<Self> {
        Ok(Self {
            name: handle.name().to_string(),
            event_key: handle.text("EventKey")?.to_string(),
            input_key: handle.text("InputKey")?.to_string(),
            truth_key: handle.text("TruthKey")?.to_string(),
            min_energy: handle.number("MinEnergy")?,
            max_abs_eta: handle.number("MaxAbsEta")?,
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
        output.book_histogram(&self.key("count"), 20, 0.0, 20.0)?;
        Ok(())
    }

    pub fn execute(&mut self, ctx: &mut StageContext) -> Result<()> {
        // Event info must be there even though only the particles are used.
        ctx.record.event_info(&self.event_key)?;

        let selected: Vec<TruthParticle> = ctx
            .record
            .particles(&self.input_key)?
            .iter()
            .filter(|p| p.e >= self.min_energy && p.eta.abs() <= self.max_abs_eta)
            .cloned()
            .collect();

        for p in &selected {
            ctx.output.fill(&self.key("et"), p.et(), 1.0)?;
            ctx.output.fill(&self.key("eta"), p.eta, 1.0)?;
        }
        ctx.output
            .fill(&self.key("count"), selected.len() as f64, 1.0)?;

        self.msg
            .debug(format_args!("selected {} truth particles", selected.len()));
        ctx.record
            .insert(&self.truth_key, Container::Particles(selected))
    }
}
