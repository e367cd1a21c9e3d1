//! Source stage: turns generated events into the first record entries.

use crate::component::{ComponentHandle, Messenger};
use crate::error::{JobError, Result};
use crate::pipeline::record::{Container, EventInfo};
use crate::pipeline::stage::StageContext;
use crate::source::{EventSource, SourceRead};

pub struct EventReaderStage {
    name: String,
    event_key: String,
    truth_key: String,
    source: Box<dyn EventSource>,
    msg: Messenger,
}

impl EventReaderStage {
    pub fn from_handle(handle: &ComponentHandle, source: Box<dyn EventSource>) -> Result<Self> {
        Ok(Self {
            name: handle.name().to_string(),
            event_key: handle.text("EventKey")?.to_string(),
            truth_key: handle.text("TruthKey")?.to_string(),
            source,
            msg: handle.messenger(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn execute(&mut self, ctx: &mut StageContext) -> Result<()> {
        let index = ctx.index;
        let event = match self.source.read_event(index) {
            Ok(SourceRead::Event(event)) => event,
            Ok(SourceRead::EndOfStream) => {
                return Err(JobError::Source {
                    index,
                    message: "end of stream".into(),
                })
            }
            Err(e @ JobError::Source { .. }) => return Err(e),
            Err(e) => {
                return Err(JobError::Source {
                    index,
                    message: e.to_string(),
                })
            }
        };

        self.msg.verbose(format_args!(
            "event {} (#{}) with {} seeds and {} particles",
            index,
            event.event_number,
            event.seeds.len(),
            event.particles.len()
        ));

        ctx.record.insert(
            &self.event_key,
            Container::EventInfo(EventInfo {
                event_number: event.event_number,
                avgmu: event.avgmu,
                seeds: event.seeds,
            }),
        )?;
        ctx.record
            .insert(&self.truth_key, Container::Particles(event.particles))?;
        Ok(())
    }
}
