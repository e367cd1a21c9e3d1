//! The standard reconstruction chain.
//!
//! ```text
//! EventReader → TruthParticleMaker → CaloCellMaker_<LAYER> (one per sampling)
//!     physics: → CaloClusterMaker → CaloRingerBuilder → CaloNtupleMaker
//!     raw:     → RawNtupleMaker
//! ```
//!
//! Overrides from the job file's `[properties.<Name>]` tables are applied
//! through `set_property`, so they go through the same schema checks as the
//! defaults set here.

use crate::component::{Component, ComponentKind, PropertyValue};
use crate::config::{JobConfig, OutputMode, DEFAULT_BUNCH_DURATION_NS};
use crate::error::{JobError, Result, ResultExt};
use crate::pipeline::{CaloSampling, Pipeline};
use std::collections::BTreeSet;

/// Build the chain for `config.ntuple`, ready to hand to the accumulator.
pub fn build_reco_pipeline(config: &JobConfig) -> Result<Pipeline> {
    let mut configurator = Configurator::new(config);
    let mut pipeline = Pipeline::new();

    let mut reader = configurator.component("EventReader", ComponentKind::EventReader)?;
    if let Some(input) = &config.input_file {
        reader.set_property("FileName", input.to_string_lossy().into_owned())?;
    }
    reader.set_property("BunchDuration", DEFAULT_BUNCH_DURATION_NS)?;
    configurator.finish(&mut reader)?;
    pipeline.append(reader)?;

    let mut truth =
        configurator.component("TruthParticleMaker", ComponentKind::TruthParticleMaker)?;
    truth.set_property("HistogramPath", "Expert/Truth")?;
    configurator.finish(&mut truth)?;
    pipeline.append(truth)?;

    for &sampling in CaloSampling::all() {
        let cells = cell_maker(&mut configurator, sampling)
            .with_context(|| format!("Failed to configure cell maker for {sampling}"))?;
        pipeline.append(cells)?;
    }

    match config.ntuple {
        OutputMode::Physics => {
            let mut cluster =
                configurator.component("CaloClusterMaker", ComponentKind::CaloClusterMaker)?;
            cluster.set_property("EtaWindow", 0.4)?;
            cluster.set_property("PhiWindow", 0.4)?;
            // GeV
            cluster.set_property("MinCenterEnergy", 5.0)?;
            cluster.set_property("HistogramPath", "Expert/Clusters")?;
            configurator.finish(&mut cluster)?;
            pipeline.append(cluster)?;

            let mut ringer =
                configurator.component("CaloRingerBuilder", ComponentKind::CaloRingerBuilder)?;
            ringer.set_property("HistogramPath", "Expert/Rings")?;
            configurator.finish(&mut ringer)?;
            pipeline.append(ringer)?;

            let mut ntuple =
                configurator.component("CaloNtupleMaker", ComponentKind::CaloNtupleMaker)?;
            ntuple.set_property("DeltaR", 0.15)?;
            ntuple.set_property("DumpCells", true)?;
            configurator.finish(&mut ntuple)?;
            pipeline.append(ntuple)?;
        }
        OutputMode::Raw => {
            let mut ntuple =
                configurator.component("RawNtupleMaker", ComponentKind::RawNtupleMaker)?;
            ntuple.set_property("EtaWindow", 0.4)?;
            ntuple.set_property("PhiWindow", 0.4)?;
            configurator.finish(&mut ntuple)?;
            pipeline.append(ntuple)?;
        }
    }

    configurator.check_unused()?;
    tracing::debug!(
        "Configured {} pipeline with {} components",
        config.ntuple,
        pipeline.len()
    );
    Ok(pipeline)
}

fn cell_maker(configurator: &mut Configurator, sampling: CaloSampling) -> Result<Component> {
    let tag = sampling.name();
    let (deta, dphi) = sampling.granularity();

    let mut cells =
        configurator.component(&format!("CaloCellMaker_{tag}"), ComponentKind::CaloCellMaker)?;
    cells.set_property("Layer", tag)?;
    cells.set_property("EnergyFraction", sampling.energy_fraction())?;
    cells.set_property("DeltaEta", deta)?;
    cells.set_property("DeltaPhi", dphi)?;
    cells.set_property("HistogramPath", "Expert/Cells")?;
    cells.set_property("BunchDuration", DEFAULT_BUNCH_DURATION_NS)?;

    let mut pulse =
        configurator.component(&format!("PulseGenerator_{tag}"), ComponentKind::PulseGenerator)?;
    configurator.finish(&mut pulse)?;
    cells.attach(pulse)?;

    let mut filter =
        configurator.component(&format!("OptimalFilter_{tag}"), ComponentKind::OptimalFilter)?;
    configurator.finish(&mut filter)?;
    cells.attach(filter)?;

    configurator.finish(&mut cells)?;
    Ok(cells)
}

/// Applies the job-wide output level and the per-name overrides.
struct Configurator<'a> {
    config: &'a JobConfig,
    applied: BTreeSet<String>,
}

impl<'a> Configurator<'a> {
    fn new(config: &'a JobConfig) -> Self {
        Self {
            config,
            applied: BTreeSet::new(),
        }
    }

    fn component(&self, name: &str, kind: ComponentKind) -> Result<Component> {
        let mut component = Component::new(name, kind);
        component.set_property("OutputLevel", i64::from(self.config.output_level))?;
        Ok(component)
    }

    /// Overrides go last so they win over the chain defaults.
    fn finish(&mut self, component: &mut Component) -> Result<()> {
        let Some(overrides) = self.config.properties.get(component.name()) else {
            return Ok(());
        };
        for (key, value) in overrides {
            component.set_property(key, PropertyValue::clone(value))?;
        }
        self.applied.insert(component.name().to_string());
        Ok(())
    }

    fn check_unused(&self) -> Result<()> {
        let unknown: Vec<&str> = self
            .config
            .properties
            .keys()
            .filter(|name| !self.applied.contains(*name))
            .map(String::as_str)
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(JobError::Config(format!(
                "property overrides for unknown components: {}",
                unknown.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentRole;
    use crate::config::OutputLevel;

    fn config(mode: OutputMode) -> JobConfig {
        JobConfig {
            input_file: Some("events.jsonl".into()),
            ntuple: mode,
            output_level: OutputLevel::Info,
            ..JobConfig::default()
        }
    }

    #[test]
    fn test_physics_chain() {
        let pipeline = build_reco_pipeline(&config(OutputMode::Physics)).unwrap();
        let names: Vec<&str> = pipeline.components().iter().map(|c| c.name()).collect();

        assert_eq!(names[0], "EventReader");
        assert_eq!(names[1], "TruthParticleMaker");
        assert_eq!(pipeline.len(), 2 + CaloSampling::all().len() + 3);
        assert_eq!(names.last(), Some(&"CaloNtupleMaker"));
        assert!(pipeline.has_writer());
        assert!(pipeline.validate().is_ok());

        let emb2 = pipeline.component("CaloCellMaker_EMB2").unwrap();
        assert_eq!(emb2.tools().len(), 2);
        assert_eq!(
            emb2.get_property("OutputLevel").unwrap(),
            Some(&PropertyValue::Int(2))
        );
    }

    #[test]
    fn test_raw_chain() {
        let pipeline = build_reco_pipeline(&config(OutputMode::Raw)).unwrap();
        let last = pipeline.components().last().unwrap();
        assert_eq!(last.kind(), ComponentKind::RawNtupleMaker);
        assert_eq!(last.role(), ComponentRole::Writer);
        assert!(pipeline.component("CaloClusterMaker").is_none());
    }

    #[test]
    fn test_overrides_are_schema_checked() {
        let mut cfg = config(OutputMode::Physics);
        cfg.set_override("CaloClusterMaker", "EtaWindow", PropertyValue::Number(0.2));
        cfg.set_override("PulseGenerator_EMB1", "NSamples", PropertyValue::Int(5));
        let pipeline = build_reco_pipeline(&cfg).unwrap();
        assert_eq!(
            pipeline
                .component("CaloClusterMaker")
                .unwrap()
                .get_property("EtaWindow")
                .unwrap(),
            Some(&PropertyValue::Number(0.2))
        );

        let mut bad = config(OutputMode::Physics);
        bad.set_override("CaloClusterMaker", "Bogus", PropertyValue::Int(1));
        let err = build_reco_pipeline(&bad).unwrap_err();
        assert!(matches!(err, JobError::Schema { .. }));
    }

    #[test]
    fn test_override_for_unknown_component() {
        let mut cfg = config(OutputMode::Raw);
        cfg.set_override("CaloRingerBuilder", "NRings", PropertyValue::Numbers(vec![8.0]));
        let err = build_reco_pipeline(&cfg).unwrap_err();
        assert!(matches!(err, JobError::Config(_)));
    }
}
