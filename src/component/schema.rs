//! Allow-list schemas for every component kind.
//!
//! Each `ComponentKind` declares a static `PropertySpec` table. A key that is
//! not in the table is rejected by the property bag; a key that is present
//! carries the type, unit and default used to normalize values before they
//! reach the built handle. Record keys (`EventKey`, `ClusterKey`, ...) are
//! additionally tagged as consumed or produced, which is where the pipeline
//! validator gets each stage's dependency contract from.

use crate::component::property::PropertyValue;
use crate::pipeline::record::CaloSampling;
use crate::pipeline::stage::StageContract;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Where a component may sit in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentRole {
    /// Produces event records; must be first.
    Source,
    /// Transforms the event record.
    Algorithm,
    /// Terminal stage writing ntuple rows; at most one, must be last.
    Writer,
    /// Only usable as a child of another component.
    Tool,
}

impl ComponentRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            ComponentRole::Source => "source",
            ComponentRole::Algorithm => "algorithm",
            ComponentRole::Writer => "writer",
            ComponentRole::Tool => "tool",
        }
    }
}

impl std::fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Declared type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Bool,
    Integer,
    Number,
    Text,
    /// Name of a record in the event store.
    Key,
    Numbers,
    /// A single calorimeter sampling tag.
    Tag,
    Tags,
    TagGroups,
}

/// Unit a numeric property is supplied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    None,
    /// Supplied in GeV, stored in MeV.
    GeV,
}

impl Unit {
    pub fn factor(&self) -> f64 {
        match self {
            Unit::None => 1.0,
            Unit::GeV => 1000.0,
        }
    }
}

/// How a `Key` property relates to the event store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    None,
    Consumes,
    Produces,
}

/// Compile-time default for a property.
#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    None,
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(&'static str),
    Numbers(&'static [f64]),
    Tag(&'static str),
    Tags(&'static [&'static str]),
    TagGroups(&'static [&'static [&'static str]]),
}

impl DefaultValue {
    pub fn to_value(&self) -> Option<PropertyValue> {
        match self {
            DefaultValue::None => None,
            DefaultValue::Bool(v) => Some(PropertyValue::Bool(*v)),
            DefaultValue::Int(v) => Some(PropertyValue::Int(*v)),
            DefaultValue::Number(v) => Some(PropertyValue::Number(*v)),
            DefaultValue::Text(v) | DefaultValue::Tag(v) => Some(PropertyValue::Text(v.to_string())),
            DefaultValue::Numbers(v) => Some(PropertyValue::Numbers(v.to_vec())),
            DefaultValue::Tags(v) => Some(PropertyValue::tags(v)),
            DefaultValue::TagGroups(v) => Some(PropertyValue::tag_groups(v)),
        }
    }
}

/// One allow-listed property.
#[derive(Debug, Clone, Copy)]
pub struct PropertySpec {
    pub name: &'static str,
    pub ty: PropertyType,
    pub unit: Unit,
    pub key_role: KeyRole,
    pub default: DefaultValue,
}

impl PropertySpec {
    const fn new(name: &'static str, ty: PropertyType, default: DefaultValue) -> Self {
        Self {
            name,
            ty,
            unit: Unit::None,
            key_role: KeyRole::None,
            default,
        }
    }

    pub const fn key_in(name: &'static str, default: &'static str) -> Self {
        Self {
            key_role: KeyRole::Consumes,
            ..Self::new(name, PropertyType::Key, DefaultValue::Text(default))
        }
    }

    pub const fn key_out(name: &'static str, default: &'static str) -> Self {
        Self {
            key_role: KeyRole::Produces,
            ..Self::new(name, PropertyType::Key, DefaultValue::Text(default))
        }
    }

    pub const fn boolean(name: &'static str, default: bool) -> Self {
        Self::new(name, PropertyType::Bool, DefaultValue::Bool(default))
    }

    pub const fn integer(name: &'static str, default: i64) -> Self {
        Self::new(name, PropertyType::Integer, DefaultValue::Int(default))
    }

    pub const fn number(name: &'static str, default: f64) -> Self {
        Self::new(name, PropertyType::Number, DefaultValue::Number(default))
    }

    pub const fn energy(name: &'static str, default_gev: f64) -> Self {
        Self {
            unit: Unit::GeV,
            ..Self::number(name, default_gev)
        }
    }

    pub const fn text(name: &'static str, default: &'static str) -> Self {
        Self::new(name, PropertyType::Text, DefaultValue::Text(default))
    }

    pub const fn numbers(name: &'static str, default: &'static [f64]) -> Self {
        Self::new(name, PropertyType::Numbers, DefaultValue::Numbers(default))
    }

    pub const fn tag(name: &'static str, default: &'static str) -> Self {
        Self::new(name, PropertyType::Tag, DefaultValue::Tag(default))
    }

    pub const fn tag_groups(name: &'static str, default: &'static [&'static [&'static str]]) -> Self {
        Self::new(name, PropertyType::TagGroups, DefaultValue::TagGroups(default))
    }

    /// Check `value` against the declared type and convert it to its stored
    /// form: unit scaling, integer widening, sampling tag resolution.
    pub fn normalize(&self, value: &PropertyValue) -> Result<PropertyValue, String> {
        let mismatch = || {
            format!(
                "expected {:?}, got {} ({})",
                self.ty,
                value.type_name(),
                value
            )
        };

        match self.ty {
            PropertyType::Bool => match value {
                PropertyValue::Bool(b) => Ok(PropertyValue::Bool(*b)),
                PropertyValue::Int(0) => Ok(PropertyValue::Bool(false)),
                PropertyValue::Int(1) => Ok(PropertyValue::Bool(true)),
                _ => Err(mismatch()),
            },
            PropertyType::Integer => match value {
                PropertyValue::Int(i) => Ok(PropertyValue::Int(*i)),
                PropertyValue::Number(x) if x.fract() == 0.0 => Ok(PropertyValue::Int(*x as i64)),
                _ => Err(mismatch()),
            },
            PropertyType::Number => value
                .as_number()
                .map(|x| PropertyValue::Number(x * self.unit.factor()))
                .ok_or_else(mismatch),
            PropertyType::Text => match value {
                PropertyValue::Text(s) => Ok(PropertyValue::Text(s.clone())),
                _ => Err(mismatch()),
            },
            PropertyType::Key => match value {
                PropertyValue::Text(s) if !s.trim().is_empty() => {
                    Ok(PropertyValue::Text(s.trim().to_string()))
                }
                PropertyValue::Text(_) => Err("record key must not be empty".to_string()),
                _ => Err(mismatch()),
            },
            PropertyType::Numbers => match value {
                PropertyValue::Numbers(v) => Ok(PropertyValue::Numbers(
                    v.iter().map(|x| x * self.unit.factor()).collect(),
                )),
                _ => Err(mismatch()),
            },
            PropertyType::Tag => match value {
                PropertyValue::Text(s) => resolve_tag(s).map(PropertyValue::Text),
                _ => Err(mismatch()),
            },
            PropertyType::Tags => match value {
                PropertyValue::Tags(tags) => tags
                    .iter()
                    .map(|t| resolve_tag(t))
                    .collect::<Result<Vec<_>, _>>()
                    .map(PropertyValue::Tags),
                PropertyValue::Numbers(v) if v.is_empty() => Ok(PropertyValue::Tags(Vec::new())),
                _ => Err(mismatch()),
            },
            PropertyType::TagGroups => match value {
                PropertyValue::TagGroups(groups) => groups
                    .iter()
                    .map(|g| g.iter().map(|t| resolve_tag(t)).collect::<Result<Vec<_>, _>>())
                    .collect::<Result<Vec<_>, _>>()
                    .map(PropertyValue::TagGroups),
                PropertyValue::Numbers(v) if v.is_empty() => {
                    Ok(PropertyValue::TagGroups(Vec::new()))
                }
                _ => Err(mismatch()),
            },
        }
    }
}

fn resolve_tag(tag: &str) -> Result<String, String> {
    CaloSampling::from_name(tag)
        .map(|s| s.name().to_string())
        .ok_or_else(|| format!("unknown calorimeter sampling tag '{tag}'"))
}

// ==================== Allow-lists ====================

const OUTPUT_LEVEL: PropertySpec = PropertySpec::integer("OutputLevel", 3);

static EVENT_READER: &[PropertySpec] = &[
    PropertySpec::key_out("EventKey", "EventInfo"),
    PropertySpec::key_out("TruthKey", "GenParticles"),
    PropertySpec::text("FileName", ""),
    PropertySpec::number("BunchDuration", 25.0),
    OUTPUT_LEVEL,
];

static TRUTH_PARTICLE_MAKER: &[PropertySpec] = &[
    PropertySpec::key_in("EventKey", "EventInfo"),
    PropertySpec::key_in("InputKey", "GenParticles"),
    PropertySpec::key_out("TruthKey", "Particles"),
    PropertySpec::energy("MinEnergy", 0.0),
    PropertySpec::number("MaxAbsEta", 3.2),
    PropertySpec::text("HistogramPath", "Expert/Truth"),
    OUTPUT_LEVEL,
];

static CALO_CELL_MAKER: &[PropertySpec] = &[
    PropertySpec::key_out("CollectionKey", "Cells"),
    PropertySpec::key_in("EventKey", "EventInfo"),
    PropertySpec::key_in("TruthKey", "Particles"),
    OUTPUT_LEVEL,
    PropertySpec::text("CaloCellFile", ""),
    PropertySpec::integer("BunchIdStart", -7),
    PropertySpec::integer("BunchIdEnd", 8),
    PropertySpec::number("BunchDuration", 25.0),
    PropertySpec::integer("NumberOfSamplesPerBunch", 1),
    PropertySpec::text("HistogramPath", "Expert/Cells"),
    PropertySpec::boolean("DetailedHistograms", false),
    PropertySpec::integer("Section", 0),
    PropertySpec::tag("Layer", "EMB2"),
    PropertySpec::boolean("OnlyRoI", false),
    PropertySpec::number("EnergyFraction", 1.0),
    PropertySpec::number("DeltaEta", 0.025),
    PropertySpec::number("DeltaPhi", PI / 128.0),
];

static PULSE_GENERATOR: &[PropertySpec] = &[
    PropertySpec::text("ShaperFile", ""),
    PropertySpec::integer("NSamples", 5),
    PropertySpec::integer("StartSamplingBC", -2),
    PropertySpec::numbers("PulseShape", &[0.0, 0.5, 1.0, 0.5, 0.0]),
    OUTPUT_LEVEL,
];

static OPTIMAL_FILTER: &[PropertySpec] = &[
    PropertySpec::numbers("WeightsEnergy", &[0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0 / 3.0, 0.0]),
    OUTPUT_LEVEL,
];

static CALO_CLUSTER_MAKER: &[PropertySpec] = &[
    PropertySpec::key_in("CellsKey", "Cells"),
    PropertySpec::key_in("EventKey", "EventInfo"),
    PropertySpec::key_out("ClusterKey", "Clusters"),
    PropertySpec::key_in("TruthKey", "Particles"),
    PropertySpec::number("EtaWindow", 0.4),
    PropertySpec::number("PhiWindow", 0.4),
    PropertySpec::energy("MinCenterEnergy", 15.0),
    PropertySpec::text("HistogramPath", "Expert/Clusters"),
    OUTPUT_LEVEL,
];

static DEFAULT_RING_LAYERS: &[&[&str]] = &[
    &["PSB", "PSE"],
    &["EMB1", "EMEC1"],
    &["EMB2", "EMEC2"],
    &["EMB3", "EMEC3"],
    &["HEC1", "TileCal1", "TileExt1"],
    &["HEC2", "TileCal2", "TileExt2"],
    &["HEC3", "TileCal3", "TileExt3"],
];

static CALO_RINGER_BUILDER: &[PropertySpec] = &[
    PropertySpec::key_out("RingerKey", "Rings"),
    PropertySpec::key_in("ClusterKey", "Clusters"),
    PropertySpec::numbers("DeltaEtaRings", &[0.025, 0.00325, 0.025, 0.050, 0.1, 0.1, 0.2]),
    PropertySpec::numbers(
        "DeltaPhiRings",
        &[PI / 32.0, PI / 32.0, PI / 128.0, PI / 128.0, PI / 128.0, PI / 32.0, PI / 32.0],
    ),
    PropertySpec::numbers("NRings", &[8.0, 64.0, 8.0, 8.0, 4.0, 4.0, 4.0]),
    PropertySpec::tag_groups("LayerRings", DEFAULT_RING_LAYERS),
    PropertySpec::text("HistogramPath", "Expert/Rings"),
    OUTPUT_LEVEL,
];

static CALO_NTUPLE_MAKER: &[PropertySpec] = &[
    PropertySpec::key_in("EventKey", "EventInfo"),
    PropertySpec::key_in("ClusterKey", "Clusters"),
    PropertySpec::key_in("RingerKey", "Rings"),
    OUTPUT_LEVEL,
    PropertySpec::number("DeltaR", 0.15),
    PropertySpec::boolean("DumpCells", false),
    PropertySpec::text("NtupleName", "physics"),
];

static RAW_NTUPLE_MAKER: &[PropertySpec] = &[
    PropertySpec::key_in("EventKey", "EventInfo"),
    PropertySpec::key_in("CellsKey", "Cells"),
    PropertySpec::number("EtaWindow", 0.4),
    PropertySpec::number("PhiWindow", 0.4),
    PropertySpec::text("NtupleName", "raw"),
    OUTPUT_LEVEL,
];

// ==================== Component Kind ====================

/// Every configurable component type the job knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    EventReader,
    TruthParticleMaker,
    CaloCellMaker,
    PulseGenerator,
    OptimalFilter,
    CaloClusterMaker,
    CaloRingerBuilder,
    CaloNtupleMaker,
    RawNtupleMaker,
}

impl ComponentKind {
    /// Get all component kinds.
    pub fn all() -> &'static [ComponentKind] {
        &[
            ComponentKind::EventReader,
            ComponentKind::TruthParticleMaker,
            ComponentKind::CaloCellMaker,
            ComponentKind::PulseGenerator,
            ComponentKind::OptimalFilter,
            ComponentKind::CaloClusterMaker,
            ComponentKind::CaloRingerBuilder,
            ComponentKind::CaloNtupleMaker,
            ComponentKind::RawNtupleMaker,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ComponentKind::EventReader => "EventReader",
            ComponentKind::TruthParticleMaker => "TruthParticleMaker",
            ComponentKind::CaloCellMaker => "CaloCellMaker",
            ComponentKind::PulseGenerator => "PulseGenerator",
            ComponentKind::OptimalFilter => "OptimalFilter",
            ComponentKind::CaloClusterMaker => "CaloClusterMaker",
            ComponentKind::CaloRingerBuilder => "CaloRingerBuilder",
            ComponentKind::CaloNtupleMaker => "CaloNtupleMaker",
            ComponentKind::RawNtupleMaker => "RawNtupleMaker",
        }
    }

    pub fn role(&self) -> ComponentRole {
        match self {
            ComponentKind::EventReader => ComponentRole::Source,
            ComponentKind::TruthParticleMaker
            | ComponentKind::CaloCellMaker
            | ComponentKind::CaloClusterMaker
            | ComponentKind::CaloRingerBuilder => ComponentRole::Algorithm,
            ComponentKind::CaloNtupleMaker | ComponentKind::RawNtupleMaker => {
                ComponentRole::Writer
            }
            ComponentKind::PulseGenerator | ComponentKind::OptimalFilter => ComponentRole::Tool,
        }
    }

    /// The allow-list for this kind.
    pub fn allow_list(&self) -> &'static [PropertySpec] {
        match self {
            ComponentKind::EventReader => EVENT_READER,
            ComponentKind::TruthParticleMaker => TRUTH_PARTICLE_MAKER,
            ComponentKind::CaloCellMaker => CALO_CELL_MAKER,
            ComponentKind::PulseGenerator => PULSE_GENERATOR,
            ComponentKind::OptimalFilter => OPTIMAL_FILTER,
            ComponentKind::CaloClusterMaker => CALO_CLUSTER_MAKER,
            ComponentKind::CaloRingerBuilder => CALO_RINGER_BUILDER,
            ComponentKind::CaloNtupleMaker => CALO_NTUPLE_MAKER,
            ComponentKind::RawNtupleMaker => RAW_NTUPLE_MAKER,
        }
    }

    pub fn spec(&self, key: &str) -> Option<&'static PropertySpec> {
        self.allow_list().iter().find(|spec| spec.name == key)
    }

    /// Whether `tool` may be attached to a component of this kind.
    pub fn accepts_tool(&self, tool: ComponentKind) -> bool {
        matches!(
            (self, tool),
            (
                ComponentKind::CaloCellMaker,
                ComponentKind::PulseGenerator | ComponentKind::OptimalFilter
            )
        )
    }

    /// Record keys consumed and produced, given a lookup for the key properties.
    pub fn contract<'a>(&self, key_value: impl Fn(&'static str) -> Option<&'a str>) -> StageContract {
        let mut contract = StageContract::default();
        for spec in self.allow_list() {
            let Some(key) = key_value(spec.name) else {
                continue;
            };
            match spec.key_role {
                KeyRole::Consumes => contract.consumes.push(key.to_string()),
                KeyRole::Produces => contract.produces.push(key.to_string()),
                KeyRole::None => {}
            }
        }
        contract
    }

    /// Checks spanning several properties, run on the resolved values at build time.
    pub fn check(&self, resolved: &BTreeMap<&'static str, PropertyValue>) -> Result<(), (String, String)> {
        let number = |key: &str| resolved.get(key).and_then(|v| v.as_number());
        let list_len = |key: &str| -> usize {
            match resolved.get(key) {
                Some(PropertyValue::Numbers(v)) => v.len(),
                Some(PropertyValue::TagGroups(v)) => v.len(),
                Some(PropertyValue::Tags(v)) => v.len(),
                _ => 0,
            }
        };

        match self {
            ComponentKind::CaloClusterMaker | ComponentKind::RawNtupleMaker => {
                for key in ["EtaWindow", "PhiWindow"] {
                    if number(key).is_some_and(|w| w <= 0.0) {
                        return Err((key.to_string(), "window must be positive".to_string()));
                    }
                }
            }
            ComponentKind::CaloRingerBuilder => {
                let n = list_len("NRings");
                for key in ["DeltaEtaRings", "LayerRings"] {
                    if list_len(key) != n {
                        return Err((
                            key.to_string(),
                            format!("has {} entries but NRings has {}", list_len(key), n),
                        ));
                    }
                }
                if list_len("DeltaPhiRings") < n {
                    return Err((
                        "DeltaPhiRings".to_string(),
                        format!("needs at least {} entries", n),
                    ));
                }
                if let Some(PropertyValue::Numbers(rings)) = resolved.get("NRings") {
                    if rings.iter().any(|r| *r < 1.0 || r.fract() != 0.0) {
                        return Err((
                            "NRings".to_string(),
                            "ring counts must be positive integers".to_string(),
                        ));
                    }
                }
            }
            ComponentKind::CaloCellMaker => {
                if number("EnergyFraction").is_some_and(|f| !(0.0..=1.0).contains(&f)) {
                    return Err((
                        "EnergyFraction".to_string(),
                        "must be within [0, 1]".to_string(),
                    ));
                }
            }
            ComponentKind::PulseGenerator => {
                let samples = resolved.get("NSamples").and_then(|v| v.as_int()).unwrap_or(0);
                if samples as usize != list_len("PulseShape") {
                    return Err((
                        "PulseShape".to_string(),
                        format!("must have NSamples = {} entries", samples),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Get a description of what this component does.
    pub fn description(&self) -> &'static str {
        match self {
            ComponentKind::EventReader => "Reads generated events and seeds the event store.",
            ComponentKind::TruthParticleMaker => "Selects truth particles from generator output.",
            ComponentKind::CaloCellMaker => {
                "Deposits truth energy in one calorimeter sampling and digitizes it."
            }
            ComponentKind::PulseGenerator => "Shapes a cell energy into readout samples.",
            ComponentKind::OptimalFilter => "Estimates cell energy from readout samples.",
            ComponentKind::CaloClusterMaker => "Builds fixed-window clusters around truth seeds.",
            ComponentKind::CaloRingerBuilder => "Sums cluster cell energy in concentric rings.",
            ComponentKind::CaloNtupleMaker => "Writes one physics row per generator seed.",
            ComponentKind::RawNtupleMaker => "Writes the cells around each seed.",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_accepts_output_level() {
        for kind in ComponentKind::all() {
            assert!(kind.spec("OutputLevel").is_some(), "{kind} lacks OutputLevel");
        }
    }

    #[test]
    fn test_allow_lists_have_no_duplicates() {
        for kind in ComponentKind::all() {
            let list = kind.allow_list();
            for (i, a) in list.iter().enumerate() {
                for b in &list[i + 1..] {
                    assert_ne!(a.name, b.name, "{kind} declares {} twice", a.name);
                }
            }
        }
    }

    #[test]
    fn test_defaults_normalize() {
        for kind in ComponentKind::all() {
            for spec in kind.allow_list() {
                if let Some(value) = spec.default.to_value() {
                    assert!(
                        spec.normalize(&value).is_ok(),
                        "default of {kind}.{} does not normalize",
                        spec.name
                    );
                }
            }
        }
    }

    #[test]
    fn test_energy_unit_conversion() {
        let spec = ComponentKind::CaloClusterMaker.spec("MinCenterEnergy").unwrap();
        assert_eq!(
            spec.normalize(&PropertyValue::Int(5)).unwrap(),
            PropertyValue::Number(5000.0)
        );
    }

    #[test]
    fn test_tag_resolution() {
        let spec = ComponentKind::CaloRingerBuilder.spec("LayerRings").unwrap();
        let value = PropertyValue::tag_groups(&[&["emb1", "EMEC1"]]);
        assert_eq!(
            spec.normalize(&value).unwrap(),
            PropertyValue::tag_groups(&[&["EMB1", "EMEC1"]])
        );

        let bad = PropertyValue::tag_groups(&[&["EMB9"]]);
        assert!(spec.normalize(&bad).unwrap_err().contains("EMB9"));
    }

    #[test]
    fn test_type_mismatch() {
        let spec = ComponentKind::CaloClusterMaker.spec("EtaWindow").unwrap();
        assert!(spec.normalize(&PropertyValue::from("wide")).is_err());

        let key = ComponentKind::CaloClusterMaker.spec("ClusterKey").unwrap();
        assert!(key.normalize(&PropertyValue::from("  ")).is_err());
    }

    #[test]
    fn test_contract_from_keys() {
        let contract = ComponentKind::CaloRingerBuilder.contract(|name| match name {
            "RingerKey" => Some("Rings"),
            "ClusterKey" => Some("Clusters"),
            _ => None,
        });
        assert_eq!(contract.consumes, vec!["Clusters".to_string()]);
        assert_eq!(contract.produces, vec!["Rings".to_string()]);
    }

    #[test]
    fn test_roles() {
        assert_eq!(ComponentKind::EventReader.role(), ComponentRole::Source);
        assert_eq!(ComponentKind::PulseGenerator.role(), ComponentRole::Tool);
        assert_eq!(ComponentKind::CaloNtupleMaker.role(), ComponentRole::Writer);
        assert!(ComponentKind::CaloCellMaker.accepts_tool(ComponentKind::OptimalFilter));
        assert!(!ComponentKind::CaloClusterMaker.accepts_tool(ComponentKind::OptimalFilter));
    }
}
