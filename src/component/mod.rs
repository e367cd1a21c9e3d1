//! Configurable components and their build-once handles.
//!
//! A `Component` is the setup-phase object: it owns a schema-checked
//! [`PropertyBag`] and the tools attached to it. Calling [`Component::build`]
//! materializes a [`ComponentHandle`], the immutable executable description
//! that worker shards instantiate their stages from.
//!
//! # Lifecycle
//!
//! ```text
//! Component::new ─► set_property / attach ─► build() ─► &ComponentHandle
//!                    (mutable phase)           │          (frozen)
//!                                              └─ tools built first, depth-first
//! ```
//!
//! - `build()` is memoized: the second call returns the cached handle.
//! - After `build()`, `set_property` and `attach` fail with `JobError::Frozen`;
//!   `get_property` keeps returning the last value set.

pub mod bag;
pub mod messenger;
pub mod property;
pub mod schema;

pub use bag::PropertyBag;
pub use messenger::Messenger;
pub use property::PropertyValue;
pub use schema::{ComponentKind, ComponentRole, PropertySpec, PropertyType, Unit};

use crate::config::OutputLevel;
use crate::error::{JobError, Result};
use crate::pipeline::record::CaloSampling;
use crate::pipeline::stage::StageContract;
use std::collections::BTreeMap;

/// A configurable algorithm, source, writer or tool.
#[derive(Debug)]
pub struct Component {
    name: String,
    kind: ComponentKind,
    properties: PropertyBag,
    tools: Vec<Component>,
    handle: Option<ComponentHandle>,
}

impl Component {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        let name = name.into();
        Self {
            properties: PropertyBag::new(name.clone(), kind),
            name,
            kind,
            tools: Vec::new(),
            handle: None,
        }
    }

    /// Create a component and apply `properties` in order. Stops at the first
    /// schema violation.
    pub fn with_properties<K, V>(
        name: impl Into<String>,
        kind: ComponentKind,
        properties: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<PropertyValue>,
    {
        let mut component = Self::new(name, kind);
        for (key, value) in properties {
            component.set_property(key.as_ref(), value)?;
        }
        Ok(component)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn role(&self) -> ComponentRole {
        self.kind.role()
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn tools(&self) -> &[Component] {
        &self.tools
    }

    pub fn is_built(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<&ComponentHandle> {
        self.handle.as_ref()
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<PropertyValue>) -> Result<()> {
        let value = value.into();
        if self.handle.is_some() {
            // Unknown keys still report as schema errors.
            self.properties.get(key)?;
            return Err(JobError::Frozen {
                component: self.name.clone(),
                key: key.to_string(),
            });
        }
        self.properties.set(key, value)
    }

    pub fn get_property(&self, key: &str) -> Result<Option<&PropertyValue>> {
        self.properties.get(key)
    }

    /// Take ownership of `tool` as a child of this component.
    pub fn attach(&mut self, tool: Component) -> Result<()> {
        if self.handle.is_some() {
            return Err(JobError::Frozen {
                component: self.name.clone(),
                key: format!("tool:{}", tool.name),
            });
        }
        if tool.role() != ComponentRole::Tool || !self.kind.accepts_tool(tool.kind) {
            return Err(JobError::schema(
                self.name.clone(),
                self.kind,
                tool.name.clone(),
                format!("{} cannot be attached as a tool", tool.kind),
            ));
        }
        self.tools.push(tool);
        Ok(())
    }

    /// Record keys this component reads and writes, from its current properties.
    pub fn contract(&self) -> StageContract {
        let keys: BTreeMap<&'static str, String> = self
            .kind
            .allow_list()
            .iter()
            .filter(|spec| spec.ty == PropertyType::Key)
            .filter_map(|spec| {
                self.properties
                    .value_or_default(spec.name)
                    .and_then(|v| v.as_str().map(|s| s.trim().to_string()))
                    .map(|s| (spec.name, s))
            })
            .collect();
        self.kind.contract(|name| keys.get(name).map(String::as_str))
    }

    /// Build the executable handle, or return the cached one.
    pub fn build(&mut self) -> Result<&ComponentHandle> {
        if self.handle.is_none() {
            let mut tool_handles = Vec::with_capacity(self.tools.len());
            for tool in &mut self.tools {
                tool_handles.push(tool.build()?.clone());
            }

            let properties = self.properties.resolve()?;

            tracing::debug!(
                component = self.name.as_str(),
                kind = %self.kind,
                tools = tool_handles.len(),
                "Built component handle"
            );

            self.handle = Some(ComponentHandle {
                name: self.name.clone(),
                kind: self.kind,
                properties,
                tools: tool_handles,
            });
        }

        self.handle
            .as_ref()
            .ok_or_else(|| JobError::InvalidState(format!("component '{}' has no handle", self.name)))
    }
}

/// Immutable, fully resolved description of a built component.
///
/// Cloned into every worker shard, where the stage factory turns it into
/// per-shard stage state.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentHandle {
    name: String,
    kind: ComponentKind,
    properties: BTreeMap<&'static str, PropertyValue>,
    tools: Vec<ComponentHandle>,
}

impl ComponentHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn role(&self) -> ComponentRole {
        self.kind.role()
    }

    pub fn tools(&self) -> &[ComponentHandle] {
        &self.tools
    }

    /// First attached tool of the given kind.
    pub fn tool(&self, kind: ComponentKind) -> Option<&ComponentHandle> {
        self.tools.iter().find(|t| t.kind == kind)
    }

    /// Normalized value of `key`.
    pub fn value(&self, key: &str) -> Result<&PropertyValue> {
        self.properties
            .get(key)
            .ok_or_else(|| self.misuse(key, "no value and no default"))
    }

    fn misuse(&self, key: &str, reason: impl Into<String>) -> JobError {
        JobError::schema(self.name.clone(), self.kind, key, reason)
    }

    pub fn number(&self, key: &str) -> Result<f64> {
        self.value(key)?
            .as_number()
            .ok_or_else(|| self.misuse(key, "not a number"))
    }

    pub fn integer(&self, key: &str) -> Result<i64> {
        self.value(key)?
            .as_int()
            .ok_or_else(|| self.misuse(key, "not an integer"))
    }

    pub fn boolean(&self, key: &str) -> Result<bool> {
        self.value(key)?
            .as_bool()
            .ok_or_else(|| self.misuse(key, "not a bool"))
    }

    pub fn text(&self, key: &str) -> Result<&str> {
        self.value(key)?
            .as_str()
            .ok_or_else(|| self.misuse(key, "not a string"))
    }

    pub fn numbers(&self, key: &str) -> Result<&[f64]> {
        self.value(key)?
            .as_numbers()
            .ok_or_else(|| self.misuse(key, "not a number list"))
    }

    pub fn sampling(&self, key: &str) -> Result<CaloSampling> {
        let tag = self.text(key)?;
        CaloSampling::from_name(tag).ok_or_else(|| self.misuse(key, "not a sampling tag"))
    }

    pub fn sampling_groups(&self, key: &str) -> Result<Vec<Vec<CaloSampling>>> {
        let groups = self
            .value(key)?
            .as_tag_groups()
            .ok_or_else(|| self.misuse(key, "not tag groups"))?;
        groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|tag| {
                        CaloSampling::from_name(tag)
                            .ok_or_else(|| self.misuse(key, format!("unknown tag '{tag}'")))
                    })
                    .collect()
            })
            .collect()
    }

    pub fn output_level(&self) -> OutputLevel {
        self.properties
            .get("OutputLevel")
            .and_then(|v| v.as_int())
            .and_then(OutputLevel::from_level)
            .unwrap_or_default()
    }

    /// A messenger named after this component, at its configured level.
    pub fn messenger(&self) -> Messenger {
        Messenger::new(self.name.clone(), self.output_level())
    }

    pub fn contract(&self) -> StageContract {
        self.kind.contract(|name| self.properties.get(name).and_then(|v| v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_maker() -> Component {
        let mut cells = Component::new("CaloCellMaker_EMB2", ComponentKind::CaloCellMaker);
        cells.set_property("Layer", "EMB2").unwrap();
        cells
            .attach(Component::new("PulseGenerator_EMB2", ComponentKind::PulseGenerator))
            .unwrap();
        cells
            .attach(Component::new("OptimalFilter_EMB2", ComponentKind::OptimalFilter))
            .unwrap();
        cells
    }

    #[test]
    fn test_round_trip_before_and_after_build() {
        let mut comp = Component::new("CaloClusterMaker", ComponentKind::CaloClusterMaker);
        comp.set_property("EtaWindow", 0.2).unwrap();
        assert_eq!(comp.get_property("EtaWindow").unwrap(), Some(&PropertyValue::Number(0.2)));

        comp.build().unwrap();
        assert_eq!(comp.get_property("EtaWindow").unwrap(), Some(&PropertyValue::Number(0.2)));
    }

    #[test]
    fn test_unknown_key_for_every_kind() {
        for kind in ComponentKind::all() {
            let mut comp = Component::new("c", *kind);
            assert!(matches!(
                comp.set_property("NotAProperty", 1),
                Err(JobError::Schema { .. })
            ));
            assert!(matches!(
                comp.get_property("NotAProperty"),
                Err(JobError::Schema { .. })
            ));
        }
    }

    #[test]
    fn test_build_is_idempotent() {
        let mut cells = cell_maker();
        let first = cells.build().unwrap() as *const ComponentHandle;
        let second = cells.build().unwrap() as *const ComponentHandle;
        assert_eq!(first, second);
        assert_eq!(cells.handle().unwrap().tools().len(), 2);
    }

    #[test]
    fn test_tools_built_before_parent() {
        let mut cells = cell_maker();
        cells.build().unwrap();
        assert!(cells.tools().iter().all(Component::is_built));
        let handle = cells.handle().unwrap();
        assert!(handle.tool(ComponentKind::PulseGenerator).is_some());
        assert!(handle.tool(ComponentKind::OptimalFilter).is_some());
    }

    #[test]
    fn test_frozen_after_build() {
        let mut cells = cell_maker();
        cells.build().unwrap();

        assert!(matches!(
            cells.set_property("EnergyFraction", 0.5),
            Err(JobError::Frozen { .. })
        ));
        assert!(matches!(
            cells.set_property("Bogus", 0.5),
            Err(JobError::Schema { .. })
        ));
        assert!(matches!(
            cells.attach(Component::new("extra", ComponentKind::OptimalFilter)),
            Err(JobError::Frozen { .. })
        ));
        assert_eq!(cells.handle().unwrap().tools().len(), 2);
    }

    #[test]
    fn test_attach_rejects_non_tools() {
        let mut cells = Component::new("cells", ComponentKind::CaloCellMaker);
        let err = cells
            .attach(Component::new("clusters", ComponentKind::CaloClusterMaker))
            .unwrap_err();
        assert!(matches!(err, JobError::Schema { .. }));
    }

    #[test]
    fn test_handle_normalized_values() {
        let mut comp = Component::with_properties(
            "CaloClusterMaker",
            ComponentKind::CaloClusterMaker,
            [("MinCenterEnergy", PropertyValue::Int(5))],
        )
        .unwrap();
        let handle = comp.build().unwrap();
        assert_eq!(handle.number("MinCenterEnergy").unwrap(), 5000.0);
        assert_eq!(handle.text("ClusterKey").unwrap(), "Clusters");
        assert_eq!(handle.output_level(), OutputLevel::Warning);
        assert!(handle.integer("EtaWindow").is_err());
    }

    #[test]
    fn test_contract_uses_configured_keys() {
        let mut comp = Component::new("ringer", ComponentKind::CaloRingerBuilder);
        comp.set_property("ClusterKey", "MyClusters").unwrap();
        let contract = comp.contract();
        assert_eq!(contract.consumes, vec!["MyClusters".to_string()]);
        assert_eq!(contract.produces, vec!["Rings".to_string()]);
        assert_eq!(comp.build().unwrap().contract(), contract);
    }
}
