//! Schema-checked key/value storage behind every component.

use crate::component::property::PropertyValue;
use crate::component::schema::{ComponentKind, PropertySpec};
use crate::error::{JobError, Result};
use std::collections::BTreeMap;

/// Property storage for one component.
///
/// Keys are restricted to the owning kind's allow-list. Values are stored as
/// given; normalization is checked on `set` (so a bad value is rejected before
/// anything is stored) but only applied when the component is built.
#[derive(Debug, Clone)]
pub struct PropertyBag {
    owner: String,
    kind: ComponentKind,
    values: BTreeMap<&'static str, PropertyValue>,
}

impl PropertyBag {
    pub fn new(owner: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            owner: owner.into(),
            kind,
            values: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    fn spec(&self, key: &str) -> Result<&'static PropertySpec> {
        self.kind.spec(key).ok_or_else(|| {
            JobError::schema(
                self.owner.clone(),
                self.kind,
                key,
                "not in the allow-list",
            )
        })
    }

    /// Store `value` under `key`.
    pub fn set(&mut self, key: &str, value: PropertyValue) -> Result<()> {
        let spec = self.spec(key)?;
        spec.normalize(&value)
            .map_err(|reason| JobError::schema(self.owner.clone(), self.kind, key, reason))?;
        self.values.insert(spec.name, value);
        Ok(())
    }

    /// Last value stored under `key`, or `None` if it was never set.
    pub fn get(&self, key: &str) -> Result<Option<&PropertyValue>> {
        let spec = self.spec(key)?;
        Ok(self.values.get(spec.name))
    }

    /// Whether `key` was explicitly set.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Explicitly set properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stored value for `key`, falling back to the declared default. Not normalized.
    pub fn value_or_default(&self, key: &str) -> Option<PropertyValue> {
        let spec = self.kind.spec(key)?;
        self.values
            .get(spec.name)
            .cloned()
            .or_else(|| spec.default.to_value())
    }

    /// Every declared property, normalized, with defaults filled in.
    pub fn resolve(&self) -> Result<BTreeMap<&'static str, PropertyValue>> {
        let mut resolved = BTreeMap::new();
        for spec in self.kind.allow_list() {
            let raw = match self.values.get(spec.name) {
                Some(v) => v.clone(),
                None => match spec.default.to_value() {
                    Some(v) => v,
                    None => continue,
                },
            };
            let normalized = spec.normalize(&raw).map_err(|reason| {
                JobError::schema(self.owner.clone(), self.kind, spec.name, reason)
            })?;
            resolved.insert(spec.name, normalized);
        }

        self.kind
            .check(&resolved)
            .map_err(|(key, reason)| JobError::schema(self.owner.clone(), self.kind, key, reason))?;

        Ok(resolved)
    }
}
