//! Linear pipeline composition and key-dependency validation.

use crate::component::{Component, ComponentRole};
use crate::error::Result;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::plan::{PipelinePlan, PlanStats};
use std::collections::BTreeSet;

/// Ordered chain of components: one source, then algorithms, then at most
/// one terminal writer.
#[derive(Debug, Default)]
pub struct Pipeline {
    components: Vec<Component>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name() == name)
    }

    /// Mutable access for configuration; built components stay frozen.
    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.name() == name)
    }

    pub fn has_writer(&self) -> bool {
        self.components
            .last()
            .is_some_and(|c| c.role() == ComponentRole::Writer)
    }

    /// Append a component, enforcing the ordering rules.
    pub fn append(&mut self, component: Component) -> PipelineResult<()> {
        let role = component.role();
        let name = component.name();

        if self.components.iter().any(|c| c.name() == name) {
            return Err(PipelineError::DuplicateName(name.to_string()));
        }

        match role {
            ComponentRole::Tool => {
                return Err(PipelineError::order(
                    name,
                    role,
                    "tools can only be attached to a component",
                ));
            }
            ComponentRole::Source if !self.components.is_empty() => {
                return Err(PipelineError::order(
                    name,
                    role,
                    "the source must be the first component",
                ));
            }
            ComponentRole::Algorithm | ComponentRole::Writer if self.components.is_empty() => {
                return Err(PipelineError::order(
                    name,
                    role,
                    "no source has been appended yet",
                ));
            }
            _ => {}
        }

        if self.has_writer() {
            return Err(PipelineError::order(
                name,
                role,
                "the terminal writer has already been appended",
            ));
        }

        self.components.push(component);
        Ok(())
    }

    /// Check that every consumed key is produced by an earlier stage.
    pub fn validate(&self) -> PipelineResult<()> {
        let first = self.components.first().ok_or(PipelineError::Empty)?;
        if first.role() != ComponentRole::Source {
            return Err(PipelineError::Empty);
        }

        let mut produced: BTreeSet<String> = BTreeSet::new();
        for component in &self.components {
            let contract = component.contract();
            if let Some(key) = contract.consumes.iter().find(|k| !produced.contains(*k)) {
                return Err(PipelineError::MissingKey {
                    component: component.name().to_string(),
                    kind: component.kind(),
                    key: key.clone(),
                });
            }
            produced.extend(contract.produces);
        }
        Ok(())
    }

    /// Validate, build every component (tools first) and freeze the result.
    pub fn freeze(mut self) -> Result<PipelinePlan> {
        let start = std::time::Instant::now();
        self.validate()?;

        let mut handles = Vec::with_capacity(self.components.len());
        for component in &mut self.components {
            handles.push(component.build()?.clone());
        }

        let stats = PlanStats {
            stages: handles.len(),
            algorithms: handles
                .iter()
                .filter(|h| h.role() == ComponentRole::Algorithm)
                .count(),
            tools: handles.iter().map(|h| h.tools().len()).sum(),
            has_writer: self.has_writer(),
            build_time_us: start.elapsed().as_micros() as u64,
        };

        tracing::info!(
            "Pipeline frozen: {} stages ({} algorithms, {} tools), writer: {}",
            stats.stages,
            stats.algorithms,
            stats.tools,
            stats.has_writer
        );

        Ok(PipelinePlan::new(handles, stats))
    }
}
