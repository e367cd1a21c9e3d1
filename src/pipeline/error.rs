//! Pipeline composition error types.

use crate::component::{ComponentKind, ComponentRole};
use thiserror::Error;

/// Errors raised while composing or validating a pipeline. All of them are
/// configuration-time failures: a pipeline that produces one never runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Order error: cannot append {role} '{component}': {reason}")]
    Order {
        component: String,
        role: ComponentRole,
        reason: String,
    },

    #[error("Missing key: '{component}' ({kind}) consumes '{key}' but no earlier stage produces it")]
    MissingKey {
        component: String,
        kind: ComponentKind,
        key: String,
    },

    #[error("Duplicate component name '{0}'")]
    DuplicateName(String),

    #[error("Pipeline has no event source")]
    Empty,
}

impl PipelineError {
    pub(crate) fn order(
        component: impl Into<String>,
        role: ComponentRole,
        reason: impl Into<String>,
    ) -> Self {
        PipelineError::Order {
            component: component.into(),
            role,
            reason: reason.into(),
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
