use crate::component::{ComponentHandle, ComponentRole};

/// Frozen form of a validated pipeline: the built handles in execution order.
/// Shared read-only by every worker shard.
#[derive(Debug, Clone)]
pub struct PipelinePlan {
    handles: Vec<ComponentHandle>,
    stats: PlanStats,
}

/// Statistics about the frozen plan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanStats {
    /// Number of top-level stages
    pub stages: usize,

    /// Number of algorithm stages
    pub algorithms: usize,

    /// Tools attached across all stages
    pub tools: usize,

    /// Whether the chain ends in a writer
    pub has_writer: bool,

    /// Time spent validating and building, in microseconds
    pub build_time_us: u64,
}

impl PipelinePlan {
    pub(crate) fn new(handles: Vec<ComponentHandle>, stats: PlanStats) -> Self {
        Self { handles, stats }
    }

    pub fn stages(&self) -> &[ComponentHandle] {
        &self.handles
    }

    pub fn stats(&self) -> &PlanStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// The event source stage.
    pub fn source(&self) -> Option<&ComponentHandle> {
        self.handles
            .first()
            .filter(|h| h.role() == ComponentRole::Source)
    }

    pub fn writer(&self) -> Option<&ComponentHandle> {
        self.handles
            .last()
            .filter(|h| h.role() == ComponentRole::Writer)
    }
}
