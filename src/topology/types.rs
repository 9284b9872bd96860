//! Topology type definitions.

/// Re-export types from config to keep topology callers on one path
pub use crate::config::{LinkConfig, TemplateConfig, TopologyKind};

impl TopologyKind {
    /// Smallest node count for which the template produces any link
    pub fn min_nodes(&self) -> usize {
        match self {
            TopologyKind::Ring => 3,
            TopologyKind::Chain | TopologyKind::Mesh | TopologyKind::Star => 2,
        }
    }
}
