//! Mutation operator enumeration.

use crate::graph::BranchId;
use crate::layer::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of mutation operators.
///
/// Dispatch goes through this enum rather than operator names, so every
/// kind is matched exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Replace one interior node's layer type and config.
    ArchitecturePart,
    /// Regenerate one interior node's config, keeping its type.
    ArchitectureParameters,
    /// Insert a freshly sampled layer at an open branch end.
    ArchitectureAdd,
    /// Remove an interior node and bridge its neighbours.
    ArchitectureRemove,
    /// Fork an open branch into parallel branches.
    ArchitectureSplit,
    /// Join open branches through a new layer.
    ArchitectureMerge,
    /// Regenerate every training hyperparameter.
    TrainingAll,
    /// Regenerate one training hyperparameter.
    TrainingPart,
}

impl MutationKind {
    /// Every kind, in declaration order.
    pub const ALL: [MutationKind; 8] = [
        MutationKind::ArchitecturePart,
        MutationKind::ArchitectureParameters,
        MutationKind::ArchitectureAdd,
        MutationKind::ArchitectureRemove,
        MutationKind::ArchitectureSplit,
        MutationKind::ArchitectureMerge,
        MutationKind::TrainingAll,
        MutationKind::TrainingPart,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MutationKind::ArchitecturePart => "architecture_part",
            MutationKind::ArchitectureParameters => "architecture_parameters",
            MutationKind::ArchitectureAdd => "architecture_add",
            MutationKind::ArchitectureRemove => "architecture_remove",
            MutationKind::ArchitectureSplit => "architecture_split",
            MutationKind::ArchitectureMerge => "architecture_merge",
            MutationKind::TrainingAll => "training_all",
            MutationKind::TrainingPart => "training_part",
        }
    }

    /// Whether the operator changes the graph (as opposed to training
    /// hyperparameters).
    pub fn is_structural(self) -> bool {
        !matches!(self, MutationKind::TrainingAll | MutationKind::TrainingPart)
    }

    /// Position of this kind in [`MutationKind::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Nodes and branches an operator touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Affected {
    pub nodes: Vec<NodeId>,
    pub branches: Vec<BranchId>,
}

impl Affected {
    pub fn node(id: NodeId) -> Self {
        Self {
            nodes: vec![id],
            branches: Vec::new(),
        }
    }
}
