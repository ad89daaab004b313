//! Branch bookkeeping, history records and lineage.

use super::structure::ArchitectureGraph;
use crate::layer::NodeId;
use crate::mutation::MutationKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a branch. Issued sequentially, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(pub usize);

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of one branch.
///
/// An open branch has a current end node that feeds the finisher; new
/// layers are inserted after it. A closed branch has been split or merged
/// away and accepts no more layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchState {
    Open { end: NodeId },
    Closed,
}

/// A linear run of nodes between a fork and the next join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub(crate) members: Vec<NodeId>,
    pub(crate) state: BranchState,
}

impl Branch {
    pub(crate) fn open(members: Vec<NodeId>, end: NodeId) -> Self {
        Self {
            members,
            state: BranchState::Open { end },
        }
    }

    /// Member nodes in the order they were placed on the branch.
    ///
    /// A branch forked without seed layers starts with no members; its
    /// end is then the fork node, which belongs to the parent branch.
    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn state(&self) -> BranchState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, BranchState::Open { .. })
    }

    /// Current open end, or `None` once closed.
    pub fn end(&self) -> Option<NodeId> {
        match self.state {
            BranchState::Open { end } => Some(end),
            BranchState::Closed => None,
        }
    }

    pub(crate) fn close(&mut self) {
        self.state = BranchState::Closed;
    }
}

/// What a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Random initialisation.
    Init,
    /// Produced by crossover.
    Birth,
    Mutation(MutationKind),
}

/// One entry of a graph's append-only history.
///
/// History is kept for lineage inspection; it is never replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub kind: RecordKind,
    #[serde(default)]
    pub nodes: Vec<NodeId>,
    #[serde(default)]
    pub branches: Vec<BranchId>,
    pub stage: u32,
}

impl MutationRecord {
    pub fn new(kind: RecordKind, stage: u32) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
            branches: Vec::new(),
            stage,
        }
    }

    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    pub fn with_branches(mut self, branches: impl IntoIterator<Item = BranchId>) -> Self {
        self.branches.extend(branches);
        self
    }
}

/// Read-only provenance: clones of the two parents a graph was bred from.
#[derive(Debug, Clone, PartialEq)]
pub struct Lineage {
    pub(crate) parents: [ArchitectureGraph; 2],
}

impl Lineage {
    /// Stores the parents, dropping their own lineage so provenance stays
    /// one generation deep.
    pub fn new(first: &ArchitectureGraph, second: &ArchitectureGraph) -> Self {
        Self {
            parents: [first.without_lineage(), second.without_lineage()],
        }
    }

    pub fn parents(&self) -> &[ArchitectureGraph; 2] {
        &self.parents
    }
}
