//! Build plan types and the execution collaborator contract.

use crate::layer::{LayerNode, NodeId};
use std::fmt;

/// Input binding of one materialised node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding<H> {
    /// The graph input: no upstream handle.
    Source,
    /// Fed by exactly one upstream handle.
    Single(H),
    /// Joins several upstream handles, ordered by ascending predecessor id.
    Join(Vec<H>),
}

impl<H> Binding<H> {
    /// Maps every bound handle through `f`, short-circuiting on error.
    pub fn try_map<U, E>(&self, mut f: impl FnMut(&H) -> Result<U, E>) -> Result<Binding<U>, E> {
        Ok(match self {
            Binding::Source => Binding::Source,
            Binding::Single(h) => Binding::Single(f(h)?),
            Binding::Join(hs) => Binding::Join(hs.iter().map(f).collect::<Result<_, _>>()?),
        })
    }

    /// Bound handles in order; empty for [`Binding::Source`].
    pub fn inputs(&self) -> &[H] {
        match self {
            Binding::Source => &[],
            Binding::Single(h) => std::slice::from_ref(h),
            Binding::Join(hs) => hs,
        }
    }

    pub fn is_join(&self) -> bool {
        matches!(self, Binding::Join(_))
    }
}

/// One materialisation step: a node and the predecessors it binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    pub node: NodeId,
    pub binding: Binding<NodeId>,
}

/// Output of the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub(crate) steps: Vec<PlanStep>,
    pub(crate) pruned: Vec<NodeId>,
    pub(crate) output: NodeId,
}

impl BuildPlan {
    /// Steps in materialisation order.
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Node ids in materialisation order.
    pub fn order(&self) -> Vec<NodeId> {
        self.steps.iter().map(|s| s.node).collect()
    }

    /// Position of `node` in the order, if it was materialised.
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.steps.iter().position(|s| s.node == node)
    }

    /// Nodes dropped because no real input reached them, in pruning order.
    pub fn pruned(&self) -> &[NodeId] {
        &self.pruned
    }

    /// The node whose handle is the network's output (the finisher).
    pub fn output(&self) -> NodeId {
        self.output
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// The graph-execution collaborator.
///
/// Receives nodes in build order together with the handles of their
/// already-built inputs, and returns a handle for the new node. Failure is
/// reported as [`ArchError::BuildFailed`](crate::ArchError::BuildFailed)
/// and leaves the graph untouched.
pub trait Materializer {
    /// Whatever stands for a built node (a tensor, a layer object, an index).
    type Handle: Clone;
    type Error: fmt::Display;

    fn materialize(
        &mut self,
        id: NodeId,
        node: &LayerNode,
        inputs: Binding<Self::Handle>,
    ) -> Result<Self::Handle, Self::Error>;
}

/// Result of running a [`BuildPlan`] through a [`Materializer`].
#[derive(Debug, Clone)]
pub struct BuiltModel<H> {
    /// Handle of the graph input.
    pub input: H,
    /// Handle of the finisher.
    pub output: H,
    /// Every handle, in materialisation order.
    pub handles: Vec<(NodeId, H)>,
}
