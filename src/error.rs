//! Error taxonomy for architecture graph operations.
//!
//! Every condition here is local and recoverable: an operator that fails
//! leaves its graph untouched and hands the error back to the caller, who
//! decides whether to retry with another mutation or skip the individual.
//! Only [`ArchError::MalformedSnapshot`] and [`ArchError::Json`] come from
//! loading persisted state, and they abort that single load.

use crate::graph::BranchId;
use crate::layer::{LayerType, NodeId};
use crate::mutation::MutationKind;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type ArchResult<T> = Result<T, ArchError>;

/// Errors raised by graph construction, mutation, scheduling and loading.
#[derive(Error, Debug)]
pub enum ArchError {
    /// The branch does not exist or has already been closed.
    #[error("branch {0} does not exist or is closed")]
    InvalidBranch(BranchId),

    /// A merge named a branch id the graph has never issued.
    #[error("unknown branch {0}")]
    UnknownBranch(BranchId),

    /// A merge or split named fewer than two branches.
    #[error("at least two branches are required, got {0}")]
    EmptyBranchSet(usize),

    /// Removal would delete the input/finisher or disconnect the graph.
    #[error("node {node} is protected: {reason}")]
    ProtectedNode {
        node: NodeId,
        reason: &'static str,
    },

    /// An edge would close a cycle.
    #[error("cycle detected through node {0}")]
    CycleDetected(NodeId),

    /// The scheduler cannot make progress.
    #[error("graph cannot be scheduled: {0}")]
    UnschedulableGraph(String),

    /// No node with this id exists in the graph.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// Input and output layers can only be placed by graph creation.
    #[error("layer type {0} is reserved for graph endpoints")]
    ReservedLayerType(LayerType),

    /// A graph endpoint was given a node of the wrong type.
    #[error("expected a {expected} node, found {found}")]
    EndpointType {
        expected: LayerType,
        found: LayerType,
    },

    /// A structural invariant does not hold.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    /// A builder configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A configuration entry does not fit the layer type's schema.
    #[error("invalid config for {layer_type} parameter '{param}': {reason}")]
    InvalidConfig {
        layer_type: LayerType,
        param: String,
        reason: &'static str,
    },

    /// The operator found no eligible node or branch.
    #[error("nothing to mutate for {0}")]
    NothingToMutate(MutationKind),

    /// The execution collaborator refused to construct a node.
    #[error("failed to build node {node}: {reason}")]
    BuildFailed { node: NodeId, reason: String },

    /// Persisted state is structurally invalid.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// Persisted state is not valid JSON for the expected record.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
