//! JSON persistence for architecture graphs.
//!
//! A graph is written as a flat [`GraphSnapshot`]. Loading goes back
//! through schema checks on every node and a full [`validate`] pass, so a
//! hand-edited or truncated file cannot produce a graph that breaks the
//! structural invariants.
//!
//! [`validate`]: ArchitectureGraph::validate

use super::structure::ArchitectureGraph;
use super::types::{Branch, BranchId, BranchState, Lineage, MutationRecord};
use crate::error::{ArchError, ArchResult};
use crate::layer::{LayerConfig, LayerNode, LayerType, NodeId};
use serde::{Deserialize, Serialize};

/// One persisted node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub layer_type: LayerType,
    #[serde(default)]
    pub config: LayerConfig,
    pub rank: Option<u8>,
}

/// One persisted branch. `end` is `None` for closed branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRecord {
    pub id: BranchId,
    pub members: Vec<NodeId>,
    pub end: Option<NodeId>,
}

/// Flat, serializable form of an [`ArchitectureGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub input: NodeId,
    pub finisher: NodeId,
    pub next_id: usize,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub branches: Vec<BranchRecord>,
    #[serde(default)]
    pub history: Vec<MutationRecord>,
    /// The two parents, when the graph was bred by crossover.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<GraphSnapshot>>,
}

impl GraphSnapshot {
    /// Captures the full state of `graph`, lineage included.
    pub fn capture(graph: &ArchitectureGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|(id, node)| NodeRecord {
                id,
                layer_type: node.layer_type(),
                config: node.config().clone(),
                rank: node.rank(),
            })
            .collect();
        let branches = graph
            .branches()
            .map(|(id, branch)| BranchRecord {
                id,
                members: branch.members().to_vec(),
                end: branch.end(),
            })
            .collect();
        let parents = graph
            .lineage()
            .map(|lineage| lineage.parents().iter().map(Self::capture).collect());

        Self {
            input: graph.input(),
            finisher: graph.finisher(),
            next_id: graph.next_id().0,
            nodes,
            edges: graph.edges().collect(),
            branches,
            history: graph.history().to_vec(),
            parents,
        }
    }

    /// Rebuilds and validates the graph.
    ///
    /// # Errors
    /// [`ArchError::MalformedSnapshot`] describing the first problem found.
    pub fn restore(self) -> ArchResult<ArchitectureGraph> {
        self.restore_inner().map_err(|err| match err {
            malformed @ ArchError::MalformedSnapshot(_) => malformed,
            other => ArchError::MalformedSnapshot(other.to_string()),
        })
    }

    fn restore_inner(self) -> ArchResult<ArchitectureGraph> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for record in self.nodes {
            let node = LayerNode::from_parts(record.layer_type, record.config, record.rank)?;
            nodes.push((record.id, node));
        }

        let mut branches = Vec::with_capacity(self.branches.len());
        for (index, record) in self.branches.into_iter().enumerate() {
            if record.id != BranchId(index) {
                return Err(ArchError::MalformedSnapshot(format!(
                    "branch {} listed at position {index}",
                    record.id
                )));
            }
            let state = match record.end {
                Some(end) => BranchState::Open { end },
                None => BranchState::Closed,
            };
            branches.push(Branch {
                members: record.members,
                state,
            });
        }

        let mut graph = ArchitectureGraph::from_snapshot_parts(
            nodes,
            &self.edges,
            branches,
            self.input,
            self.finisher,
            self.next_id,
            self.history,
        )?;

        if let Some(parents) = self.parents {
            let [first, second]: [GraphSnapshot; 2] = parents.try_into().map_err(|p: Vec<_>| {
                ArchError::MalformedSnapshot(format!("expected 2 parents, found {}", p.len()))
            })?;
            let first = first.restore_inner()?;
            let second = second.restore_inner()?;
            graph.set_lineage(Lineage::new(&first, &second));
        }
        Ok(graph)
    }
}

impl ArchitectureGraph {
    /// Serializes the graph, lineage included, as pretty-printed JSON.
    pub fn to_json(&self) -> ArchResult<String> {
        Ok(serde_json::to_string_pretty(&GraphSnapshot::capture(self))?)
    }

    /// Loads a graph written by [`to_json`](Self::to_json).
    ///
    /// # Errors
    /// [`ArchError::Json`] for unparseable input,
    /// [`ArchError::MalformedSnapshot`] for a record that parses but does
    /// not describe a valid graph.
    pub fn from_json(json: &str) -> ArchResult<Self> {
        let snapshot: GraphSnapshot = serde_json::from_str(json)?;
        snapshot.restore()
    }
}
