//! The architecture graph.
//!
//! Nodes live in an id-keyed arena; adjacency is kept as successor and
//! predecessor sets keyed by [`NodeId`]. Every open branch end feeds the
//! finisher, so an unmerged fork shows up as a multi-input finisher.
//!
//! Structural calls (`add_layer`, `merge_branches`, `split_branch`,
//! `remove_layer`) validate their arguments first, then run against a
//! scratch copy that is committed only after an acyclicity check. A failed
//! call leaves the graph exactly as it was.

use super::types::{Branch, BranchId, BranchState, Lineage, MutationRecord};
use crate::error::{ArchError, ArchResult};
use crate::layer::{LayerNode, LayerType, NodeId};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use tracing::debug;

/// A candidate network: layer nodes, edges between them and branch state.
///
/// # Invariants
///
/// - exactly one node has no incoming edge, and it is the `Input` node;
/// - exactly one node has no outgoing edge, and it is the `Output` finisher;
/// - the edge relation is acyclic;
/// - node ids are never reused after removal.
///
/// # Examples
///
/// ```
/// use u_neuroarch::graph::{ArchitectureGraph, BranchId};
/// use u_neuroarch::layer::{LayerNode, LayerType};
///
/// let mut graph = ArchitectureGraph::create(
///     LayerNode::bare(LayerType::Input),
///     LayerNode::bare(LayerType::Output),
/// )
/// .unwrap();
/// let dense = graph
///     .add_layer(LayerNode::bare(LayerType::Dense), BranchId(0), None)
///     .unwrap();
/// assert!(graph.has_edge(graph.input(), dense));
/// assert!(graph.has_edge(dense, graph.finisher()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ArchitectureGraph {
    nodes: BTreeMap<NodeId, LayerNode>,
    successors: BTreeMap<NodeId, BTreeSet<NodeId>>,
    predecessors: BTreeMap<NodeId, BTreeSet<NodeId>>,
    branches: Vec<Branch>,
    input: NodeId,
    finisher: NodeId,
    next_id: usize,
    history: Vec<MutationRecord>,
    lineage: Option<Box<Lineage>>,
}

impl ArchitectureGraph {
    /// Builds the minimal graph `input -> finisher` with one open branch.
    ///
    /// # Errors
    /// [`ArchError::EndpointType`] if `input` is not an `Input` layer or
    /// `finisher` is not an `Output` layer.
    pub fn create(input: LayerNode, finisher: LayerNode) -> ArchResult<Self> {
        expect_type(&input, LayerType::Input)?;
        expect_type(&finisher, LayerType::Output)?;

        let mut graph = Self::empty();
        let input_id = graph.insert_node(input);
        let finisher_id = graph.insert_node(finisher);
        graph.input = input_id;
        graph.finisher = finisher_id;
        graph.connect(input_id, finisher_id);
        graph.branches.push(Branch::open(vec![input_id], input_id));
        Ok(graph)
    }

    fn empty() -> Self {
        Self {
            nodes: BTreeMap::new(),
            successors: BTreeMap::new(),
            predecessors: BTreeMap::new(),
            branches: Vec::new(),
            input: NodeId(0),
            finisher: NodeId(0),
            next_id: 0,
            history: Vec::new(),
            lineage: None,
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn input(&self) -> NodeId {
        self.input
    }

    pub fn finisher(&self) -> NodeId {
        self.finisher
    }

    pub fn node(&self, id: NodeId) -> Option<&LayerNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &LayerNode)> + '_ {
        self.nodes.iter().map(|(&id, node)| (id, node))
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes other than the input and the finisher, ascending.
    pub fn interior_nodes(&self) -> Vec<NodeId> {
        self.node_ids()
            .filter(|&id| id != self.input && id != self.finisher)
            .collect()
    }

    /// Edges `(from, to)` in ascending order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.successors
            .iter()
            .flat_map(|(&from, tos)| tos.iter().map(move |&to| (from, to)))
    }

    pub fn edge_count(&self) -> usize {
        self.successors.values().map(BTreeSet::len).sum()
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.successors
            .get(&from)
            .is_some_and(|tos| tos.contains(&to))
    }

    /// Nodes feeding `id`, ascending.
    pub fn predecessors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.predecessors.get(&id).into_iter().flatten().copied()
    }

    /// Nodes fed by `id`, ascending.
    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.successors.get(&id).into_iter().flatten().copied()
    }

    pub fn in_degree(&self, id: NodeId) -> usize {
        self.predecessors.get(&id).map_or(0, BTreeSet::len)
    }

    pub fn out_degree(&self, id: NodeId) -> usize {
        self.successors.get(&id).map_or(0, BTreeSet::len)
    }

    pub fn branch(&self, id: BranchId) -> Option<&Branch> {
        self.branches.get(id.0)
    }

    /// Every branch ever issued, open or closed.
    pub fn branches(&self) -> impl Iterator<Item = (BranchId, &Branch)> + '_ {
        self.branches
            .iter()
            .enumerate()
            .map(|(i, branch)| (BranchId(i), branch))
    }

    /// Number of branches ever issued.
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Ids of open branches, ascending.
    pub fn open_branches(&self) -> Vec<BranchId> {
        self.branches()
            .filter(|(_, branch)| branch.is_open())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn open_branch_count(&self) -> usize {
        self.branches.iter().filter(|b| b.is_open()).count()
    }

    /// The id the next inserted node will receive.
    pub fn next_id(&self) -> NodeId {
        NodeId(self.next_id)
    }

    pub fn history(&self) -> &[MutationRecord] {
        &self.history
    }

    pub fn lineage(&self) -> Option<&Lineage> {
        self.lineage.as_deref()
    }

    // ------------------------------------------------------------------
    // Structural operations
    // ------------------------------------------------------------------

    /// Inserts `layer` at the open end of `branch`.
    ///
    /// The end's edge into the finisher is rerouted through the new node.
    /// With `split_into = Some(n)` the branch is then closed and `n` new
    /// branches open, all starting at the new node.
    ///
    /// # Errors
    /// - [`ArchError::ReservedLayerType`] for `Input`/`Output` layers
    /// - [`ArchError::EmptyBranchSet`] for `split_into` below two
    /// - [`ArchError::InvalidBranch`] if `branch` is unknown or closed
    pub fn add_layer(
        &mut self,
        layer: LayerNode,
        branch: BranchId,
        split_into: Option<usize>,
    ) -> ArchResult<NodeId> {
        reject_reserved(&layer)?;
        if let Some(n) = split_into {
            if n < 2 {
                return Err(ArchError::EmptyBranchSet(n));
            }
        }
        let end = self.open_end(branch)?;

        let id = self.transact(|g| {
            let id = g.insert_node(layer);
            g.release_end(end, &[branch]);
            g.connect(end, id);
            g.connect(id, g.finisher);

            let owner = &mut g.branches[branch.0];
            owner.members.push(id);
            owner.state = BranchState::Open { end: id };
            if let Some(n) = split_into {
                owner.close();
                for _ in 0..n {
                    g.branches.push(Branch::open(Vec::new(), id));
                }
            }
            Ok(id)
        })?;

        debug!(node = %id, branch = %branch, ?split_into, "layer added");
        Ok(id)
    }

    /// Joins the open ends of `branches` (all open branches when `None`)
    /// into a new node, closes them and opens one branch rooted at it.
    ///
    /// # Errors
    /// - [`ArchError::ReservedLayerType`] for `Input`/`Output` layers
    /// - [`ArchError::EmptyBranchSet`] if fewer than two distinct branches
    ///   are named
    /// - [`ArchError::UnknownBranch`] for an id never issued
    /// - [`ArchError::InvalidBranch`] for a closed branch
    pub fn merge_branches(
        &mut self,
        layer: LayerNode,
        branches: Option<&[BranchId]>,
    ) -> ArchResult<NodeId> {
        reject_reserved(&layer)?;
        let mut selected = match branches {
            Some(ids) => ids.to_vec(),
            None => self.open_branches(),
        };
        selected.sort_unstable();
        selected.dedup();
        if selected.len() < 2 {
            return Err(ArchError::EmptyBranchSet(selected.len()));
        }

        let mut ends = Vec::with_capacity(selected.len());
        for &b in &selected {
            let branch = self.branch(b).ok_or(ArchError::UnknownBranch(b))?;
            ends.push(branch.end().ok_or(ArchError::InvalidBranch(b))?);
        }

        let id = self.transact(|g| {
            let id = g.insert_node(layer);
            for (&b, &end) in selected.iter().zip(&ends) {
                g.release_end(end, &selected);
                g.connect(end, id);
                g.branches[b.0].close();
            }
            g.connect(id, g.finisher);
            g.branches.push(Branch::open(vec![id], id));
            Ok(id)
        })?;

        debug!(node = %id, merged = ?selected, "branches merged");
        Ok(id)
    }

    /// Closes `branch` and opens one new branch per entry of `layers`, each
    /// seeded with that layer as its only member.
    ///
    /// Returns the ids of the new branches, in the order of `layers`.
    ///
    /// # Errors
    /// - [`ArchError::EmptyBranchSet`] for fewer than two layers
    /// - [`ArchError::ReservedLayerType`] for `Input`/`Output` layers
    /// - [`ArchError::InvalidBranch`] if `branch` is unknown or closed
    pub fn split_branch(
        &mut self,
        layers: Vec<LayerNode>,
        branch: BranchId,
    ) -> ArchResult<Vec<BranchId>> {
        if layers.len() < 2 {
            return Err(ArchError::EmptyBranchSet(layers.len()));
        }
        for layer in &layers {
            reject_reserved(layer)?;
        }
        let end = self.open_end(branch)?;

        let opened = self.transact(|g| {
            g.release_end(end, &[branch]);
            g.branches[branch.0].close();

            let mut opened = Vec::with_capacity(layers.len());
            for layer in layers {
                let id = g.insert_node(layer);
                g.connect(end, id);
                g.connect(id, g.finisher);
                opened.push(BranchId(g.branches.len()));
                g.branches.push(Branch::open(vec![id], id));
            }
            Ok(opened)
        })?;

        debug!(branch = %branch, opened = ?opened, "branch split");
        Ok(opened)
    }

    /// Removes an interior node, bridging its predecessor to its successor.
    ///
    /// Returns the removed node. Branches that ended at it now end at its
    /// predecessor.
    ///
    /// # Errors
    /// [`ArchError::UnknownNode`] or [`ArchError::ProtectedNode`]; see
    /// [`check_removable`](Self::check_removable).
    pub fn remove_layer(&mut self, id: NodeId) -> ArchResult<LayerNode> {
        let (pred, succ) = self.check_removable(id)?;

        let removed = self.transact(|g| {
            g.disconnect(pred, id);
            g.disconnect(id, succ);
            g.connect(pred, succ);
            g.successors.remove(&id);
            g.predecessors.remove(&id);
            let node = g.nodes.remove(&id).ok_or(ArchError::UnknownNode(id))?;

            for branch in &mut g.branches {
                branch.members.retain(|&m| m != id);
                if branch.end() == Some(id) {
                    branch.state = BranchState::Open { end: pred };
                }
            }
            Ok(node)
        })?;

        debug!(node = %id, bridge_from = %pred, bridge_to = %succ, "layer removed");
        Ok(removed)
    }

    /// Checks whether `id` may be removed and returns its single
    /// predecessor and successor.
    ///
    /// A node is protected when it is the input or the finisher, when it
    /// joins or forks paths, when its neighbours are already directly
    /// connected, or when it is the only member of its branch (removing it
    /// would leave one side of a split without a layer).
    pub fn check_removable(&self, id: NodeId) -> ArchResult<(NodeId, NodeId)> {
        if !self.contains(id) {
            return Err(ArchError::UnknownNode(id));
        }
        let protect = |reason| Err(ArchError::ProtectedNode { node: id, reason });
        if id == self.input {
            return protect("graph input");
        }
        if id == self.finisher {
            return protect("graph finisher");
        }
        if self.in_degree(id) != 1 {
            return protect("joins several inputs");
        }
        if self.out_degree(id) != 1 {
            return protect("forks into several outputs");
        }
        let (Some(pred), Some(succ)) = (self.predecessors(id).next(), self.successors(id).next())
        else {
            return protect("disconnected");
        };
        if self.has_edge(pred, succ) {
            return protect("a parallel path would collapse");
        }
        let sole_member = self
            .branches
            .iter()
            .any(|b| b.members.len() == 1 && b.members[0] == id);
        if sole_member {
            return protect("only member of its branch");
        }
        Ok((pred, succ))
    }

    /// Whether [`remove_layer`](Self::remove_layer) would succeed.
    pub fn can_remove(&self, id: NodeId) -> bool {
        self.check_removable(id).is_ok()
    }

    /// Swaps the descriptor of an existing node, keeping id and edges.
    ///
    /// Returns the previous descriptor. The input and finisher only accept
    /// layers of their own type.
    pub fn replace_layer(&mut self, id: NodeId, layer: LayerNode) -> ArchResult<LayerNode> {
        if !self.contains(id) {
            return Err(ArchError::UnknownNode(id));
        }
        if id == self.input {
            expect_type(&layer, LayerType::Input)?;
        } else if id == self.finisher {
            expect_type(&layer, LayerType::Output)?;
        } else {
            reject_reserved(&layer)?;
        }
        let slot = self.nodes.get_mut(&id).ok_or(ArchError::UnknownNode(id))?;
        Ok(std::mem::replace(slot, layer))
    }

    /// Appends an entry to the history. Topology is not touched.
    pub fn record_mutation(&mut self, entry: MutationRecord) {
        self.history.push(entry);
    }

    // ------------------------------------------------------------------
    // Ordering and validation
    // ------------------------------------------------------------------

    /// Kahn topological order, ties broken by ascending id.
    ///
    /// # Errors
    /// [`ArchError::CycleDetected`] naming a node left on a cycle.
    pub fn topological_order(&self) -> ArchResult<Vec<NodeId>> {
        let mut indegree: BTreeMap<NodeId, usize> = self
            .nodes
            .keys()
            .map(|&id| (id, self.in_degree(id)))
            .collect();
        let mut ready: BinaryHeap<Reverse<NodeId>> = indegree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&id, _)| Reverse(id))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            for succ in self.successors(id) {
                if let Some(d) = indegree.get_mut(&succ) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push(Reverse(succ));
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            let stuck = indegree
                .iter()
                .find(|&(_, &d)| d > 0)
                .map_or(self.input, |(&id, _)| id);
            return Err(ArchError::CycleDetected(stuck));
        }
        Ok(order)
    }

    /// Checks every structural invariant, including branch bookkeeping.
    pub fn validate(&self) -> ArchResult<()> {
        self.validate_topology()?;

        for (id, branch) in self.branches() {
            if let Some(&missing) = branch.members.iter().find(|m| !self.contains(**m)) {
                return Err(ArchError::InvariantViolated(format!(
                    "branch {id} lists unknown node {missing}"
                )));
            }
            if let Some(end) = branch.end() {
                if !self.contains(end) || end == self.finisher {
                    return Err(ArchError::InvariantViolated(format!(
                        "branch {id} has invalid open end {end}"
                    )));
                }
                if !self.has_edge(end, self.finisher) {
                    return Err(ArchError::InvariantViolated(format!(
                        "open end {end} of branch {id} does not feed the finisher"
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_topology(&self) -> ArchResult<()> {
        let input = self
            .nodes
            .get(&self.input)
            .ok_or(ArchError::UnknownNode(self.input))?;
        expect_type(input, LayerType::Input)?;
        let finisher = self
            .nodes
            .get(&self.finisher)
            .ok_or(ArchError::UnknownNode(self.finisher))?;
        expect_type(finisher, LayerType::Output)?;

        for (from, to) in self.edges() {
            if !self.contains(from) || !self.contains(to) {
                return Err(ArchError::InvariantViolated(format!(
                    "edge {from}->{to} references a missing node"
                )));
            }
            if !self.predecessors(to).any(|p| p == from) {
                return Err(ArchError::InvariantViolated(format!(
                    "edge {from}->{to} missing from predecessor index"
                )));
            }
        }
        let reverse_count: usize = self.predecessors.values().map(BTreeSet::len).sum();
        if reverse_count != self.edge_count() {
            return Err(ArchError::InvariantViolated(
                "predecessor index out of sync with edges".into(),
            ));
        }

        for id in self.node_ids() {
            if id != self.input && self.in_degree(id) == 0 {
                return Err(ArchError::InvariantViolated(format!(
                    "node {id} has no incoming edge"
                )));
            }
            if id != self.finisher && self.out_degree(id) == 0 {
                return Err(ArchError::InvariantViolated(format!(
                    "node {id} has no outgoing edge"
                )));
            }
        }
        if self.in_degree(self.input) != 0 {
            return Err(ArchError::InvariantViolated("input has incoming edges".into()));
        }
        if self.out_degree(self.finisher) != 0 {
            return Err(ArchError::InvariantViolated(
                "finisher has outgoing edges".into(),
            ));
        }

        self.topological_order().map(|_| ())
    }

    // ------------------------------------------------------------------
    // Construction from parts (crossover, persistence)
    // ------------------------------------------------------------------

    /// Builds a graph from explicit nodes and edges, deriving the branch
    /// table from the topology.
    ///
    /// A branch starts at the input, at every child of a fork and at every
    /// join; it is open when its last member feeds the finisher.
    pub(crate) fn from_parts(
        nodes: Vec<(NodeId, LayerNode)>,
        edges: &[(NodeId, NodeId)],
        input: NodeId,
        finisher: NodeId,
    ) -> ArchResult<Self> {
        let mut graph = Self::with_nodes(nodes, input, finisher)?;
        graph.connect_all(edges)?;
        graph.validate_topology()?;
        graph.branches = graph.derive_branches()?;
        Ok(graph)
    }

    /// Builds a graph from persisted parts with an explicit branch table.
    pub(crate) fn from_snapshot_parts(
        nodes: Vec<(NodeId, LayerNode)>,
        edges: &[(NodeId, NodeId)],
        branches: Vec<Branch>,
        input: NodeId,
        finisher: NodeId,
        next_id: usize,
        history: Vec<MutationRecord>,
    ) -> ArchResult<Self> {
        let mut graph = Self::with_nodes(nodes, input, finisher)?;
        if next_id < graph.next_id {
            return Err(ArchError::InvariantViolated(format!(
                "next id {next_id} would reuse an existing node id"
            )));
        }
        graph.next_id = next_id;
        graph.connect_all(edges)?;
        graph.branches = branches;
        graph.history = history;
        graph.validate()?;
        Ok(graph)
    }

    fn with_nodes(
        nodes: Vec<(NodeId, LayerNode)>,
        input: NodeId,
        finisher: NodeId,
    ) -> ArchResult<Self> {
        let mut graph = Self::empty();
        for (id, node) in nodes {
            if graph.contains(id) {
                return Err(ArchError::InvariantViolated(format!(
                    "duplicate node id {id}"
                )));
            }
            graph.attach(id, node);
        }
        graph.next_id = graph.nodes.keys().next_back().map_or(0, |id| id.0 + 1);
        graph.input = input;
        graph.finisher = finisher;
        Ok(graph)
    }

    fn connect_all(&mut self, edges: &[(NodeId, NodeId)]) -> ArchResult<()> {
        for &(from, to) in edges {
            for id in [from, to] {
                if !self.contains(id) {
                    return Err(ArchError::UnknownNode(id));
                }
            }
            self.connect(from, to);
        }
        Ok(())
    }

    fn derive_branches(&self) -> ArchResult<Vec<Branch>> {
        let mut branches: Vec<Branch> = Vec::new();
        let mut owner: BTreeMap<NodeId, usize> = BTreeMap::new();

        for id in self.topological_order()? {
            if id == self.finisher {
                continue;
            }
            let continued = if id == self.input || self.in_degree(id) != 1 {
                None
            } else {
                self.predecessors(id)
                    .next()
                    .filter(|&pred| self.out_degree(pred) == 1)
                    .and_then(|pred| owner.get(&pred).copied())
            };
            let slot = match continued {
                Some(b) => {
                    branches[b].members.push(id);
                    b
                }
                None => {
                    branches.push(Branch {
                        members: vec![id],
                        state: BranchState::Closed,
                    });
                    branches.len() - 1
                }
            };
            owner.insert(id, slot);
        }

        for branch in &mut branches {
            if let Some(&last) = branch.members.last() {
                if self.has_edge(last, self.finisher) {
                    branch.state = BranchState::Open { end: last };
                }
            }
        }
        Ok(branches)
    }

    // ------------------------------------------------------------------
    // Lineage
    // ------------------------------------------------------------------

    pub(crate) fn set_lineage(&mut self, lineage: Lineage) {
        self.lineage = Some(Box::new(lineage));
    }

    /// A copy of this graph with no lineage attached.
    pub fn without_lineage(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            successors: self.successors.clone(),
            predecessors: self.predecessors.clone(),
            branches: self.branches.clone(),
            input: self.input,
            finisher: self.finisher,
            next_id: self.next_id,
            history: self.history.clone(),
            lineage: None,
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Runs `op` on a scratch copy and commits it if the result is acyclic.
    fn transact<T>(&mut self, op: impl FnOnce(&mut Self) -> ArchResult<T>) -> ArchResult<T> {
        let mut scratch = self.without_lineage();
        let value = op(&mut scratch)?;
        scratch.topological_order()?;
        scratch.lineage = self.lineage.take();
        *self = scratch;
        Ok(value)
    }

    fn open_end(&self, branch: BranchId) -> ArchResult<NodeId> {
        self.branch(branch)
            .and_then(Branch::end)
            .ok_or(ArchError::InvalidBranch(branch))
    }

    /// Drops `end -> finisher` unless an open branch outside `leaving`
    /// still ends at `end`.
    fn release_end(&mut self, end: NodeId, leaving: &[BranchId]) {
        let shared = self
            .branches()
            .any(|(id, b)| b.end() == Some(end) && !leaving.contains(&id));
        if !shared {
            let finisher = self.finisher;
            self.disconnect(end, finisher);
        }
    }

    fn insert_node(&mut self, node: LayerNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.attach(id, node);
        id
    }

    fn attach(&mut self, id: NodeId, node: LayerNode) {
        self.nodes.insert(id, node);
        self.successors.entry(id).or_default();
        self.predecessors.entry(id).or_default();
    }

    fn connect(&mut self, from: NodeId, to: NodeId) {
        self.successors.entry(from).or_default().insert(to);
        self.predecessors.entry(to).or_default().insert(from);
    }

    fn disconnect(&mut self, from: NodeId, to: NodeId) {
        if let Some(tos) = self.successors.get_mut(&from) {
            tos.remove(&to);
        }
        if let Some(froms) = self.predecessors.get_mut(&to) {
            froms.remove(&from);
        }
    }
}

fn expect_type(node: &LayerNode, expected: LayerType) -> ArchResult<()> {
    if node.layer_type() == expected {
        Ok(())
    } else {
        Err(ArchError::EndpointType {
            expected,
            found: node.layer_type(),
        })
    }
}

fn reject_reserved(node: &LayerNode) -> ArchResult<()> {
    if node.layer_type().is_reserved() {
        Err(ArchError::ReservedLayerType(node.layer_type()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RecordKind;
    use crate::mutation::MutationKind;

    fn minimal() -> ArchitectureGraph {
        ArchitectureGraph::create(
            LayerNode::bare(LayerType::Input),
            LayerNode::bare(LayerType::Output),
        )
        .unwrap()
    }

    fn layer(t: LayerType) -> LayerNode {
        LayerNode::bare(t)
    }

    /// input -> A -> finisher, then split A's branch into B and C.
    fn split_graph() -> (ArchitectureGraph, NodeId, Vec<BranchId>) {
        let mut g = minimal();
        let a = g.add_layer(layer(LayerType::Dense), BranchId(0), None).unwrap();
        let opened = g
            .split_branch(
                vec![layer(LayerType::Conv1d), layer(LayerType::Lstm)],
                BranchId(0),
            )
            .unwrap();
        (g, a, opened)
    }

    #[test]
    fn test_create_minimal() {
        let g = minimal();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.has_edge(g.input(), g.finisher()));
        assert_eq!(g.open_branches(), vec![BranchId(0)]);
        assert_eq!(g.branch(BranchId(0)).unwrap().members(), &[g.input()]);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_create_rejects_wrong_endpoints() {
        let err = ArchitectureGraph::create(layer(LayerType::Dense), layer(LayerType::Output))
            .unwrap_err();
        assert!(matches!(
            err,
            ArchError::EndpointType {
                expected: LayerType::Input,
                found: LayerType::Dense
            }
        ));
        let err = ArchitectureGraph::create(layer(LayerType::Input), layer(LayerType::Dense))
            .unwrap_err();
        assert!(matches!(err, ArchError::EndpointType { .. }));
    }

    #[test]
    fn test_add_layer_reroutes_through_new_node() {
        let mut g = minimal();
        let a = g.add_layer(layer(LayerType::Dense), BranchId(0), None).unwrap();
        let b = g.add_layer(layer(LayerType::Dropout), BranchId(0), None).unwrap();

        assert!(g.has_edge(g.input(), a));
        assert!(g.has_edge(a, b));
        assert!(g.has_edge(b, g.finisher()));
        assert!(!g.has_edge(g.input(), g.finisher()));
        assert!(!g.has_edge(a, g.finisher()));
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.branch(BranchId(0)).unwrap().end(), Some(b));
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_add_layer_invalid_branch() {
        let mut g = minimal();
        let before = g.clone();
        let err = g
            .add_layer(layer(LayerType::Dense), BranchId(5), None)
            .unwrap_err();
        assert!(matches!(err, ArchError::InvalidBranch(BranchId(5))));
        assert_eq!(g, before);
    }

    #[test]
    fn test_add_layer_closed_branch() {
        let (mut g, _, _) = split_graph();
        let before = g.clone();
        let err = g
            .add_layer(layer(LayerType::Dense), BranchId(0), None)
            .unwrap_err();
        assert!(matches!(err, ArchError::InvalidBranch(BranchId(0))));
        assert_eq!(g, before);
    }

    #[test]
    fn test_add_layer_rejects_reserved_types() {
        let mut g = minimal();
        for t in [LayerType::Input, LayerType::Output] {
            let err = g.add_layer(layer(t), BranchId(0), None).unwrap_err();
            assert!(matches!(err, ArchError::ReservedLayerType(_)));
        }
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn test_add_layer_with_split() {
        let mut g = minimal();
        let fork = g
            .add_layer(layer(LayerType::Dense), BranchId(0), Some(2))
            .unwrap();
        assert!(!g.branch(BranchId(0)).unwrap().is_open());
        assert_eq!(g.open_branches(), vec![BranchId(1), BranchId(2)]);
        for b in [BranchId(1), BranchId(2)] {
            assert_eq!(g.branch(b).unwrap().end(), Some(fork));
            assert!(g.branch(b).unwrap().members().is_empty());
        }

        // Growing one side keeps the fork feeding the finisher for the other.
        let left = g.add_layer(layer(LayerType::Lstm), BranchId(1), None).unwrap();
        assert!(g.has_edge(fork, left));
        assert!(g.has_edge(fork, g.finisher()));
        assert!(g.validate().is_ok());

        let right = g.add_layer(layer(LayerType::Conv1d), BranchId(2), None).unwrap();
        assert!(!g.has_edge(fork, g.finisher()));
        assert!(g.has_edge(right, g.finisher()));
        assert_eq!(g.in_degree(g.finisher()), 2);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_add_layer_split_below_two() {
        let mut g = minimal();
        let err = g
            .add_layer(layer(LayerType::Dense), BranchId(0), Some(1))
            .unwrap_err();
        assert!(matches!(err, ArchError::EmptyBranchSet(1)));
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn test_split_then_merge_scenario() {
        let (mut g, a, opened) = split_graph();
        assert_eq!(opened, vec![BranchId(1), BranchId(2)]);
        let b = g.branch(opened[0]).unwrap().members()[0];
        let c = g.branch(opened[1]).unwrap().members()[0];
        assert!(g.has_edge(a, b));
        assert!(g.has_edge(a, c));
        assert!(!g.has_edge(a, g.finisher()));
        assert_eq!(g.in_degree(g.finisher()), 2);

        let d = g
            .merge_branches(layer(LayerType::Dense), Some(&opened))
            .unwrap();
        assert_eq!(g.node_count(), 6);
        assert!(g.has_edge(b, d));
        assert!(g.has_edge(c, d));
        assert!(g.has_edge(d, g.finisher()));
        assert_eq!(g.in_degree(g.finisher()), 1);
        assert_eq!(g.open_branches(), vec![BranchId(3)]);
        assert_eq!(g.branch(BranchId(3)).unwrap().members(), &[d]);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_merge_defaults_to_all_open_branches() {
        let (mut g, _, _) = split_graph();
        let d = g.merge_branches(layer(LayerType::Dense), None).unwrap();
        assert_eq!(g.in_degree(d), 2);
        assert_eq!(g.open_branch_count(), 1);
    }

    #[test]
    fn test_merge_needs_two_branches() {
        let (mut g, _, opened) = split_graph();
        let before = g.clone();

        let err = g
            .merge_branches(layer(LayerType::Dense), Some(&opened[..1]))
            .unwrap_err();
        assert!(matches!(err, ArchError::EmptyBranchSet(1)));
        assert_eq!(g, before);

        // Duplicates collapse before the count is checked.
        let err = g
            .merge_branches(layer(LayerType::Dense), Some(&[opened[0], opened[0]]))
            .unwrap_err();
        assert!(matches!(err, ArchError::EmptyBranchSet(1)));
        assert_eq!(g, before);

        let mut single = minimal();
        let err = single
            .merge_branches(layer(LayerType::Dense), None)
            .unwrap_err();
        assert!(matches!(err, ArchError::EmptyBranchSet(1)));
    }

    #[test]
    fn test_merge_unknown_and_closed_branches() {
        let (mut g, _, opened) = split_graph();
        let before = g.clone();

        let err = g
            .merge_branches(layer(LayerType::Dense), Some(&[opened[0], BranchId(42)]))
            .unwrap_err();
        assert!(matches!(err, ArchError::UnknownBranch(BranchId(42))));

        let err = g
            .merge_branches(layer(LayerType::Dense), Some(&[BranchId(0), opened[0]]))
            .unwrap_err();
        assert!(matches!(err, ArchError::InvalidBranch(BranchId(0))));
        assert_eq!(g, before);
    }

    #[test]
    fn test_split_needs_two_layers() {
        let mut g = minimal();
        let err = g
            .split_branch(vec![layer(LayerType::Dense)], BranchId(0))
            .unwrap_err();
        assert!(matches!(err, ArchError::EmptyBranchSet(1)));
        assert!(g.branch(BranchId(0)).unwrap().is_open());
    }

    #[test]
    fn test_remove_interior_node() {
        let mut g = minimal();
        let a = g.add_layer(layer(LayerType::Dense), BranchId(0), None).unwrap();
        let b = g.add_layer(layer(LayerType::Dropout), BranchId(0), None).unwrap();
        let nodes_before = g.node_count();
        let edges_before = g.edge_count();

        let removed = g.remove_layer(a).unwrap();
        assert_eq!(removed.layer_type(), LayerType::Dense);
        assert_eq!(g.node_count(), nodes_before - 1);
        assert_eq!(g.edge_count(), edges_before - 1);
        assert!(g.has_edge(g.input(), b));
        assert!(!g.contains(a));
        assert!(g.validate().is_ok());

        // Ids are not reused.
        let c = g.add_layer(layer(LayerType::Dense), BranchId(0), None).unwrap();
        assert!(c > b);
    }

    #[test]
    fn test_remove_open_end_moves_end_back() {
        let mut g = minimal();
        let a = g.add_layer(layer(LayerType::Dense), BranchId(0), None).unwrap();
        let b = g.add_layer(layer(LayerType::Dropout), BranchId(0), None).unwrap();
        g.remove_layer(b).unwrap();
        assert_eq!(g.branch(BranchId(0)).unwrap().end(), Some(a));
        assert!(g.has_edge(a, g.finisher()));
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_remove_protected_nodes() {
        let (mut g, a, opened) = split_graph();
        let before = g.clone();

        for (id, reason) in [
            (g.finisher(), "graph finisher"),
            (g.input(), "graph input"),
            (a, "forks into several outputs"),
        ] {
            match g.remove_layer(id) {
                Err(ArchError::ProtectedNode { node, reason: r }) => {
                    assert_eq!(node, id);
                    assert_eq!(r, reason);
                }
                other => panic!("expected ProtectedNode, got {other:?}"),
            }
        }

        // One side of an unmerged split.
        let b = g.branch(opened[0]).unwrap().members()[0];
        assert!(matches!(
            g.remove_layer(b),
            Err(ArchError::ProtectedNode { .. })
        ));
        assert_eq!(g, before);

        // Join nodes.
        let d = g.merge_branches(layer(LayerType::Dense), None).unwrap();
        assert!(matches!(
            g.remove_layer(d),
            Err(ArchError::ProtectedNode { .. })
        ));
    }

    #[test]
    fn test_remove_unknown_node() {
        let mut g = minimal();
        assert!(matches!(
            g.remove_layer(NodeId(99)),
            Err(ArchError::UnknownNode(NodeId(99)))
        ));
    }

    #[test]
    fn test_replace_layer_keeps_edges() {
        let mut g = minimal();
        let a = g.add_layer(layer(LayerType::Dense), BranchId(0), None).unwrap();
        let edges: Vec<_> = g.edges().collect();
        let old = g.replace_layer(a, layer(LayerType::Lstm)).unwrap();
        assert_eq!(old.layer_type(), LayerType::Dense);
        assert_eq!(g.node(a).unwrap().layer_type(), LayerType::Lstm);
        assert_eq!(g.edges().collect::<Vec<_>>(), edges);

        assert!(matches!(
            g.replace_layer(g.finisher(), layer(LayerType::Dense)),
            Err(ArchError::EndpointType { .. })
        ));
        assert!(matches!(
            g.replace_layer(a, layer(LayerType::Output)),
            Err(ArchError::ReservedLayerType(LayerType::Output))
        ));
    }

    #[test]
    fn test_record_mutation_leaves_topology() {
        let mut g = minimal();
        let edges: Vec<_> = g.edges().collect();
        g.record_mutation(MutationRecord::new(
            RecordKind::Mutation(MutationKind::ArchitectureAdd),
            1,
        ));
        g.record_mutation(MutationRecord::new(RecordKind::Init, 0));
        assert_eq!(g.history().len(), 2);
        assert_eq!(g.history()[1].kind, RecordKind::Init);
        assert_eq!(g.edges().collect::<Vec<_>>(), edges);
    }

    #[test]
    fn test_topological_order_is_deterministic() {
        let (mut g, a, _) = split_graph();
        g.merge_branches(layer(LayerType::Dense), None).unwrap();
        let order = g.topological_order().unwrap();
        assert_eq!(order, g.topological_order().unwrap());
        assert_eq!(order.first(), Some(&g.input()));
        assert_eq!(order.last(), Some(&g.finisher()));
        assert_eq!(order[1], a);
    }

    #[test]
    fn test_from_parts_derives_branches() {
        let (mut g, _, _) = split_graph();
        g.merge_branches(layer(LayerType::Dense), None).unwrap();

        let nodes: Vec<_> = g.nodes().map(|(id, n)| (id, n.clone())).collect();
        let edges: Vec<_> = g.edges().collect();
        let rebuilt =
            ArchitectureGraph::from_parts(nodes, &edges, g.input(), g.finisher()).unwrap();

        assert!(rebuilt.validate().is_ok());
        assert_eq!(rebuilt.edges().collect::<Vec<_>>(), edges);
        // input+A, B, C, D
        assert_eq!(rebuilt.branch_count(), 4);
        assert_eq!(rebuilt.open_branch_count(), 1);
        assert_eq!(rebuilt.next_id(), g.next_id());
    }

    #[test]
    fn test_from_parts_rejects_dangling_node() {
        let nodes = vec![
            (NodeId(0), layer(LayerType::Input)),
            (NodeId(1), layer(LayerType::Output)),
            (NodeId(2), layer(LayerType::Dense)),
        ];
        let edges = [(NodeId(0), NodeId(1)), (NodeId(2), NodeId(1))];
        let err = ArchitectureGraph::from_parts(nodes, &edges, NodeId(0), NodeId(1)).unwrap_err();
        assert!(matches!(err, ArchError::InvariantViolated(_)));
    }

    #[test]
    fn test_from_parts_rejects_cycle() {
        let nodes = vec![
            (NodeId(0), layer(LayerType::Input)),
            (NodeId(1), layer(LayerType::Output)),
            (NodeId(2), layer(LayerType::Dense)),
            (NodeId(3), layer(LayerType::Dense)),
        ];
        let edges = [
            (NodeId(0), NodeId(2)),
            (NodeId(2), NodeId(3)),
            (NodeId(3), NodeId(2)),
            (NodeId(3), NodeId(1)),
        ];
        let err = ArchitectureGraph::from_parts(nodes, &edges, NodeId(0), NodeId(1)).unwrap_err();
        assert!(matches!(err, ArchError::CycleDetected(_)));
    }
}
