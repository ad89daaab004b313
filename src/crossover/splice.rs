//! Cut-and-splice crossover.
//!
//! # Cut points
//!
//! A node `v` is a cut point when, in build order, no edge jumps over it:
//! there is no edge `u -> w` with `pos(u) < pos(v) < pos(w)`. Every
//! input-to-finisher path runs through such a node, so cutting there never
//! splits a fork from its join. The finisher is never a cut point, and
//! nothing before the last fixed node (input, embedding) is either, so the
//! child keeps exactly one fixed prefix.
//!
//! # Splice
//!
//! The child is parent A up to and including its cut, followed by parent B
//! strictly after its cut. Edges that left B's cut leave A's cut instead.

use crate::error::{ArchError, ArchResult};
use crate::graph::{ArchitectureGraph, Lineage, MutationRecord, RecordKind};
use crate::layer::{LayerNode, NodeId};
use crate::random::choose;
use rand::Rng;
use std::collections::BTreeMap;
use tracing::debug;

/// Cut points of `graph`, in build order.
///
/// Never empty for a valid graph: the input (or the last fixed node) always
/// qualifies.
pub fn cut_points(graph: &ArchitectureGraph) -> ArchResult<Vec<NodeId>> {
    let order = graph.topological_order()?;
    let pos: BTreeMap<NodeId, usize> = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    // cover[i] > 0 when some edge jumps over position i.
    let mut cover = vec![0i64; order.len() + 1];
    for (from, to) in graph.edges() {
        let (pu, pw) = (pos[&from], pos[&to]);
        if pw > pu + 1 {
            cover[pu + 1] += 1;
            cover[pw] -= 1;
        }
    }

    let floor = order
        .iter()
        .rposition(|&id| {
            id != graph.finisher() && graph.node(id).is_some_and(|n| n.layer_type().is_fixed())
        })
        .unwrap_or(0);

    let mut cuts = Vec::new();
    let mut running = 0i64;
    for (i, &id) in order.iter().enumerate() {
        running += cover[i];
        if running == 0 && i >= floor && id != graph.finisher() {
            cuts.push(id);
        }
    }
    Ok(cuts)
}

/// Breeds a child from two parents.
///
/// The child has fresh, contiguous ids, a branch table derived from its
/// topology, a history that starts with a `Birth` record at `stage`, and a
/// lineage holding clones of both parents. The parents are not modified.
///
/// # Examples
///
/// ```
/// use u_neuroarch::crossover::crossover;
/// use u_neuroarch::graph::{ArchitectureGraph, BranchId};
/// use u_neuroarch::layer::{LayerNode, LayerType};
/// use u_neuroarch::random::create_rng;
///
/// let mut a = ArchitectureGraph::create(
///     LayerNode::bare(LayerType::Input),
///     LayerNode::bare(LayerType::Output),
/// )
/// .unwrap();
/// a.add_layer(LayerNode::bare(LayerType::Dense), BranchId(0), None).unwrap();
/// let b = a.clone();
///
/// let child = crossover(&a, &b, 1, &mut create_rng(42)).unwrap();
/// assert!(child.validate().is_ok());
/// assert!(child.lineage().is_some());
/// ```
pub fn crossover<R: Rng>(
    parent_a: &ArchitectureGraph,
    parent_b: &ArchitectureGraph,
    stage: u32,
    rng: &mut R,
) -> ArchResult<ArchitectureGraph> {
    let cuts_a = cut_points(parent_a)?;
    let cuts_b = cut_points(parent_b)?;
    let no_cut = || ArchError::InvariantViolated("parent has no cut point".into());
    let cut_a = *choose(&cuts_a, rng).ok_or_else(no_cut)?;
    let cut_b = *choose(&cuts_b, rng).ok_or_else(no_cut)?;
    debug!(%cut_a, %cut_b, "crossover cut points");

    let mut child = splice(parent_a, cut_a, parent_b, cut_b)?;
    let born: Vec<NodeId> = child.node_ids().collect();
    child.record_mutation(MutationRecord::new(RecordKind::Birth, stage).with_nodes(born));
    child.set_lineage(Lineage::new(parent_a, parent_b));
    Ok(child)
}

/// Joins `a` up to `cut_a` with `b` after `cut_b`.
pub fn splice(
    a: &ArchitectureGraph,
    cut_a: NodeId,
    b: &ArchitectureGraph,
    cut_b: NodeId,
) -> ArchResult<ArchitectureGraph> {
    let order_a = a.topological_order()?;
    let order_b = b.topological_order()?;
    let pos_a = order_a
        .iter()
        .position(|&id| id == cut_a)
        .ok_or(ArchError::UnknownNode(cut_a))?;
    let pos_b = order_b
        .iter()
        .position(|&id| id == cut_b)
        .ok_or(ArchError::UnknownNode(cut_b))?;

    let mut remap_a: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    let mut remap_b: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    let mut nodes: Vec<(NodeId, LayerNode)> = Vec::new();

    let mut clone_into = |graph: &ArchitectureGraph,
                          id: NodeId,
                          remap: &mut BTreeMap<NodeId, NodeId>|
     -> ArchResult<()> {
        let fresh = NodeId(nodes.len());
        let node = graph.node(id).ok_or(ArchError::UnknownNode(id))?;
        nodes.push((fresh, node.clone()));
        remap.insert(id, fresh);
        Ok(())
    };
    for &id in &order_a[..=pos_a] {
        clone_into(a, id, &mut remap_a)?;
    }
    for &id in &order_b[pos_b + 1..] {
        clone_into(b, id, &mut remap_b)?;
    }
    // B's cut is stood in for by A's cut.
    let joint = remap_a.get(&cut_a).copied().ok_or(ArchError::UnknownNode(cut_a))?;
    remap_b.insert(cut_b, joint);

    let mut edges: Vec<(NodeId, NodeId)> = a
        .edges()
        .filter_map(|(u, w)| Some((*remap_a.get(&u)?, *remap_a.get(&w)?)))
        .collect();
    edges.extend(b.edges().filter_map(|(u, w)| {
        // Edges into B's cut or earlier belong to the discarded prefix.
        if w == cut_b {
            return None;
        }
        Some((*remap_b.get(&u)?, *remap_b.get(&w)?))
    }));

    let input = remap_a
        .get(&a.input())
        .copied()
        .ok_or(ArchError::UnknownNode(a.input()))?;
    let finisher = remap_b
        .get(&b.finisher())
        .copied()
        .ok_or_else(|| ArchError::InvariantViolated("cut placed at the finisher".into()))?;

    ArchitectureGraph::from_parts(nodes, &edges, input, finisher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::BranchId;
    use crate::layer::LayerType;
    use crate::random::create_rng;

    fn minimal() -> ArchitectureGraph {
        ArchitectureGraph::create(
            LayerNode::bare(LayerType::Input),
            LayerNode::bare(LayerType::Output),
        )
        .unwrap()
    }

    fn chain(types: &[LayerType]) -> ArchitectureGraph {
        let mut g = minimal();
        for &t in types {
            g.add_layer(LayerNode::bare(t), BranchId(0), None).unwrap();
        }
        g
    }

    /// input -> A -> {B, C} -> D -> finisher
    fn diamond() -> ArchitectureGraph {
        let mut g = chain(&[LayerType::Dense]);
        g.split_branch(
            vec![LayerNode::bare(LayerType::Conv1d), LayerNode::bare(LayerType::Lstm)],
            BranchId(0),
        )
        .unwrap();
        g.merge_branches(LayerNode::bare(LayerType::Dense), None).unwrap();
        g
    }

    #[test]
    fn test_cut_points_of_chain() {
        let g = chain(&[LayerType::Dense, LayerType::Dropout]);
        let cuts = cut_points(&g).unwrap();
        assert_eq!(cuts, vec![g.input(), NodeId(2), NodeId(3)]);
    }

    #[test]
    fn test_cut_points_skip_parallel_section() {
        let g = diamond();
        // input, A, D: B and C are jumped over by the other side.
        assert_eq!(
            cut_points(&g).unwrap(),
            vec![g.input(), NodeId(2), NodeId(5)]
        );
    }

    #[test]
    fn test_cut_points_start_after_fixed_prefix() {
        let g = chain(&[LayerType::Embedding, LayerType::Dense]);
        assert_eq!(cut_points(&g).unwrap(), vec![NodeId(2), NodeId(3)]);
    }

    #[test]
    fn test_splice_chain() {
        let a = chain(&[LayerType::Dense, LayerType::Dropout]);
        let b = chain(&[LayerType::Lstm, LayerType::Conv1d]);
        // a: input, dense | b: conv1d, finisher
        let child = splice(&a, NodeId(2), &b, NodeId(2)).unwrap();
        assert!(child.validate().is_ok());
        let types: Vec<LayerType> = child
            .topological_order()
            .unwrap()
            .into_iter()
            .map(|id| child.node(id).unwrap().layer_type())
            .collect();
        assert_eq!(
            types,
            vec![
                LayerType::Input,
                LayerType::Dense,
                LayerType::Conv1d,
                LayerType::Output
            ]
        );
        assert_eq!(child.open_branch_count(), 1);
    }

    #[test]
    fn test_splice_keeps_parallel_section() {
        let a = chain(&[LayerType::Dropout]);
        let b = diamond();
        let child = splice(&a, NodeId(2), &b, NodeId(2)).unwrap();
        assert!(child.validate().is_ok());
        // input, dropout, conv1d, lstm, dense, output
        assert_eq!(child.node_count(), 6);
        let join = child
            .node_ids()
            .find(|&id| child.in_degree(id) == 2)
            .unwrap();
        assert_eq!(child.node(join).unwrap().layer_type(), LayerType::Dense);
    }

    #[test]
    fn test_splice_at_inputs_takes_all_of_b() {
        let a = chain(&[LayerType::Dense]);
        let b = diamond();
        let child = splice(&a, a.input(), &b, b.input()).unwrap();
        assert_eq!(child.node_count(), b.node_count());
        assert_eq!(child.edge_count(), b.edge_count());
    }

    #[test]
    fn test_crossover_records_birth_and_lineage() {
        let a = diamond();
        let b = chain(&[LayerType::Lstm, LayerType::Dense, LayerType::Dropout]);
        let (a_before, b_before) = (a.clone(), b.clone());
        let mut rng = create_rng(42);

        for stage in 0..20 {
            let child = crossover(&a, &b, stage, &mut rng).unwrap();
            assert!(child.validate().is_ok());
            assert_eq!(child.history().len(), 1);
            assert_eq!(child.history()[0].kind, RecordKind::Birth);
            assert_eq!(child.history()[0].stage, stage);
            let lineage = child.lineage().unwrap();
            assert_eq!(lineage.parents()[0], a);
            assert_eq!(lineage.parents()[1], b);
            let ids: Vec<usize> = child.node_ids().map(|id| id.0).collect();
            assert_eq!(ids, (0..child.node_count()).collect::<Vec<_>>());
        }
        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
    }

    #[test]
    fn test_lineage_is_one_generation_deep() {
        let a = diamond();
        let b = chain(&[LayerType::Dense]);
        let mut rng = create_rng(42);
        let child = crossover(&a, &b, 1, &mut rng).unwrap();
        let grandchild = crossover(&child, &a, 2, &mut rng).unwrap();
        let parents = grandchild.lineage().unwrap().parents();
        assert!(parents[0].lineage().is_none());
        assert!(parents[1].lineage().is_none());
    }
}
