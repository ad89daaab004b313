//! Mutation operators.
//!
//! Each architecture operator draws its choices (which node, which branch,
//! which layer) and then makes a single structural call on the graph. The
//! graph either commits the whole change or none of it, so an `Err` always
//! leaves the graph as it was.
//!
//! Nodes whose type is fixed (input, finisher, embedding prefix) are never
//! picked.

use super::types::{Affected, MutationKind};
use crate::distribution::{LayerDistribution, TrainingParam};
use crate::error::{ArchError, ArchResult};
use crate::graph::{ArchitectureGraph, BranchId};
use crate::individual::TrainingParams;
use crate::layer::{LayerNode, NodeId};
use crate::random::choose;
use rand::Rng;

/// Interior nodes operators may touch, ascending.
pub fn mutable_nodes(graph: &ArchitectureGraph) -> Vec<NodeId> {
    graph
        .interior_nodes()
        .into_iter()
        .filter(|&id| graph.node(id).is_some_and(|n| !n.layer_type().is_fixed()))
        .collect()
}

// ============================================================================
// Architecture operators
// ============================================================================

/// Replaces one interior node's type and config; edges stay.
pub fn mutate_architecture_part<R: Rng, D: LayerDistribution>(
    graph: &mut ArchitectureGraph,
    rng: &mut R,
    dist: &mut D,
) -> ArchResult<Affected> {
    let id = pick_node(&mutable_nodes(graph), MutationKind::ArchitecturePart, rng)?;
    let layer = dist.sample_layer(rng)?;
    graph.replace_layer(id, layer)?;
    Ok(Affected::node(id))
}

/// Regenerates one interior node's config, keeping its type.
pub fn mutate_architecture_parameters<R: Rng, D: LayerDistribution>(
    graph: &mut ArchitectureGraph,
    rng: &mut R,
    dist: &mut D,
) -> ArchResult<Affected> {
    let id = pick_node(&mutable_nodes(graph), MutationKind::ArchitectureParameters, rng)?;
    let layer_type = graph
        .node(id)
        .map(LayerNode::layer_type)
        .ok_or(ArchError::UnknownNode(id))?;
    let config = dist.sample_config(layer_type, rng);
    graph.replace_layer(id, LayerNode::new(layer_type, config)?)?;
    Ok(Affected::node(id))
}

/// Inserts a sampled layer at the end of a random open branch.
///
/// When the distribution asks for more than one layer, the new node forks
/// into that many branches instead.
pub fn mutate_architecture_add<R: Rng, D: LayerDistribution>(
    graph: &mut ArchitectureGraph,
    rng: &mut R,
    dist: &mut D,
) -> ArchResult<Affected> {
    let branch = pick_branch(&graph.open_branches(), MutationKind::ArchitectureAdd, rng)?;
    let layer = dist.sample_layer(rng)?;
    let count = dist.sample_layer_count(rng);
    let split_into = (count > 1).then_some(count);

    let first_new = graph.branch_count();
    let id = graph.add_layer(layer, branch, split_into)?;

    let mut branches = vec![branch];
    branches.extend((first_new..graph.branch_count()).map(BranchId));
    Ok(Affected {
        nodes: vec![id],
        branches,
    })
}

/// Removes a random removable interior node.
///
/// # Errors
/// [`ArchError::NothingToMutate`] if every interior node is protected.
pub fn mutate_architecture_remove<R: Rng>(
    graph: &mut ArchitectureGraph,
    rng: &mut R,
) -> ArchResult<Affected> {
    let candidates: Vec<NodeId> = mutable_nodes(graph)
        .into_iter()
        .filter(|&id| graph.can_remove(id))
        .collect();
    let id = pick_node(&candidates, MutationKind::ArchitectureRemove, rng)?;
    graph.remove_layer(id)?;
    Ok(Affected::node(id))
}

/// Forks a random open branch into at least two new branches, one sampled
/// layer each.
pub fn mutate_architecture_split<R: Rng, D: LayerDistribution>(
    graph: &mut ArchitectureGraph,
    rng: &mut R,
    dist: &mut D,
) -> ArchResult<Affected> {
    let branch = pick_branch(&graph.open_branches(), MutationKind::ArchitectureSplit, rng)?;
    let count = dist.sample_layer_count(rng).max(2);
    let layers = (0..count)
        .map(|_| dist.sample_layer(rng))
        .collect::<ArchResult<Vec<_>>>()?;

    let opened = graph.split_branch(layers, branch)?;
    let nodes = opened
        .iter()
        .filter_map(|&b| graph.branch(b).and_then(|br| br.members().first().copied()))
        .collect::<Vec<_>>();

    let mut branches = vec![branch];
    branches.extend(opened);
    Ok(Affected { nodes, branches })
}

/// Joins a random subset (two or more) of the open branches.
///
/// # Errors
/// [`ArchError::NothingToMutate`] with fewer than two open branches.
pub fn mutate_architecture_merge<R: Rng, D: LayerDistribution>(
    graph: &mut ArchitectureGraph,
    rng: &mut R,
    dist: &mut D,
) -> ArchResult<Affected> {
    let mut open = graph.open_branches();
    if open.len() < 2 {
        return Err(ArchError::NothingToMutate(MutationKind::ArchitectureMerge));
    }
    let take = rng.random_range(2..=open.len());
    // Partial Fisher-Yates: the first `take` slots become the sample.
    for i in 0..take {
        let j = rng.random_range(i..open.len());
        open.swap(i, j);
    }
    open.truncate(take);
    open.sort_unstable();

    let layer = dist.sample_layer(rng)?;
    let id = graph.merge_branches(layer, Some(&open))?;
    open.push(BranchId(graph.branch_count() - 1));
    Ok(Affected {
        nodes: vec![id],
        branches: open,
    })
}

// ============================================================================
// Training operators
// ============================================================================

/// Redraws every training hyperparameter.
pub fn mutate_training_all<R: Rng, D: LayerDistribution>(
    params: &mut TrainingParams,
    rng: &mut R,
    dist: &mut D,
) {
    for param in TrainingParam::ALL {
        params.set(param, dist.sample_training_param(param, rng));
    }
}

/// Redraws one random training hyperparameter and returns which.
pub fn mutate_training_part<R: Rng, D: LayerDistribution>(
    params: &mut TrainingParams,
    rng: &mut R,
    dist: &mut D,
) -> TrainingParam {
    let param = TrainingParam::ALL[rng.random_range(0..TrainingParam::ALL.len())];
    params.set(param, dist.sample_training_param(param, rng));
    param
}

fn pick_node<R: Rng>(candidates: &[NodeId], kind: MutationKind, rng: &mut R) -> ArchResult<NodeId> {
    choose(candidates, rng)
        .copied()
        .ok_or(ArchError::NothingToMutate(kind))
}

fn pick_branch<R: Rng>(
    candidates: &[BranchId],
    kind: MutationKind,
    rng: &mut R,
) -> ArchResult<BranchId> {
    choose(candidates, rng)
        .copied()
        .ok_or(ArchError::NothingToMutate(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{AdaptiveDistribution, DistributionConfig};
    use crate::layer::LayerType;
    use crate::random::create_rng;

    fn minimal() -> ArchitectureGraph {
        ArchitectureGraph::create(
            LayerNode::bare(LayerType::Input),
            LayerNode::bare(LayerType::Output),
        )
        .unwrap()
    }

    fn chain(n: usize) -> ArchitectureGraph {
        let mut g = minimal();
        for _ in 0..n {
            g.add_layer(LayerNode::bare(LayerType::Dense), BranchId(0), None)
                .unwrap();
        }
        g
    }

    /// Always one layer per draw, so `add` never forks.
    fn single_count() -> AdaptiveDistribution {
        AdaptiveDistribution::new(DistributionConfig::default().with_layer_count_weights(vec![1.0]))
            .unwrap()
    }

    #[test]
    fn test_part_keeps_edges() {
        let mut g = chain(3);
        let edges: Vec<_> = g.edges().collect();
        let mut rng = create_rng(42);
        let mut dist = AdaptiveDistribution::default();
        let affected = mutate_architecture_part(&mut g, &mut rng, &mut dist).unwrap();
        assert_eq!(affected.nodes.len(), 1);
        assert_eq!(g.edges().collect::<Vec<_>>(), edges);
    }

    #[test]
    fn test_parameters_keep_type() {
        let mut g = chain(3);
        let mut rng = create_rng(42);
        let mut dist = AdaptiveDistribution::default();
        let affected = mutate_architecture_parameters(&mut g, &mut rng, &mut dist).unwrap();
        let node = g.node(affected.nodes[0]).unwrap();
        assert_eq!(node.layer_type(), LayerType::Dense);
        assert!(node.param("units").is_some());
    }

    #[test]
    fn test_part_on_minimal_graph_has_nothing_to_do() {
        let mut g = minimal();
        let before = g.clone();
        let mut rng = create_rng(42);
        let mut dist = AdaptiveDistribution::default();
        let err = mutate_architecture_part(&mut g, &mut rng, &mut dist).unwrap_err();
        assert!(matches!(
            err,
            ArchError::NothingToMutate(MutationKind::ArchitecturePart)
        ));
        assert_eq!(g, before);
    }

    #[test]
    fn test_fixed_nodes_are_not_mutable() {
        let mut g = minimal();
        let emb = g
            .add_layer(LayerNode::bare(LayerType::Embedding), BranchId(0), None)
            .unwrap();
        let dense = g
            .add_layer(LayerNode::bare(LayerType::Dense), BranchId(0), None)
            .unwrap();
        assert_eq!(mutable_nodes(&g), vec![dense]);
        assert!(!mutable_nodes(&g).contains(&emb));
    }

    #[test]
    fn test_add_grows_by_one_node() {
        let mut g = chain(1);
        let mut rng = create_rng(42);
        let mut dist = single_count();
        let before = g.node_count();
        let affected = mutate_architecture_add(&mut g, &mut rng, &mut dist).unwrap();
        assert_eq!(g.node_count(), before + 1);
        assert_eq!(affected.branches, vec![BranchId(0)]);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_add_can_fork() {
        let mut g = chain(1);
        let mut rng = create_rng(42);
        let mut dist = AdaptiveDistribution::new(
            DistributionConfig::default().with_layer_count_weights(vec![0.0, 0.0, 1.0]),
        )
        .unwrap();
        let affected = mutate_architecture_add(&mut g, &mut rng, &mut dist).unwrap();
        assert_eq!(affected.branches, vec![BranchId(0), BranchId(1), BranchId(2), BranchId(3)]);
        assert_eq!(g.open_branch_count(), 3);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_remove_bridges_neighbours() {
        let mut g = chain(3);
        let mut rng = create_rng(42);
        let nodes = g.node_count();
        let edges = g.edge_count();
        let affected = mutate_architecture_remove(&mut g, &mut rng).unwrap();
        assert_eq!(g.node_count(), nodes - 1);
        assert_eq!(g.edge_count(), edges - 1);
        assert!(!g.contains(affected.nodes[0]));
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_remove_with_only_protected_nodes() {
        let mut g = minimal();
        g.split_branch(
            vec![LayerNode::bare(LayerType::Dense), LayerNode::bare(LayerType::Lstm)],
            BranchId(0),
        )
        .unwrap();
        let before = g.clone();
        let mut rng = create_rng(42);
        let err = mutate_architecture_remove(&mut g, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            ArchError::NothingToMutate(MutationKind::ArchitectureRemove)
        ));
        assert_eq!(g, before);
    }

    #[test]
    fn test_split_then_merge() {
        let mut g = chain(1);
        let mut rng = create_rng(42);
        let mut dist = AdaptiveDistribution::default();

        let split = mutate_architecture_split(&mut g, &mut rng, &mut dist).unwrap();
        assert!(split.nodes.len() >= 2);
        assert_eq!(split.branches.len(), split.nodes.len() + 1);
        assert_eq!(g.open_branch_count(), split.nodes.len());

        let open_before = g.open_branch_count();
        let merge = mutate_architecture_merge(&mut g, &mut rng, &mut dist).unwrap();
        let merged = merge.branches.len() - 1;
        assert!(merged >= 2);
        assert_eq!(g.open_branch_count(), open_before - merged + 1);
        assert_eq!(g.in_degree(merge.nodes[0]), merged);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_merge_needs_two_open_branches() {
        let mut g = chain(2);
        let before = g.clone();
        let mut rng = create_rng(42);
        let mut dist = AdaptiveDistribution::default();
        let err = mutate_architecture_merge(&mut g, &mut rng, &mut dist).unwrap_err();
        assert!(matches!(
            err,
            ArchError::NothingToMutate(MutationKind::ArchitectureMerge)
        ));
        assert_eq!(g, before);
    }

    #[test]
    fn test_training_operators() {
        let mut params = TrainingParams::default();
        let mut rng = create_rng(42);
        let mut dist = AdaptiveDistribution::default();
        mutate_training_all(&mut params, &mut rng, &mut dist);
        assert_eq!(params.len(), TrainingParam::ALL.len());

        let param = mutate_training_part(&mut params, &mut rng, &mut dist);
        assert!(params.get(param).is_some());
    }
}
