//! Dependency-deferring topological scheduler.
//!
//! Breadth-first from the input. A node whose real predecessors are not
//! all materialised goes back to the end of the queue, behind any of those
//! predecessors that were not queued yet. A node left with no real input
//! (other than the graph input itself) is pruned.

use super::types::{Binding, BuildPlan, BuiltModel, Materializer, PlanStep};
use crate::error::{ArchError, ArchResult};
use crate::graph::ArchitectureGraph;
use crate::layer::{LayerNode, NodeId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, trace, warn};

/// Turns architecture graphs into build plans.
///
/// # Usage
///
/// ```
/// use u_neuroarch::graph::{ArchitectureGraph, BranchId};
/// use u_neuroarch::layer::{LayerNode, LayerType};
/// use u_neuroarch::schedule::Scheduler;
///
/// let mut graph = ArchitectureGraph::create(
///     LayerNode::bare(LayerType::Input),
///     LayerNode::bare(LayerType::Output),
/// )
/// .unwrap();
/// graph
///     .add_layer(LayerNode::bare(LayerType::Dense), BranchId(0), None)
///     .unwrap();
///
/// let plan = Scheduler::plan(&graph).unwrap();
/// assert_eq!(plan.order().first(), Some(&graph.input()));
/// assert_eq!(plan.order().last(), Some(&graph.finisher()));
/// ```
pub struct Scheduler;

impl Scheduler {
    /// Computes the materialisation order and input bindings of `graph`.
    ///
    /// Deterministic: predecessors and successors are visited in ascending
    /// id order.
    ///
    /// # Errors
    /// [`ArchError::UnschedulableGraph`] when a full pass over the queue
    /// makes no progress, or when the finisher is never materialised.
    pub fn plan(graph: &ArchitectureGraph) -> ArchResult<BuildPlan> {
        let input = graph.input();
        let finisher = graph.finisher();

        let mut queue = VecDeque::from([input]);
        let mut queued = BTreeSet::from([input]);
        let mut materialized = BTreeSet::new();
        let mut removed = BTreeSet::new();
        let mut steps = Vec::with_capacity(graph.node_count());
        let mut pruned = Vec::new();
        let mut idle_pops = 0usize;

        while let Some(current) = queue.pop_front() {
            queued.remove(&current);

            let real: Vec<NodeId> = graph
                .predecessors(current)
                .filter(|&p| graph.node(p).is_some_and(LayerNode::is_real))
                .collect();
            let waiting: Vec<NodeId> = real
                .iter()
                .copied()
                .filter(|p| !materialized.contains(p) && !removed.contains(p))
                .collect();

            if !waiting.is_empty() {
                let mut grew = false;
                for p in waiting {
                    if queued.insert(p) {
                        queue.push_back(p);
                        grew = true;
                    }
                }
                queued.insert(current);
                queue.push_back(current);

                idle_pops = if grew { 0 } else { idle_pops + 1 };
                trace!(node = %current, queue = queue.len(), "deferred");
                if idle_pops >= queue.len() {
                    return Err(ArchError::UnschedulableGraph(format!(
                        "no progress with {} node(s) pending, first {current}",
                        queue.len()
                    )));
                }
                continue;
            }
            idle_pops = 0;

            let bound: Vec<NodeId> = real
                .into_iter()
                .filter(|p| materialized.contains(p))
                .collect();
            let binding = match bound.len() {
                0 if current == input => Binding::Source,
                0 => {
                    warn!(node = %current, "pruned node without a real input");
                    removed.insert(current);
                    pruned.push(current);
                    let seen = (&materialized, &removed);
                    Self::enqueue_successors(graph, current, &mut queue, &mut queued, seen);
                    continue;
                }
                1 => Binding::Single(bound[0]),
                _ => Binding::Join(bound),
            };

            trace!(node = %current, ?binding, "materialised");
            materialized.insert(current);
            steps.push(PlanStep {
                node: current,
                binding,
            });
            let seen = (&materialized, &removed);
            Self::enqueue_successors(graph, current, &mut queue, &mut queued, seen);
        }

        if !materialized.contains(&finisher) {
            return Err(ArchError::UnschedulableGraph(format!(
                "finisher {finisher} was never materialised"
            )));
        }

        debug!(steps = steps.len(), pruned = pruned.len(), "build plan ready");
        Ok(BuildPlan {
            steps,
            pruned,
            output: finisher,
        })
    }

    /// Plans and then builds `graph` through `materializer`.
    pub fn build<M: Materializer>(
        graph: &ArchitectureGraph,
        materializer: &mut M,
    ) -> ArchResult<BuiltModel<M::Handle>> {
        Self::plan(graph)?.build(graph, materializer)
    }

    /// Plans several independent graphs, in parallel with the `parallel`
    /// feature.
    #[cfg(feature = "parallel")]
    pub fn plan_many(graphs: &[ArchitectureGraph]) -> Vec<ArchResult<BuildPlan>> {
        use rayon::prelude::*;
        graphs.par_iter().map(Self::plan).collect()
    }

    /// Plans several independent graphs, in parallel with the `parallel`
    /// feature.
    #[cfg(not(feature = "parallel"))]
    pub fn plan_many(graphs: &[ArchitectureGraph]) -> Vec<ArchResult<BuildPlan>> {
        graphs.iter().map(Self::plan).collect()
    }

    fn enqueue_successors(
        graph: &ArchitectureGraph,
        node: NodeId,
        queue: &mut VecDeque<NodeId>,
        queued: &mut BTreeSet<NodeId>,
        (materialized, removed): (&BTreeSet<NodeId>, &BTreeSet<NodeId>),
    ) {
        for succ in graph.successors(node) {
            if !materialized.contains(&succ) && !removed.contains(&succ) && queued.insert(succ) {
                queue.push_back(succ);
            }
        }
    }
}

impl BuildPlan {
    /// Runs the plan through `materializer`.
    ///
    /// # Errors
    /// - [`ArchError::BuildFailed`] when the materializer refuses a node
    /// - [`ArchError::UnknownNode`] / [`ArchError::UnschedulableGraph`] when
    ///   the plan does not belong to `graph`
    pub fn build<M: Materializer>(
        &self,
        graph: &ArchitectureGraph,
        materializer: &mut M,
    ) -> ArchResult<BuiltModel<M::Handle>> {
        let mut built: BTreeMap<NodeId, M::Handle> = BTreeMap::new();
        let mut handles = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let node = graph.node(step.node).ok_or(ArchError::UnknownNode(step.node))?;
            let inputs = step.binding.try_map(|p| {
                built.get(p).cloned().ok_or_else(|| {
                    ArchError::UnschedulableGraph(format!(
                        "node {} bound to unbuilt node {p}",
                        step.node
                    ))
                })
            })?;
            let handle = materializer
                .materialize(step.node, node, inputs)
                .map_err(|err| {
                    debug!(node = %step.node, error = %err, "materializer refused node");
                    ArchError::BuildFailed {
                        node: step.node,
                        reason: err.to_string(),
                    }
                })?;
            built.insert(step.node, handle.clone());
            handles.push((step.node, handle));
        }

        let lookup = |id: NodeId| {
            built.get(&id).cloned().ok_or_else(|| {
                ArchError::UnschedulableGraph(format!("node {id} missing from the build"))
            })
        };
        Ok(BuiltModel {
            input: lookup(graph.input())?,
            output: lookup(self.output)?,
            handles,
        })
    }
}
