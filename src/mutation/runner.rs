//! Mutation dispatch.

use super::config::MutationConfig;
use super::operators::{
    mutate_architecture_add, mutate_architecture_merge, mutate_architecture_parameters,
    mutate_architecture_part, mutate_architecture_remove, mutate_architecture_split,
    mutate_training_all, mutate_training_part,
};
use super::types::{Affected, MutationKind};
use crate::distribution::LayerDistribution;
use crate::error::{ArchError, ArchResult};
use crate::graph::{MutationRecord, RecordKind};
use crate::individual::Individual;
use crate::random::roulette_index;
use rand::Rng;
use tracing::{debug, trace};

/// Applies one weighted-random mutation per call.
///
/// # Examples
///
/// ```
/// use u_neuroarch::distribution::AdaptiveDistribution;
/// use u_neuroarch::individual::{Individual, IndividualOptions};
/// use u_neuroarch::mutation::{MutationConfig, MutationKind, Mutator};
/// use u_neuroarch::random::create_rng;
///
/// let mut dist = AdaptiveDistribution::default();
/// let mut rng = create_rng(42);
/// let mut ind =
///     Individual::random("a", 0, IndividualOptions::default(), &mut dist, &mut rng).unwrap();
///
/// let mutator = Mutator::new(MutationConfig::only(&[MutationKind::ArchitectureAdd])).unwrap();
/// let record = mutator.mutate(&mut ind, 1, &mut rng, &mut dist).unwrap();
/// assert_eq!(ind.graph().history().last(), Some(&record));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Mutator {
    config: MutationConfig,
}

impl Mutator {
    /// # Errors
    /// [`ArchError::Config`] if the weights are invalid.
    pub fn new(config: MutationConfig) -> ArchResult<Self> {
        config.validate().map_err(ArchError::Config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    /// Draws a kind from the configured weights.
    pub fn pick<R: Rng>(&self, rng: &mut R) -> ArchResult<MutationKind> {
        roulette_index(&self.config.weights, rng)
            .and_then(|i| MutationKind::ALL.get(i).copied())
            .ok_or_else(|| ArchError::Config("no mutation kind has positive weight".into()))
    }

    /// Mutates `individual` with a randomly drawn kind.
    ///
    /// On success the record is appended to the graph history and the
    /// individual moves to `stage`. On error nothing changes; the caller
    /// decides whether to retry.
    pub fn mutate<R: Rng, D: LayerDistribution>(
        &self,
        individual: &mut Individual,
        stage: u32,
        rng: &mut R,
        dist: &mut D,
    ) -> ArchResult<MutationRecord> {
        let kind = self.pick(rng)?;
        self.apply(kind, individual, stage, rng, dist)
    }

    /// Mutates `individual` with the given kind.
    pub fn apply<R: Rng, D: LayerDistribution>(
        &self,
        kind: MutationKind,
        individual: &mut Individual,
        stage: u32,
        rng: &mut R,
        dist: &mut D,
    ) -> ArchResult<MutationRecord> {
        let affected = match kind {
            MutationKind::ArchitecturePart => {
                mutate_architecture_part(individual.graph_mut(), rng, dist)?
            }
            MutationKind::ArchitectureParameters => {
                mutate_architecture_parameters(individual.graph_mut(), rng, dist)?
            }
            MutationKind::ArchitectureAdd => {
                mutate_architecture_add(individual.graph_mut(), rng, dist)?
            }
            MutationKind::ArchitectureRemove => {
                mutate_architecture_remove(individual.graph_mut(), rng)?
            }
            MutationKind::ArchitectureSplit => {
                mutate_architecture_split(individual.graph_mut(), rng, dist)?
            }
            MutationKind::ArchitectureMerge => {
                mutate_architecture_merge(individual.graph_mut(), rng, dist)?
            }
            MutationKind::TrainingAll => {
                mutate_training_all(individual.training_mut(), rng, dist);
                Affected::default()
            }
            MutationKind::TrainingPart => {
                let param = mutate_training_part(individual.training_mut(), rng, dist);
                trace!(%param, "training parameter redrawn");
                Affected::default()
            }
        };

        let record = MutationRecord::new(RecordKind::Mutation(kind), stage)
            .with_nodes(affected.nodes)
            .with_branches(affected.branches);
        individual.graph_mut().record_mutation(record.clone());
        individual.set_stage(stage);
        debug!(individual = individual.name(), %kind, stage, "mutation applied");
        Ok(record)
    }
}
