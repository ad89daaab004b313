//! A candidate network: architecture graph plus training hyperparameters.

use super::config::{DataKind, IndividualOptions};
use super::types::TrainingParams;
use crate::crossover::crossover;
use crate::distribution::{LayerDistribution, TrainingParam};
use crate::error::{ArchError, ArchResult};
use crate::graph::{ArchitectureGraph, BranchId, GraphSnapshot, MutationRecord, RecordKind};
use crate::layer::{LayerNode, LayerType, ParamValue};
use crate::schedule::{BuildPlan, BuiltModel, Materializer, Scheduler};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One member of the population.
///
/// The outer evolutionary loop owns individuals; this type only knows how
/// to create, breed and build itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    name: String,
    stage: u32,
    options: IndividualOptions,
    training: TrainingParams,
    graph: ArchitectureGraph,
    result: Option<f64>,
}

impl Individual {
    /// Creates a random individual.
    ///
    /// The graph is `input -> [embedding] -> n sampled layers -> output`,
    /// with the embedding only for text data and `n` drawn from the
    /// distribution's layer-count weights. The output has one unit per
    /// class.
    ///
    /// # Errors
    /// [`ArchError::Config`] for invalid options, or any error from the
    /// distribution producing an invalid layer.
    ///
    /// # Examples
    ///
    /// ```
    /// use u_neuroarch::distribution::AdaptiveDistribution;
    /// use u_neuroarch::individual::{Individual, IndividualOptions};
    /// use u_neuroarch::random::create_rng;
    ///
    /// let mut dist = AdaptiveDistribution::default();
    /// let mut rng = create_rng(42);
    /// let ind = Individual::random("alpha", 0, IndividualOptions::default(), &mut dist, &mut rng)
    ///     .unwrap();
    /// assert!(ind.graph().validate().is_ok());
    /// assert!(ind.plan().is_ok());
    /// ```
    pub fn random<D: LayerDistribution, R: Rng>(
        name: impl Into<String>,
        stage: u32,
        options: IndividualOptions,
        dist: &mut D,
        rng: &mut R,
    ) -> ArchResult<Self> {
        options.validate().map_err(ArchError::Config)?;

        let mut input_config = dist.sample_config(LayerType::Input, rng);
        input_config.insert("shape".into(), ParamValue::Shape(options.input_shape()));
        let input = LayerNode::new(LayerType::Input, input_config)?;

        let mut output_config = dist.sample_config(LayerType::Output, rng);
        output_config.insert("units".into(), ParamValue::Int(options.classes as i64));
        let finisher = LayerNode::new(LayerType::Output, output_config)?;

        let mut graph = ArchitectureGraph::create(input, finisher)?;
        let trunk = BranchId(0);

        if options.data_kind == DataKind::Text {
            let mut config = dist.sample_config(LayerType::Embedding, rng);
            config.insert(
                "vocabular".into(),
                ParamValue::Int(options.vocabulary_size as i64),
            );
            config.insert(
                "sentences_length".into(),
                ParamValue::Int(options.sentence_length as i64),
            );
            graph.add_layer(LayerNode::new(LayerType::Embedding, config)?, trunk, None)?;
        }

        let count = dist.sample_layer_count(rng);
        for _ in 0..count {
            let layer = dist.sample_layer(rng)?;
            graph.add_layer(layer, trunk, None)?;
        }
        let nodes = graph.interior_nodes();
        graph.record_mutation(MutationRecord::new(RecordKind::Init, stage).with_nodes(nodes));

        let training = TrainingParams::sample(dist, rng);
        let name = name.into();
        debug!(%name, layers = count, "random individual created");

        Ok(Self {
            name,
            stage,
            options,
            training,
            graph,
            result: None,
        })
    }

    /// Breeds a child of `first` and `second`.
    ///
    /// The graph comes from [`crossover`]; each training hyperparameter is
    /// inherited from either parent with equal probability. Options follow
    /// `first`.
    pub fn crossing<R: Rng>(
        name: impl Into<String>,
        stage: u32,
        first: &Individual,
        second: &Individual,
        rng: &mut R,
    ) -> ArchResult<Self> {
        let graph = crossover(&first.graph, &second.graph, stage, rng)?;
        let training = TrainingParam::ALL
            .into_iter()
            .filter_map(|p| {
                let (pick, other) = if rng.random_bool(0.5) {
                    (first, second)
                } else {
                    (second, first)
                };
                pick.training
                    .get(p)
                    .or_else(|| other.training.get(p))
                    .map(|v| (p, v.clone()))
            })
            .collect();

        Ok(Self {
            name: name.into(),
            stage,
            options: first.options.clone(),
            training,
            graph,
            result: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> u32 {
        self.stage
    }

    pub fn set_stage(&mut self, stage: u32) {
        self.stage = stage;
    }

    pub fn options(&self) -> &IndividualOptions {
        &self.options
    }

    pub fn training(&self) -> &TrainingParams {
        &self.training
    }

    pub(crate) fn training_mut(&mut self) -> &mut TrainingParams {
        &mut self.training
    }

    pub fn graph(&self) -> &ArchitectureGraph {
        &self.graph
    }

    /// Direct graph access; structural calls keep their own guarantees.
    pub fn graph_mut(&mut self) -> &mut ArchitectureGraph {
        &mut self.graph
    }

    /// Fitness reported by the evaluation collaborator, if any.
    pub fn result(&self) -> Option<f64> {
        self.result
    }

    pub fn set_result(&mut self, result: f64) {
        self.result = Some(result);
    }

    /// Build order of the current graph.
    pub fn plan(&self) -> ArchResult<BuildPlan> {
        Scheduler::plan(&self.graph)
    }

    /// Builds the network through `materializer`.
    pub fn build<M: Materializer>(&self, materializer: &mut M) -> ArchResult<BuiltModel<M::Handle>> {
        Scheduler::build(&self.graph, materializer)
    }

    pub fn to_json(&self) -> ArchResult<String> {
        let record = IndividualRecord {
            name: self.name.clone(),
            stage: self.stage,
            options: self.options.clone(),
            training: self.training.clone(),
            result: self.result,
            graph: GraphSnapshot::capture(&self.graph),
        };
        Ok(serde_json::to_string_pretty(&record)?)
    }

    pub fn from_json(json: &str) -> ArchResult<Self> {
        let record: IndividualRecord = serde_json::from_str(json)?;
        record
            .options
            .validate()
            .map_err(ArchError::MalformedSnapshot)?;
        Ok(Self {
            name: record.name,
            stage: record.stage,
            options: record.options,
            training: record.training,
            graph: record.graph.restore()?,
            result: record.result,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct IndividualRecord {
    name: String,
    stage: u32,
    options: IndividualOptions,
    training: TrainingParams,
    #[serde(default)]
    result: Option<f64>,
    graph: GraphSnapshot,
}
