//! Sampling service contract.

use crate::error::ArchResult;
use crate::layer::{LayerConfig, LayerNode, LayerType, ParamValue};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Training hyperparameters an individual carries next to its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingParam {
    Optimizer,
    OptimizerLr,
    OptimizerDecay,
    BatchSize,
    Epochs,
}

impl TrainingParam {
    pub const ALL: [TrainingParam; 5] = [
        TrainingParam::Optimizer,
        TrainingParam::OptimizerLr,
        TrainingParam::OptimizerDecay,
        TrainingParam::BatchSize,
        TrainingParam::Epochs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TrainingParam::Optimizer => "optimizer",
            TrainingParam::OptimizerLr => "optimizer_lr",
            TrainingParam::OptimizerDecay => "optimizer_decay",
            TrainingParam::BatchSize => "batch_size",
            TrainingParam::Epochs => "epochs",
        }
    }
}

impl fmt::Display for TrainingParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The stochastic service that proposes layers and hyperparameters.
///
/// Implementations may keep internal state (adaptive weights) and are
/// expected to be called in a fixed order per graph so that a seeded `rng`
/// reproduces the same mutations.
///
/// # Implementing
///
/// ```
/// use rand::Rng;
/// use u_neuroarch::distribution::{LayerDistribution, TrainingParam};
/// use u_neuroarch::layer::{LayerConfig, LayerType, ParamValue};
///
/// struct DenseOnly;
///
/// impl LayerDistribution for DenseOnly {
///     fn sample_layer_type<R: Rng>(&mut self, _rng: &mut R) -> LayerType {
///         LayerType::Dense
///     }
///     fn sample_layer_count<R: Rng>(&mut self, _rng: &mut R) -> usize {
///         1
///     }
///     fn sample_config<R: Rng>(&mut self, _t: LayerType, rng: &mut R) -> LayerConfig {
///         let units = if rng.random_bool(0.5) { 32 } else { 64 };
///         [("units".to_string(), ParamValue::Int(units))].into_iter().collect()
///     }
///     fn sample_training_param<R: Rng>(&mut self, _p: TrainingParam, _rng: &mut R) -> ParamValue {
///         ParamValue::Int(1)
///     }
/// }
/// ```
pub trait LayerDistribution {
    /// Draws an interior layer type. Never returns `Input` or `Output`.
    fn sample_layer_type<R: Rng>(&mut self, rng: &mut R) -> LayerType;

    /// Draws how many layers to place (at least one).
    fn sample_layer_count<R: Rng>(&mut self, rng: &mut R) -> usize;

    /// Draws a configuration that fits the schema of `layer_type`.
    fn sample_config<R: Rng>(&mut self, layer_type: LayerType, rng: &mut R) -> LayerConfig;

    /// Draws a value for one training hyperparameter.
    fn sample_training_param<R: Rng>(&mut self, param: TrainingParam, rng: &mut R)
        -> ParamValue;

    /// Draws a type, then a config for it.
    fn sample_layer<R: Rng>(&mut self, rng: &mut R) -> ArchResult<LayerNode> {
        let layer_type = self.sample_layer_type(rng);
        let config = self.sample_config(layer_type, rng);
        LayerNode::new(layer_type, config)
    }
}
