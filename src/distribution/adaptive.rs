//! Adaptive layer-type distribution.

use super::config::DistributionConfig;
use super::types::{LayerDistribution, TrainingParam};
use crate::error::{ArchError, ArchResult};
use crate::layer::{LayerConfig, LayerType, ParamValue};
use crate::random::{choose, roulette_index};
use rand::Rng;
use tracing::trace;

/// Default [`LayerDistribution`]: roulette over layer types whose mass
/// adapts to what has been drawn.
///
/// Every time a type is sampled its mass is doubled and the weights are
/// renormalised, so a run drifts toward the types it already uses.
///
/// # Examples
///
/// ```
/// use u_neuroarch::distribution::{AdaptiveDistribution, DistributionConfig, LayerDistribution};
/// use u_neuroarch::random::create_rng;
///
/// let mut dist = AdaptiveDistribution::new(DistributionConfig::default()).unwrap();
/// let mut rng = create_rng(42);
/// let layer = dist.sample_layer(&mut rng).unwrap();
/// assert!(!layer.layer_type().is_reserved());
/// ```
#[derive(Debug, Clone)]
pub struct AdaptiveDistribution {
    config: DistributionConfig,
    weights: Vec<f64>,
}

impl AdaptiveDistribution {
    /// # Errors
    /// [`ArchError::Config`] when `config` fails validation.
    pub fn new(config: DistributionConfig) -> ArchResult<Self> {
        config.validate().map_err(ArchError::Config)?;
        let weights = normalized(config.layer_types.iter().map(|&(_, w)| w));
        Ok(Self { config, weights })
    }

    pub fn config(&self) -> &DistributionConfig {
        &self.config
    }

    /// Current mass per layer type, summing to one.
    pub fn weights(&self) -> Vec<(LayerType, f64)> {
        self.config
            .layer_types
            .iter()
            .zip(&self.weights)
            .map(|(&(t, _), &w)| (t, w))
            .collect()
    }

    /// Restores the initial weights.
    pub fn reset(&mut self) {
        self.weights = normalized(self.config.layer_types.iter().map(|&(_, w)| w));
    }

    fn reinforce(&mut self, index: usize) {
        if let Some(w) = self.weights.get_mut(index) {
            *w *= 2.0;
        }
        self.weights = normalized(self.weights.iter().copied());
    }

    fn pick_int<R: Rng>(table: &[i64], fallback: i64, rng: &mut R) -> ParamValue {
        ParamValue::Int(choose(table, rng).copied().unwrap_or(fallback))
    }

    fn pick_text<R: Rng>(table: &[String], fallback: &str, rng: &mut R) -> ParamValue {
        let text = choose(table, rng).map_or(fallback, String::as_str);
        ParamValue::Text(text.to_string())
    }

    fn pick_rate<R: Rng>(&self, rng: &mut R) -> ParamValue {
        let (lo, hi) = self.config.dropout_range;
        let rate = if hi > lo { rng.random_range(lo..hi) } else { lo };
        ParamValue::Float((rate * 100.0).round() / 100.0)
    }
}

impl Default for AdaptiveDistribution {
    fn default() -> Self {
        let config = DistributionConfig::default();
        let weights = normalized(config.layer_types.iter().map(|&(_, w)| w));
        Self { config, weights }
    }
}

impl LayerDistribution for AdaptiveDistribution {
    fn sample_layer_type<R: Rng>(&mut self, rng: &mut R) -> LayerType {
        let index = roulette_index(&self.weights, rng).unwrap_or(0);
        let layer_type = self
            .config
            .layer_types
            .get(index)
            .map_or(LayerType::Dense, |&(t, _)| t);
        self.reinforce(index);
        trace!(%layer_type, "sampled layer type");
        layer_type
    }

    fn sample_layer_count<R: Rng>(&mut self, rng: &mut R) -> usize {
        roulette_index(&self.config.layer_count_weights, rng).map_or(1, |i| i + 1)
    }

    fn sample_config<R: Rng>(&mut self, layer_type: LayerType, rng: &mut R) -> LayerConfig {
        let c = &self.config;
        let mut config = LayerConfig::new();
        let mut set = |name: &str, value: ParamValue| {
            config.insert(name.to_string(), value);
        };

        match layer_type {
            LayerType::Dense => {
                set("units", Self::pick_int(&c.units, 64, rng));
                set("activation", Self::pick_text(&c.activations, "relu", rng));
            }
            LayerType::Conv1d | LayerType::Conv2d => {
                set("filters", Self::pick_int(&c.filters, 32, rng));
                set("kernel_size", Self::pick_int(&c.kernel_sizes, 3, rng));
                let strides = choose(&c.strides, rng).copied().unwrap_or(1);
                set("strides", ParamValue::Int(strides));
                let paddings: &[&str] = if layer_type == LayerType::Conv1d {
                    &["valid", "same", "causal"]
                } else {
                    &["valid", "same"]
                };
                let padding = choose(paddings, rng).copied().unwrap_or("same");
                set("padding", padding.into());
                // Dilation only combines with unit strides.
                let dilation = if strides == 1 {
                    choose(&c.dilation_rates, rng).copied().unwrap_or(1)
                } else {
                    1
                };
                set("dilation_rate", ParamValue::Int(dilation));
                set("activation", Self::pick_text(&c.activations, "relu", rng));
            }
            LayerType::MaxPool1d | LayerType::MaxPool2d => {
                set("pool_size", Self::pick_int(&c.pool_sizes, 2, rng));
                set("strides", Self::pick_int(&c.strides, 1, rng));
                let padding = choose(&["valid", "same"], rng).copied().unwrap_or("valid");
                set("padding", padding.into());
            }
            LayerType::Lstm | LayerType::Bidirectional => {
                set("units", Self::pick_int(&c.units, 64, rng));
                set("return_sequences", ParamValue::Bool(rng.random_bool(0.5)));
                set("dropout", self.pick_rate(rng));
                set("recurrent_dropout", self.pick_rate(rng));
            }
            LayerType::Dropout => set("rate", self.pick_rate(rng)),
            LayerType::Embedding => {
                set("embedding_dim", Self::pick_int(&c.embedding_dims, 100, rng));
            }
            LayerType::Output => set("activation", "softmax".into()),
            LayerType::Input | LayerType::Flatten => {}
        }
        config
    }

    fn sample_training_param<R: Rng>(&mut self, param: TrainingParam, rng: &mut R) -> ParamValue {
        let c = &self.config;
        match param {
            TrainingParam::Optimizer => Self::pick_text(&c.optimizers, "adam", rng),
            TrainingParam::OptimizerLr => {
                ParamValue::Float(choose(&c.learning_rates, rng).copied().unwrap_or(1e-3))
            }
            TrainingParam::OptimizerDecay => {
                ParamValue::Float(choose(&c.decays, rng).copied().unwrap_or(0.0))
            }
            TrainingParam::BatchSize => Self::pick_int(&c.batch_sizes, 32, rng),
            TrainingParam::Epochs => Self::pick_int(&c.epochs, 10, rng),
        }
    }
}

fn normalized(weights: impl Iterator<Item = f64>) -> Vec<f64> {
    let weights: Vec<f64> = weights.collect();
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        weights.iter().map(|w| w / total).collect()
    } else {
        vec![1.0 / weights.len().max(1) as f64; weights.len()]
    }
}
