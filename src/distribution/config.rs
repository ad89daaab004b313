//! Distribution configuration.

use crate::layer::LayerType;

/// Sampling tables for [`AdaptiveDistribution`](super::AdaptiveDistribution).
///
/// Integer and text parameters are drawn uniformly from their tables,
/// dropout rates uniformly from `dropout_range`. Layer types are drawn by
/// roulette over `layer_types`; layer counts by roulette over
/// `layer_count_weights`, where entry `i` weighs a count of `i + 1`.
///
/// # Examples
///
/// ```
/// use u_neuroarch::distribution::DistributionConfig;
/// use u_neuroarch::layer::LayerType;
///
/// let config = DistributionConfig::default()
///     .with_layer_types(&[LayerType::Dense, LayerType::Dropout])
///     .with_layer_weight(LayerType::Dense, 3.0)
///     .with_units(vec![8, 16]);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct DistributionConfig {
    /// Interior layer types and their initial mass.
    pub layer_types: Vec<(LayerType, f64)>,

    /// Weights of layer counts `1..=len`.
    pub layer_count_weights: Vec<f64>,

    pub units: Vec<i64>,
    pub filters: Vec<i64>,
    pub kernel_sizes: Vec<i64>,
    pub strides: Vec<i64>,
    pub dilation_rates: Vec<i64>,
    pub pool_sizes: Vec<i64>,
    pub embedding_dims: Vec<i64>,
    pub activations: Vec<String>,

    /// Inclusive-exclusive range for dropout rates.
    pub dropout_range: (f64, f64),

    pub optimizers: Vec<String>,
    pub learning_rates: Vec<f64>,
    pub decays: Vec<f64>,
    pub batch_sizes: Vec<i64>,
    pub epochs: Vec<i64>,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        let layer_types = [
            LayerType::Conv1d,
            LayerType::MaxPool1d,
            LayerType::Lstm,
            LayerType::Bidirectional,
            LayerType::Dense,
            LayerType::Dropout,
            LayerType::Flatten,
        ];
        Self {
            layer_types: layer_types.iter().map(|&t| (t, 1.0)).collect(),
            layer_count_weights: vec![0.7, 0.1, 0.1, 0.1],
            units: vec![16, 32, 64, 128, 256],
            filters: vec![16, 32, 64, 128],
            kernel_sizes: vec![1, 3, 5, 7],
            strides: vec![1, 2],
            dilation_rates: vec![1, 2, 3],
            pool_sizes: vec![2, 3, 4],
            embedding_dims: vec![50, 100, 200, 300],
            activations: ["relu", "tanh", "sigmoid", "elu"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            dropout_range: (0.0, 0.5),
            optimizers: vec!["adam".into(), "rmsprop".into()],
            learning_rates: vec![1e-4, 5e-4, 1e-3, 5e-3, 1e-2],
            decays: vec![0.0, 1e-6, 1e-5, 1e-4],
            batch_sizes: vec![16, 32, 64, 128, 256],
            epochs: vec![5, 10, 15, 20],
        }
    }
}

impl DistributionConfig {
    /// Replaces the layer pool; every type starts with unit mass.
    pub fn with_layer_types(mut self, types: &[LayerType]) -> Self {
        self.layer_types = types.iter().map(|&t| (t, 1.0)).collect();
        self
    }

    /// Sets the initial mass of one type, adding it to the pool if absent.
    pub fn with_layer_weight(mut self, layer_type: LayerType, weight: f64) -> Self {
        match self.layer_types.iter_mut().find(|(t, _)| *t == layer_type) {
            Some(entry) => entry.1 = weight,
            None => self.layer_types.push((layer_type, weight)),
        }
        self
    }

    pub fn with_layer_count_weights(mut self, weights: Vec<f64>) -> Self {
        self.layer_count_weights = weights;
        self
    }

    pub fn with_units(mut self, units: Vec<i64>) -> Self {
        self.units = units;
        self
    }

    pub fn with_filters(mut self, filters: Vec<i64>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_kernel_sizes(mut self, sizes: Vec<i64>) -> Self {
        self.kernel_sizes = sizes;
        self
    }

    pub fn with_activations(mut self, activations: &[&str]) -> Self {
        self.activations = activations.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_dropout_range(mut self, min: f64, max: f64) -> Self {
        let min = min.clamp(0.0, 1.0);
        self.dropout_range = (min, max.clamp(min, 1.0));
        self
    }

    pub fn with_optimizers(mut self, optimizers: &[&str]) -> Self {
        self.optimizers = optimizers.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_learning_rates(mut self, rates: Vec<f64>) -> Self {
        self.learning_rates = rates;
        self
    }

    pub fn with_batch_sizes(mut self, sizes: Vec<i64>) -> Self {
        self.batch_sizes = sizes;
        self
    }

    pub fn with_epochs(mut self, epochs: Vec<i64>) -> Self {
        self.epochs = epochs;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.layer_types.is_empty() {
            return Err("layer_types must not be empty".into());
        }
        for &(t, w) in &self.layer_types {
            if t.is_reserved() {
                return Err(format!("{t} layers cannot be sampled"));
            }
            if !(w >= 0.0 && w.is_finite()) {
                return Err(format!("weight of {t} must be non-negative, got {w}"));
            }
        }
        if self.layer_types.iter().map(|(_, w)| w).sum::<f64>() <= 0.0 {
            return Err("layer type weights must have positive total".into());
        }
        if self.layer_count_weights.iter().any(|w| !(*w >= 0.0 && w.is_finite()))
            || self.layer_count_weights.iter().sum::<f64>() <= 0.0
        {
            return Err("layer_count_weights must be non-negative with positive total".into());
        }

        let int_tables: [(&str, &[i64]); 8] = [
            ("units", self.units.as_slice()),
            ("filters", self.filters.as_slice()),
            ("kernel_sizes", self.kernel_sizes.as_slice()),
            ("strides", self.strides.as_slice()),
            ("dilation_rates", self.dilation_rates.as_slice()),
            ("pool_sizes", self.pool_sizes.as_slice()),
            ("embedding_dims", self.embedding_dims.as_slice()),
            ("batch_sizes", self.batch_sizes.as_slice()),
        ];
        for (name, table) in int_tables {
            if table.is_empty() {
                return Err(format!("{name} must not be empty"));
            }
            if let Some(v) = table.iter().find(|v| **v <= 0) {
                return Err(format!("{name} must be positive, got {v}"));
            }
        }
        if self.epochs.is_empty() || self.epochs.iter().any(|e| *e <= 0) {
            return Err("epochs must be non-empty and positive".into());
        }
        if self.activations.is_empty() || self.optimizers.is_empty() {
            return Err("activations and optimizers must not be empty".into());
        }
        if self.learning_rates.is_empty() || self.learning_rates.iter().any(|r| *r <= 0.0) {
            return Err("learning_rates must be non-empty and positive".into());
        }
        if self.decays.is_empty() || self.decays.iter().any(|d| *d < 0.0) {
            return Err("decays must be non-empty and non-negative".into());
        }
        let (lo, hi) = self.dropout_range;
        if !(0.0..1.0).contains(&lo) || hi < lo || hi > 1.0 {
            return Err(format!("dropout_range must satisfy 0 <= min <= max <= 1, got ({lo}, {hi})"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DistributionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.layer_count_weights, vec![0.7, 0.1, 0.1, 0.1]);
        assert!(config.layer_types.iter().all(|(t, _)| !t.is_reserved()));
    }

    #[test]
    fn test_validate_rejects_reserved_type() {
        let config = DistributionConfig::default().with_layer_weight(LayerType::Output, 1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_mass() {
        let config = DistributionConfig::default()
            .with_layer_types(&[LayerType::Dense])
            .with_layer_weight(LayerType::Dense, 0.0);
        assert!(config.validate().is_err());

        let config = DistributionConfig::default().with_layer_count_weights(vec![0.0]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_table() {
        let config = DistributionConfig::default().with_units(vec![]);
        let err = config.validate().unwrap_err();
        assert!(err.contains("units"));
    }

    #[test]
    fn test_dropout_range_is_clamped() {
        let config = DistributionConfig::default().with_dropout_range(0.3, 0.1);
        assert_eq!(config.dropout_range, (0.3, 0.3));
        assert!(config.validate().is_ok());
    }
}
