//! Training hyperparameter map.

use crate::distribution::{LayerDistribution, TrainingParam};
use crate::layer::ParamValue;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Training hyperparameters of one individual.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingParams(BTreeMap<TrainingParam, ParamValue>);

impl TrainingParams {
    /// Draws every parameter from `dist`.
    pub fn sample<R: Rng, D: LayerDistribution>(dist: &mut D, rng: &mut R) -> Self {
        TrainingParam::ALL
            .into_iter()
            .map(|p| (p, dist.sample_training_param(p, rng)))
            .collect()
    }

    pub fn get(&self, param: TrainingParam) -> Option<&ParamValue> {
        self.0.get(&param)
    }

    /// Sets a value and returns the previous one.
    pub fn set(&mut self, param: TrainingParam, value: ParamValue) -> Option<ParamValue> {
        self.0.insert(param, value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TrainingParam, &ParamValue)> + '_ {
        self.0.iter().map(|(&p, v)| (p, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(TrainingParam, ParamValue)> for TrainingParams {
    fn from_iter<I: IntoIterator<Item = (TrainingParam, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::AdaptiveDistribution;
    use crate::random::create_rng;

    #[test]
    fn test_sample_fills_every_param() {
        let mut dist = AdaptiveDistribution::default();
        let mut rng = create_rng(42);
        let params = TrainingParams::sample(&mut dist, &mut rng);
        assert_eq!(params.len(), TrainingParam::ALL.len());
        assert!(params
            .get(TrainingParam::Optimizer)
            .and_then(ParamValue::as_text)
            .is_some());
    }

    #[test]
    fn test_json_uses_param_names() {
        let mut params = TrainingParams::default();
        params.set(TrainingParam::BatchSize, ParamValue::Int(32));
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, "{\"batch_size\":32}");
        let back: TrainingParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
