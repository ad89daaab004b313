//! Mutation configuration.

use super::types::MutationKind;

/// Relative weights of the mutation kinds.
///
/// [`Mutator`](super::Mutator) draws one kind per call by roulette over
/// these weights. The default is uniform.
///
/// # Examples
///
/// ```
/// use u_neuroarch::mutation::{MutationConfig, MutationKind};
///
/// let config = MutationConfig::default()
///     .with_weight(MutationKind::ArchitectureAdd, 3.0)
///     .with_weight(MutationKind::TrainingAll, 0.0);
/// assert!(config.validate().is_ok());
///
/// let structural = MutationConfig::structural();
/// assert_eq!(structural.weight(MutationKind::TrainingPart), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MutationConfig {
    /// Weight per kind, indexed by [`MutationKind::index`].
    pub weights: [f64; MutationKind::ALL.len()],
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            weights: [1.0; MutationKind::ALL.len()],
        }
    }
}

impl MutationConfig {
    /// Only the listed kinds, with equal weight.
    pub fn only(kinds: &[MutationKind]) -> Self {
        let mut weights = [0.0; MutationKind::ALL.len()];
        for kind in kinds {
            weights[kind.index()] = 1.0;
        }
        Self { weights }
    }

    /// Graph-changing kinds only.
    pub fn structural() -> Self {
        let kinds: Vec<MutationKind> = MutationKind::ALL
            .into_iter()
            .filter(|k| k.is_structural())
            .collect();
        Self::only(&kinds)
    }

    pub fn with_weight(mut self, kind: MutationKind, weight: f64) -> Self {
        self.weights[kind.index()] = weight;
        self
    }

    pub fn weight(&self, kind: MutationKind) -> f64 {
        self.weights[kind.index()]
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        for kind in MutationKind::ALL {
            let w = self.weight(kind);
            if !(w >= 0.0 && w.is_finite()) {
                return Err(format!("weight of {kind} must be non-negative, got {w}"));
            }
        }
        if self.weights.iter().sum::<f64>() <= 0.0 {
            return Err("at least one mutation kind needs positive weight".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_uniform() {
        let config = MutationConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.weights.iter().all(|&w| (w - 1.0).abs() < 1e-10));
    }

    #[test]
    fn test_only() {
        let config = MutationConfig::only(&[MutationKind::ArchitectureRemove]);
        assert_eq!(config.weight(MutationKind::ArchitectureRemove), 1.0);
        assert_eq!(config.weights.iter().filter(|&&w| w > 0.0).count(), 1);
    }

    #[test]
    fn test_validate_rejects_negative_and_empty() {
        let config = MutationConfig::default().with_weight(MutationKind::TrainingAll, -1.0);
        assert!(config.validate().is_err());
        assert!(MutationConfig::only(&[]).validate().is_err());
    }

    #[test]
    fn test_structural_excludes_training() {
        let config = MutationConfig::structural();
        assert_eq!(config.weight(MutationKind::TrainingAll), 0.0);
        assert_eq!(config.weight(MutationKind::ArchitectureMerge), 1.0);
    }
}
