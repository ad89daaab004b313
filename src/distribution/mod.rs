//! Layer and hyperparameter sampling.
//!
//! Mutation operators and random initialisation never pick layer types or
//! parameter values themselves; they ask a [`LayerDistribution`]. The
//! service is an owned value passed by `&mut`, so its adaptive state stays
//! with the caller and runs are reproducible under a fixed seed.

mod adaptive;
mod config;
mod types;

pub use adaptive::AdaptiveDistribution;
pub use config::DistributionConfig;
pub use types::{LayerDistribution, TrainingParam};
