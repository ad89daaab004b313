//! Mutation operators over individuals.
//!
//! Six structural operators edit the architecture graph through its
//! transactional calls; two more redraw training hyperparameters.
//! [`Mutator`] draws one kind per call by weighted roulette and appends a
//! [`MutationRecord`](crate::graph::MutationRecord) to the graph history.
//!
//! # Key Types
//!
//! - [`MutationKind`]: the closed operator set
//! - [`MutationConfig`]: per-kind roulette weights
//! - [`Mutator`]: applies one weighted-random mutation
//!
//! Operators that find nothing eligible (no removable node, fewer than two
//! open branches to merge) return [`ArchError::NothingToMutate`](crate::ArchError::NothingToMutate)
//! and leave the individual untouched.

mod config;
mod operators;
mod runner;
mod types;

pub use config::MutationConfig;
pub use operators::{
    mutable_nodes, mutate_architecture_add, mutate_architecture_merge,
    mutate_architecture_parameters, mutate_architecture_part, mutate_architecture_remove,
    mutate_architecture_split, mutate_training_all, mutate_training_part,
};
pub use runner::Mutator;
pub use types::{Affected, MutationKind};
