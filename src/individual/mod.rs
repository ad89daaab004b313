//! Population members.
//!
//! An [`Individual`] pairs an architecture graph with its training
//! hyperparameters and the data options it was created for. Random
//! creation and crossing are the two ways to obtain one; the outer search
//! loop owns everything else.

mod config;
mod member;
mod types;

pub use config::{DataKind, IndividualOptions};
pub use member::Individual;
pub use types::TrainingParams;
