//! Neuro-evolution core for branch-structured network architectures.
//!
//! Provides the pieces an evolutionary search over neural architectures
//! needs below its outer loop:
//!
//! - **Layers**: typed layer descriptors with schema-checked configs.
//! - **Graph**: a directed acyclic architecture graph grown through open
//!   branches, with split/merge, removal, history and lineage.
//! - **Scheduling**: deferred topological build order in which joins wait
//!   for every predecessor, plus a [`Materializer`](schedule::Materializer)
//!   seam for the tensor backend.
//! - **Mutation**: weighted structural and hyperparameter operators.
//! - **Crossover**: cut-and-splice recombination of two parents.
//! - **Distribution**: the sampling service all random choices go through.
//!
//! # Architecture
//!
//! The crate holds no tensor code and runs no training. Evaluation, the
//! population loop and distribution across workers are owned by consumers.
//! Every stochastic call takes an injected `&mut impl Rng`, so a run is
//! reproducible from one seed.
//!
//! # Example
//!
//! ```
//! use u_neuroarch::distribution::AdaptiveDistribution;
//! use u_neuroarch::individual::{Individual, IndividualOptions};
//! use u_neuroarch::mutation::Mutator;
//! use u_neuroarch::random::create_rng;
//!
//! let mut dist = AdaptiveDistribution::default();
//! let mut rng = create_rng(42);
//! let mut a = Individual::random("a", 0, IndividualOptions::default(), &mut dist, &mut rng)?;
//! let b = Individual::random("b", 0, IndividualOptions::default(), &mut dist, &mut rng)?;
//!
//! let mutator = Mutator::default();
//! let _ = mutator.mutate(&mut a, 1, &mut rng, &mut dist);
//!
//! let child = Individual::crossing("c", 1, &a, &b, &mut rng)?;
//! let plan = child.plan()?;
//! assert_eq!(plan.output(), child.graph().finisher());
//! # Ok::<(), u_neuroarch::ArchError>(())
//! ```

pub mod crossover;
pub mod distribution;
pub mod error;
pub mod graph;
pub mod individual;
pub mod layer;
pub mod mutation;
pub mod random;
pub mod schedule;

pub use error::{ArchError, ArchResult};
