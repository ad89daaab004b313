//! Crossover of architecture graphs.
//!
//! [`crossover`] cuts each parent at a point every path passes through and
//! splices the front of one onto the back of the other. See [`cut_points`]
//! for which nodes qualify.

mod splice;

pub use splice::{crossover, cut_points, splice};
