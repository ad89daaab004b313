//! Seeded random number generation.
//!
//! All stochastic paths in the crate take an injected `&mut R: Rng`. These
//! helpers produce the concrete generator so that runs are reproducible
//! from a single `u64` seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Creates a deterministic generator from a seed.
pub fn create_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Creates a generator from `seed`, or from fresh entropy when `None`.
pub fn rng_from_option(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => create_rng(s),
        None => create_rng(rand::random()),
    }
}

/// Picks one element uniformly, or `None` for an empty slice.
pub fn choose<'a, T, R: Rng>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        items.get(rng.random_range(0..items.len()))
    }
}

/// Roulette wheel selection over non-negative weights.
///
/// Returns `None` when the slice is empty or the total mass is not positive.
pub fn roulette_index<R: Rng>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || total <= 0.0 || !total.is_finite() {
        return None;
    }

    let mut roll = rng.random_range(0.0..total);
    for (i, &w) in weights.iter().enumerate() {
        roll -= w;
        if roll < 0.0 {
            return Some(i);
        }
    }
    // Floating point residue: fall back to the last index with mass.
    weights.iter().rposition(|&w| w > 0.0)
}
