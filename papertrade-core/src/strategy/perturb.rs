//! Parameter jitter helpers for neighborhood search.
//!
//! Perturbation moves each parameter a small step and clamps it back into its
//! valid range, so every perturbed config is itself evaluable.

use rand::rngs::StdRng;
use rand::Rng;

/// Shift an integer parameter by up to `step` in either direction, clamped.
pub fn jitter_usize(rng: &mut StdRng, value: usize, step: usize, min: usize, max: usize) -> usize {
    let delta = rng.gen_range(-(step as i64)..=step as i64);
    let moved = value as i64 + delta;
    moved.clamp(min as i64, max as i64) as usize
}

/// Shift a float parameter by up to `step` in either direction, clamped.
pub fn jitter_f64(rng: &mut StdRng, value: f64, step: f64, min: f64, max: f64) -> f64 {
    let delta = rng.gen_range(-step..=step);
    (value + delta).clamp(min, max)
}
