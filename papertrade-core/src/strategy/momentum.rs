//! Rate-of-change momentum.
//!
//! Long when the return over `lookback` candles exceeds `threshold`, short
//! when it falls below the negative threshold. Confidence reaches 1.0 at
//! twice the threshold.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::perturb;
use crate::domain::Direction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumConfig {
    pub lookback: usize,
    pub threshold: f64,
}

impl MomentumConfig {
    pub fn perturb(&self, rng: &mut StdRng) -> MomentumConfig {
        MomentumConfig {
            lookback: perturb::jitter_usize(rng, self.lookback, 3, 2, 60),
            threshold: perturb::jitter_f64(rng, self.threshold, 0.005, 0.002, 0.10),
        }
    }
}

pub(super) fn decide(cfg: &MomentumConfig, closes: &[f64]) -> (Direction, f64) {
    let n = closes.len();
    if n < cfg.lookback + 1 {
        return (Direction::Flat, 0.0);
    }
    let base = closes[n - 1 - cfg.lookback];
    if base <= 0.0 {
        return (Direction::Flat, 0.0);
    }
    let roc = closes[n - 1] / base - 1.0;
    let confidence = (roc.abs() / (2.0 * cfg.threshold)).min(1.0);
    if roc > cfg.threshold {
        (Direction::Long, confidence)
    } else if roc < -cfg.threshold {
        (Direction::Short, confidence)
    } else {
        (Direction::Flat, 0.0)
    }
}
