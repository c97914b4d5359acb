//! MACD signal-line cross.
//!
//! Emits on the candle where the MACD line crosses its signal line; confidence
//! scales with the histogram magnitude relative to price, saturating once the
//! gap reaches 0.2% of price.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::{indicators, perturb};
use crate::domain::Direction;

const SATURATION_FRACTION: f64 = 0.002;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdConfig {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl MacdConfig {
    pub fn perturb(&self, rng: &mut StdRng) -> MacdConfig {
        let fast = perturb::jitter_usize(rng, self.fast, 3, 3, 30);
        // Keep the fast period strictly inside the slow one.
        let slow = perturb::jitter_usize(rng, self.slow, 4, fast + 2, 60);
        MacdConfig {
            fast,
            slow,
            signal: perturb::jitter_usize(rng, self.signal, 2, 2, 20),
        }
    }
}

pub(super) fn decide(cfg: &MacdConfig, closes: &[f64]) -> (Direction, f64) {
    let (line, sig, hist) = indicators::macd(closes, cfg.fast, cfg.slow, cfg.signal);
    let n = closes.len();
    if n < 2 {
        return (Direction::Flat, 0.0);
    }
    let (curr_line, curr_sig) = (line[n - 1], sig[n - 1]);
    let (prev_line, prev_sig) = (line[n - 2], sig[n - 2]);
    if curr_line.is_nan() || curr_sig.is_nan() || prev_line.is_nan() || prev_sig.is_nan() {
        return (Direction::Flat, 0.0);
    }

    let crossed_up = prev_line <= prev_sig && curr_line > curr_sig;
    let crossed_down = prev_line >= prev_sig && curr_line < curr_sig;
    if !crossed_up && !crossed_down {
        return (Direction::Flat, 0.0);
    }

    let price = closes[n - 1];
    let confidence = (hist[n - 1].abs() / (price * SATURATION_FRACTION)).min(1.0);
    if crossed_up {
        (Direction::Long, confidence)
    } else {
        (Direction::Short, confidence)
    }
}
