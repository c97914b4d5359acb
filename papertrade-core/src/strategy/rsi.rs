//! RSI mean reversion: buy oversold, sell overbought.
//!
//! Confidence scales with how far past the threshold the oscillator sits, so
//! an RSI of 15 against an oversold line of 30 is a stronger long than 29.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::{indicators, perturb};
use crate::domain::Direction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiConfig {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
}

impl RsiConfig {
    pub fn perturb(&self, rng: &mut StdRng) -> RsiConfig {
        let oversold = perturb::jitter_f64(rng, self.oversold, 5.0, 10.0, 45.0);
        let overbought = perturb::jitter_f64(rng, self.overbought, 5.0, 55.0, 90.0);
        RsiConfig {
            period: perturb::jitter_usize(rng, self.period, 3, 2, 50),
            oversold,
            overbought,
        }
    }
}

pub(super) fn decide(cfg: &RsiConfig, closes: &[f64]) -> (Direction, f64) {
    let series = indicators::rsi(closes, cfg.period);
    let Some(&value) = series.last() else {
        return (Direction::Flat, 0.0);
    };
    if value.is_nan() {
        return (Direction::Flat, 0.0);
    }
    if value < cfg.oversold {
        let confidence = (cfg.oversold - value) / cfg.oversold;
        (Direction::Long, confidence)
    } else if value > cfg.overbought {
        let confidence = (value - cfg.overbought) / (100.0 - cfg.overbought);
        (Direction::Short, confidence)
    } else {
        (Direction::Flat, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> RsiConfig {
        RsiConfig {
            period: 3,
            oversold: 30.0,
            overbought: 70.0,
        }
    }

    #[test]
    fn steady_decline_goes_long() {
        let closes: Vec<f64> = (0..10).map(|i| 110.0 - i as f64).collect();
        let (dir, conf) = decide(&cfg(), &closes);
        assert_eq!(dir, Direction::Long);
        assert!(conf > 0.9);
    }

    #[test]
    fn steady_rally_goes_short() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let (dir, conf) = decide(&cfg(), &closes);
        assert_eq!(dir, Direction::Short);
        assert!(conf > 0.9);
    }

    #[test]
    fn neutral_oscillator_stays_flat() {
        // Alternating closes keep RSI near 50.
        let closes = [100.0, 101.0, 100.0, 101.0, 100.0, 101.0, 100.0];
        let (dir, conf) = decide(&cfg(), &closes);
        assert_eq!(dir, Direction::Flat);
        assert_eq!(conf, 0.0);
    }

    #[test]
    fn warmup_is_flat() {
        let (dir, _) = decide(&cfg(), &[100.0, 99.0]);
        assert_eq!(dir, Direction::Flat);
    }
}
