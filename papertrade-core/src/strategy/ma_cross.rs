//! Moving-average cross, in simple and exponential flavors.
//!
//! Long when the fast average crosses above the slow one, short on the cross
//! down. Confidence scales with the spread between the averages as a fraction
//! of price, saturating at 0.5%.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::{indicators, perturb};
use crate::domain::Direction;

const SATURATION_FRACTION: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaKind {
    Sma,
    Ema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaCrossConfig {
    pub fast: usize,
    pub slow: usize,
    pub ma: MaKind,
}

impl MaCrossConfig {
    pub fn perturb(&self, rng: &mut StdRng) -> MaCrossConfig {
        let fast = perturb::jitter_usize(rng, self.fast, 3, 2, 40);
        let slow = perturb::jitter_usize(rng, self.slow, 5, fast + 2, 100);
        MaCrossConfig {
            fast,
            slow,
            ma: self.ma,
        }
    }
}

pub(super) fn decide(cfg: &MaCrossConfig, closes: &[f64]) -> (Direction, f64) {
    let (fast, slow) = match cfg.ma {
        MaKind::Sma => (
            indicators::sma(closes, cfg.fast),
            indicators::sma(closes, cfg.slow),
        ),
        MaKind::Ema => (
            indicators::ema(closes, cfg.fast),
            indicators::ema(closes, cfg.slow),
        ),
    };
    let n = closes.len();
    if n < 2 {
        return (Direction::Flat, 0.0);
    }
    let (cf, cs, pf, ps) = (fast[n - 1], slow[n - 1], fast[n - 2], slow[n - 2]);
    if cf.is_nan() || cs.is_nan() || pf.is_nan() || ps.is_nan() {
        return (Direction::Flat, 0.0);
    }

    let crossed_up = pf <= ps && cf > cs;
    let crossed_down = pf >= ps && cf < cs;
    if !crossed_up && !crossed_down {
        return (Direction::Flat, 0.0);
    }

    let confidence = ((cf - cs).abs() / (closes[n - 1] * SATURATION_FRACTION)).min(1.0);
    if crossed_up {
        (Direction::Long, confidence)
    } else {
        (Direction::Short, confidence)
    }
}
