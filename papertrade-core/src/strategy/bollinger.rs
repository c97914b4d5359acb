//! Bollinger band mean reversion.
//!
//! Long when the close breaks below the lower band, short above the upper.
//! Confidence is the overshoot beyond the band as a fraction of the band
//! half-width.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::{indicators, perturb};
use crate::domain::Direction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BollingerConfig {
    pub period: usize,
    pub std_dev: f64,
}

impl BollingerConfig {
    pub fn perturb(&self, rng: &mut StdRng) -> BollingerConfig {
        BollingerConfig {
            period: perturb::jitter_usize(rng, self.period, 4, 5, 60),
            std_dev: perturb::jitter_f64(rng, self.std_dev, 0.3, 1.0, 3.5),
        }
    }
}

pub(super) fn decide(cfg: &BollingerConfig, closes: &[f64]) -> (Direction, f64) {
    let mid = indicators::sma(closes, cfg.period);
    let sd = indicators::rolling_std(closes, cfg.period);
    let n = closes.len();
    if n == 0 {
        return (Direction::Flat, 0.0);
    }
    let (m, s) = (mid[n - 1], sd[n - 1]);
    if m.is_nan() || s.is_nan() || s == 0.0 {
        return (Direction::Flat, 0.0);
    }

    let half_width = cfg.std_dev * s;
    let upper = m + half_width;
    let lower = m - half_width;
    let close = closes[n - 1];

    if close < lower {
        let confidence = ((lower - close) / half_width).min(1.0);
        (Direction::Long, confidence)
    } else if close > upper {
        let confidence = ((close - upper) / half_width).min(1.0);
        (Direction::Short, confidence)
    } else {
        (Direction::Flat, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A lone outlier in a five-bar window reaches at most sqrt(4) = 2 population
    // sigmas, so the test multiplier must sit below 2 to be breachable.
    fn cfg() -> BollingerConfig {
        BollingerConfig {
            period: 5,
            std_dev: 1.5,
        }
    }

    #[test]
    fn plunge_below_lower_band_goes_long() {
        let (dir, conf) = decide(&cfg(), &[100.0, 100.5, 99.5, 100.2, 100.0, 90.0]);
        assert_eq!(dir, Direction::Long);
        assert!(conf > 0.0);
    }

    #[test]
    fn spike_above_upper_band_goes_short() {
        let (dir, conf) = decide(&cfg(), &[100.0, 100.5, 99.5, 100.2, 100.0, 112.0]);
        assert_eq!(dir, Direction::Short);
        assert!(conf > 0.0);
    }

    #[test]
    fn inside_the_bands_is_flat() {
        let (dir, _) = decide(&cfg(), &[100.0, 100.5, 99.5, 100.2, 100.0, 100.3]);
        assert_eq!(dir, Direction::Flat);
    }

    #[test]
    fn flat_series_has_no_band_width() {
        // Zero standard deviation: refuse to signal rather than divide by it.
        let (dir, _) = decide(&cfg(), &[100.0; 8]);
        assert_eq!(dir, Direction::Flat);
    }

    #[test]
    fn warmup_is_flat() {
        let (dir, _) = decide(&cfg(), &[100.0, 101.0, 99.0]);
        assert_eq!(dir, Direction::Flat);
    }
}
