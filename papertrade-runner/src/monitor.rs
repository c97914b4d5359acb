//! Live-versus-backtest divergence monitoring.
//!
//! The promotion decision rests on backtest statistics; this module checks
//! whether the live session is actually delivering them. Accuracy blends how
//! closely the live return and win rate track their backtest counterparts,
//! and the verdict buckets that into consistent / drifting / diverged.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::metrics::PerformanceStats;

/// Floor for the relative-return denominator, so a near-zero expected return
/// does not amplify tiny absolute gaps into huge deviations.
const RETURN_SCALE_FLOOR: f64 = 0.01;

const CONSISTENT_ACCURACY: f64 = 0.8;
const DRIFTING_ACCURACY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivergenceVerdict {
    /// Live performance tracks the backtest.
    Consistent,
    /// Noticeable gap; keep trading but re-optimize soon.
    Drifting,
    /// Live behavior no longer resembles the backtest.
    Diverged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceReport {
    pub live_return: f64,
    pub expected_return: f64,
    /// Absolute return gap relative to the expected return, in percent.
    pub deviation_pct: f64,
    pub return_accuracy: f64,
    pub win_rate_accuracy: f64,
    /// Mean of the two accuracy components, in [0, 1].
    pub accuracy: f64,
    pub verdict: DivergenceVerdict,
}

/// Compare a live session's statistics against the backtest that promoted
/// the strategy.
pub fn compare(live: &PerformanceStats, expected: &PerformanceStats) -> DivergenceReport {
    let gap = (live.total_return - expected.total_return).abs();
    let scale = expected.total_return.abs().max(RETURN_SCALE_FLOOR);
    let deviation_pct = gap / scale * 100.0;

    let return_accuracy = (1.0 - (gap / scale).min(1.0)).clamp(0.0, 1.0);
    let win_rate_accuracy = (1.0 - (live.win_rate - expected.win_rate).abs()).clamp(0.0, 1.0);
    let accuracy = (return_accuracy + win_rate_accuracy) / 2.0;

    let verdict = if accuracy >= CONSISTENT_ACCURACY {
        DivergenceVerdict::Consistent
    } else if accuracy >= DRIFTING_ACCURACY {
        DivergenceVerdict::Drifting
    } else {
        DivergenceVerdict::Diverged
    };

    if verdict != DivergenceVerdict::Consistent {
        warn!(
            live_return = live.total_return,
            expected_return = expected.total_return,
            accuracy,
            ?verdict,
            "live performance deviates from backtest"
        );
    }

    DivergenceReport {
        live_return: live.total_return,
        expected_return: expected.total_return,
        deviation_pct,
        return_accuracy,
        win_rate_accuracy,
        accuracy,
        verdict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(total_return: f64, win_rate: f64) -> PerformanceStats {
        PerformanceStats {
            total_return,
            annualized_return: total_return,
            sharpe: 1.0,
            max_drawdown: -0.05,
            win_rate,
            profit_factor: 1.5,
            trade_count: 30,
            avg_trade_pnl: 10.0,
            max_consecutive_losses: 2,
        }
    }

    #[test]
    fn identical_stats_are_consistent() {
        let r = compare(&stats(0.10, 0.55), &stats(0.10, 0.55));
        assert_eq!(r.verdict, DivergenceVerdict::Consistent);
        assert_eq!(r.accuracy, 1.0);
        assert_eq!(r.deviation_pct, 0.0);
    }

    #[test]
    fn small_gap_stays_consistent() {
        let r = compare(&stats(0.095, 0.52), &stats(0.10, 0.55));
        assert_eq!(r.verdict, DivergenceVerdict::Consistent);
        assert!(r.accuracy > 0.9);
    }

    #[test]
    fn opposite_sign_return_diverges() {
        let r = compare(&stats(-0.10, 0.30), &stats(0.10, 0.60));
        assert_eq!(r.verdict, DivergenceVerdict::Diverged);
        assert_eq!(r.return_accuracy, 0.0);
    }

    #[test]
    fn moderate_gap_is_drifting() {
        // Return gap eats most of the return accuracy; win rate still close.
        let r = compare(&stats(0.03, 0.52), &stats(0.10, 0.55));
        assert_eq!(r.verdict, DivergenceVerdict::Drifting);
    }

    #[test]
    fn near_zero_expected_return_uses_floor() {
        // Expected 0.1% return, live 0.2%: tiny absolute gap must not read
        // as a 100% deviation.
        let r = compare(&stats(0.002, 0.5), &stats(0.001, 0.5));
        assert!(r.deviation_pct <= 10.0 + 1e-9);
        assert_eq!(r.verdict, DivergenceVerdict::Consistent);
    }

    #[test]
    fn accuracy_is_mean_of_components() {
        let r = compare(&stats(0.10, 0.25), &stats(0.10, 0.75));
        assert_eq!(r.return_accuracy, 1.0);
        assert!((r.win_rate_accuracy - 0.5).abs() < 1e-12);
        assert!((r.accuracy - 0.75).abs() < 1e-12);
    }
}
