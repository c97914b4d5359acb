//! Composite scoring and candidate ranking.
//!
//! The composite score blends four normalized components into a single value
//! in [0, 1], so strategies from different families are comparable:
//!
//!   return   — total return clamped to [0, 1] (100% return saturates)
//!   sharpe   — Sharpe ratio / 3, clamped (a Sharpe of 3 saturates)
//!   win rate — already a fraction
//!   activity — trade count / 100, clamped (thin samples score low)
//!
//! Ties rank by smaller absolute drawdown, then by discovery order, so a
//! ranking over the same candidates is always identical.

use serde::{Deserialize, Serialize};

use crate::metrics::PerformanceStats;
use papertrade_core::strategy::Strategy;

const WEIGHT_RETURN: f64 = 0.35;
const WEIGHT_SHARPE: f64 = 0.30;
const WEIGHT_WIN_RATE: f64 = 0.20;
const WEIGHT_ACTIVITY: f64 = 0.15;

const SHARPE_SATURATION: f64 = 3.0;
const ACTIVITY_SATURATION: f64 = 100.0;

/// Composite score in [0, 1]. Non-finite inputs score 0.
pub fn composite_score(stats: &PerformanceStats) -> f64 {
    if !stats.total_return.is_finite() || !stats.sharpe.is_finite() || !stats.win_rate.is_finite()
    {
        return 0.0;
    }
    let return_score = stats.total_return.clamp(0.0, 1.0);
    let sharpe_score = (stats.sharpe / SHARPE_SATURATION).clamp(0.0, 1.0);
    let win_score = stats.win_rate.clamp(0.0, 1.0);
    let activity_score = (stats.trade_count as f64 / ACTIVITY_SATURATION).clamp(0.0, 1.0);

    WEIGHT_RETURN * return_score
        + WEIGHT_SHARPE * sharpe_score
        + WEIGHT_WIN_RATE * win_score
        + WEIGHT_ACTIVITY * activity_score
}

/// A strategy with its backtest statistics and composite score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub strategy: Strategy,
    pub stats: PerformanceStats,
    pub score: f64,
    /// Position in the candidate generation order; the final ranking
    /// tie-breaker.
    pub discovery_index: usize,
}

impl ScoredCandidate {
    pub fn new(strategy: Strategy, stats: PerformanceStats, discovery_index: usize) -> Self {
        let score = composite_score(&stats);
        Self {
            strategy,
            stats,
            score,
            discovery_index,
        }
    }
}

/// Rank candidates best first: score descending, then smaller absolute
/// drawdown, then discovery order. Duplicate strategy ids keep only the
/// first-discovered instance.
pub fn rank(mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    candidates.sort_by(|a, b| a.discovery_index.cmp(&b.discovery_index));
    let mut seen = std::collections::BTreeSet::new();
    candidates.retain(|c| seen.insert(c.strategy.id.clone()));

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.stats
                    .max_drawdown
                    .abs()
                    .partial_cmp(&b.stats.max_drawdown.abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.discovery_index.cmp(&b.discovery_index))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use papertrade_core::strategy::{MomentumConfig, StrategyKind};

    fn stats(total_return: f64, sharpe: f64, win_rate: f64, trades: usize) -> PerformanceStats {
        PerformanceStats {
            total_return,
            annualized_return: total_return,
            sharpe,
            max_drawdown: -0.05,
            win_rate,
            profit_factor: 1.5,
            trade_count: trades,
            avg_trade_pnl: 10.0,
            max_consecutive_losses: 2,
        }
    }

    fn strategy(lookback: usize) -> Strategy {
        Strategy::new(StrategyKind::Momentum(MomentumConfig {
            lookback,
            threshold: 0.02,
        }))
    }

    // ── composite score ──

    #[test]
    fn score_is_bounded() {
        assert!((composite_score(&stats(5.0, 10.0, 1.0, 1_000)) - 1.0).abs() < 1e-9);
        assert_eq!(composite_score(&stats(-0.5, -2.0, 0.0, 0)), 0.0);
    }

    #[test]
    fn score_components_saturate() {
        // Doubling an already saturated component changes nothing.
        let a = composite_score(&stats(1.0, 1.0, 0.5, 50));
        let b = composite_score(&stats(2.0, 1.0, 0.5, 50));
        assert_eq!(a, b);
    }

    #[test]
    fn better_stats_score_higher() {
        let weak = composite_score(&stats(0.05, 0.5, 0.40, 20));
        let strong = composite_score(&stats(0.40, 2.0, 0.60, 80));
        assert!(strong > weak);
    }

    #[test]
    fn nan_stats_score_zero() {
        assert_eq!(composite_score(&stats(f64::NAN, 1.0, 0.5, 10)), 0.0);
        assert_eq!(composite_score(&stats(0.1, f64::INFINITY, 0.5, 10)), 0.0);
    }

    #[test]
    fn thin_samples_are_penalized() {
        let thin = composite_score(&stats(0.30, 2.0, 0.60, 3));
        let thick = composite_score(&stats(0.30, 2.0, 0.60, 90));
        assert!(thick > thin);
    }

    // ── ranking ──

    #[test]
    fn ranking_is_best_first() {
        let ranked = rank(vec![
            ScoredCandidate::new(strategy(5), stats(0.05, 0.5, 0.4, 20), 0),
            ScoredCandidate::new(strategy(6), stats(0.50, 2.5, 0.7, 80), 1),
            ScoredCandidate::new(strategy(7), stats(0.20, 1.0, 0.5, 40), 2),
        ]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(ranked[0].discovery_index, 1);
    }

    #[test]
    fn tie_breaks_by_drawdown_then_discovery() {
        let s = stats(0.20, 1.0, 0.5, 40);
        let mut deep = s.clone();
        deep.max_drawdown = -0.30;
        let mut shallow = s.clone();
        shallow.max_drawdown = -0.02;

        let ranked = rank(vec![
            ScoredCandidate::new(strategy(5), deep, 0),
            ScoredCandidate::new(strategy(6), shallow, 1),
        ]);
        // Same score; the shallower drawdown wins despite later discovery.
        assert_eq!(ranked[0].discovery_index, 1);

        let ranked = rank(vec![
            ScoredCandidate::new(strategy(7), s.clone(), 0),
            ScoredCandidate::new(strategy(8), s, 1),
        ]);
        // Full tie: discovery order decides.
        assert_eq!(ranked[0].discovery_index, 0);
    }

    #[test]
    fn duplicate_ids_keep_first_discovered() {
        let ranked = rank(vec![
            ScoredCandidate::new(strategy(5), stats(0.10, 1.0, 0.5, 40), 0),
            ScoredCandidate::new(strategy(5), stats(0.50, 2.0, 0.7, 80), 1),
        ]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].discovery_index, 0);
    }

    #[test]
    fn ranking_is_deterministic() {
        let mk = || {
            vec![
                ScoredCandidate::new(strategy(5), stats(0.05, 0.5, 0.4, 20), 0),
                ScoredCandidate::new(strategy(6), stats(0.50, 2.5, 0.7, 80), 1),
                ScoredCandidate::new(strategy(7), stats(0.20, 1.0, 0.5, 40), 2),
                ScoredCandidate::new(strategy(8), stats(0.20, 1.0, 0.5, 40), 3),
            ]
        };
        let a: Vec<usize> = rank(mk()).iter().map(|c| c.discovery_index).collect();
        let b: Vec<usize> = rank(mk()).iter().map(|c| c.discovery_index).collect();
        assert_eq!(a, b);
    }
}
