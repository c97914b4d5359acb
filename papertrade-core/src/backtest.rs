//! Historical replay of one strategy over a candle series.
//!
//! Each backtest gets its own isolated ledger and walks the series through
//! the same `run_tick` pipeline the live loop uses. Any position still open
//! when the series ends is closed at the final close so every report accounts
//! for its full equity in realized terms.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Candle, ExitReason, Portfolio, StrategyId};
use crate::ledger::Ledger;
use crate::pipeline::run_tick;
use crate::risk::RiskPolicy;
use crate::strategy::Strategy;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("insufficient history: strategy needs {required} candles, got {available}")]
    InsufficientHistory { required: usize, available: usize },
}

/// Outcome of one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub strategy_id: StrategyId,
    pub portfolio: Portfolio,
    pub final_equity: f64,
    pub candles: usize,
}

impl BacktestReport {
    pub fn total_return(&self) -> f64 {
        (self.final_equity - self.portfolio.starting_balance) / self.portfolio.starting_balance
    }
}

/// Replay `candles` under `policy` and return the resulting portfolio.
pub fn run_backtest(
    strategy: &Strategy,
    policy: &RiskPolicy,
    candles: &[Candle],
) -> Result<BacktestReport, BacktestError> {
    let required = strategy.kind.min_window();
    if candles.len() < required {
        return Err(BacktestError::InsufficientHistory {
            required,
            available: candles.len(),
        });
    }

    let lookback = strategy.kind.lookback_window();
    let mut ledger = Ledger::new(policy.clone());
    for end in 1..=candles.len() {
        let start = end.saturating_sub(lookback);
        run_tick(&mut ledger, strategy, &candles[start..end]);
    }

    // Settle whatever is still open at the last close.
    if ledger.has_position() {
        let last = &candles[candles.len() - 1];
        let _ = ledger.close_position(last.close, last.timestamp, ExitReason::SignalClose);
    }

    let final_equity = ledger.portfolio().cash;
    Ok(BacktestReport {
        strategy_id: strategy.id.clone(),
        portfolio: ledger.portfolio().clone(),
        final_equity,
        candles: candles.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timeframe;
    use crate::strategy::{MomentumConfig, StrategyKind};
    use chrono::{Duration, TimeZone, Utc};

    fn candles(closes: &[f64]) -> Vec<Candle> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                Candle {
                    timestamp: t0 + Duration::minutes(i as i64),
                    timeframe: Timeframe::M1,
                    open,
                    high: open.max(close),
                    low: open.min(close),
                    close,
                    volume: 50.0,
                }
            })
            .collect()
    }

    fn strategy() -> Strategy {
        Strategy::new(StrategyKind::Momentum(MomentumConfig {
            lookback: 3,
            threshold: 0.01,
        }))
    }

    fn policy() -> RiskPolicy {
        RiskPolicy::new(100_000.0, 0.20, 0.20, 0.30, 0.60, 0.0).unwrap()
    }

    #[test]
    fn short_series_is_a_typed_error() {
        let err = run_backtest(&strategy(), &policy(), &candles(&[100.0, 101.0])).unwrap_err();
        assert_eq!(
            err,
            BacktestError::InsufficientHistory {
                required: 4,
                available: 2
            }
        );
    }

    #[test]
    fn trending_series_ends_profitable() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 * 1.02_f64.powi(i)).collect();
        let report = run_backtest(&strategy(), &policy(), &candles(&closes)).unwrap();
        assert!(report.total_return() > 0.0);
        assert!(!report.portfolio.has_position(), "end-of-run settles opens");
        assert!(!report.portfolio.trades.is_empty());
    }

    #[test]
    fn report_is_deterministic() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.4).sin() * 6.0).collect();
        let series = candles(&closes);
        let a = run_backtest(&strategy(), &policy(), &series).unwrap();
        let b = run_backtest(&strategy(), &policy(), &series).unwrap();
        assert_eq!(a.final_equity, b.final_equity);
        assert_eq!(a.portfolio.trades, b.portfolio.trades);
    }

    #[test]
    fn flat_series_preserves_balance() {
        let report = run_backtest(&strategy(), &policy(), &candles(&[100.0; 30])).unwrap();
        assert_eq!(report.final_equity, 100_000.0);
        assert!(report.portfolio.trades.is_empty());
    }

    #[test]
    fn isolated_ledgers_do_not_interact() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 * 1.02_f64.powi(i)).collect();
        let series = candles(&closes);
        let first = run_backtest(&strategy(), &policy(), &series).unwrap();
        // A second run starts from the full starting balance again.
        let second = run_backtest(&strategy(), &policy(), &series).unwrap();
        assert_eq!(first.portfolio.starting_balance, 100_000.0);
        assert_eq!(second.portfolio.starting_balance, 100_000.0);
        assert_eq!(first.final_equity, second.final_equity);
    }
}
