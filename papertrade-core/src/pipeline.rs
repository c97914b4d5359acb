//! Per-candle decision pipeline.
//!
//! `run_tick` is the single code path for advancing a ledger by one candle.
//! Live trading and backtesting both call it, so a strategy backtests under
//! exactly the rules it trades under.
//!
//! Order of operations within one tick:
//! 1. protective exits against the candle's full range
//! 2. strategy evaluation over the history ending at this candle
//! 3. close on an opposing signal (at the candle close)
//! 4. entry attempt if flat and the signal is actionable
//! 5. mark to market at the candle close
//!
//! Exits run before entries, so a tick can close one position and open the
//! next. A flip (opposing signal against an open position) only closes; the
//! re-entry happens on a later tick if the signal persists.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::domain::{Candle, ExitReason, Signal, Trade};
use crate::ledger::Ledger;
use crate::risk::OrderRejection;
use crate::strategy::Strategy;

/// Everything that happened during one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOutcome {
    /// Trade closed this tick, by protective exit or opposing signal.
    pub exit: Option<Trade>,
    /// The signal the strategy emitted for this candle.
    pub signal: Signal,
    /// Whether a new position was opened this tick.
    pub opened: bool,
    /// Why the signal did not open a position, when it did not.
    pub rejection: Option<OrderRejection>,
}

/// Advance `ledger` by one candle.
///
/// `history` must end with the current candle and contain every candle the
/// strategy may look back over.
pub fn run_tick(ledger: &mut Ledger, strategy: &Strategy, history: &[Candle]) -> TickOutcome {
    let candle = match history.last() {
        Some(c) => c,
        None => {
            return TickOutcome {
                exit: None,
                signal: Signal::flat(strategy.id.clone(), chrono::Utc::now()),
                opened: false,
                rejection: None,
            }
        }
    };

    let mut exit = ledger.check_exits(candle);
    let signal = strategy.evaluate(history);

    // Opposing signal closes the survivor at the candle close. The flip only
    // closes; re-entry in the new direction waits for a later tick.
    let mut flipped = false;
    if exit.is_none() && ledger.has_position() {
        let open_direction = ledger
            .portfolio()
            .position
            .as_ref()
            .map(|p| p.order.direction);
        if let Some(dir) = open_direction {
            if signal.direction.opposes(dir) {
                exit = ledger
                    .close_position(candle.close, candle.timestamp, ExitReason::SignalClose)
                    .ok();
                flipped = exit.is_some();
            }
        }
    }

    let mut opened = false;
    let mut rejection = None;
    if signal.is_actionable() && !flipped {
        match ledger
            .policy()
            .build_order(&signal, candle.close, ledger.has_position())
        {
            Ok(order) => match ledger.apply_order(order) {
                Ok(()) => opened = true,
                Err(err) => trace!(%err, "order not applied"),
            },
            Err(rej) => rejection = Some(rej),
        }
    }

    ledger.mark_to_market(candle);

    TickOutcome {
        exit,
        signal,
        opened,
        rejection,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, Timeframe};
    use crate::risk::RiskPolicy;
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
                    volume: 100.0,
                }
            })
            .collect()
    }

    fn momentum_strategy() -> Strategy {
        Strategy::new(StrategyKind::Momentum(MomentumConfig {
            lookback: 3,
            threshold: 0.01,
        }))
    }

    fn wide_policy() -> RiskPolicy {
        // Brackets far away so only signals drive transitions.
        RiskPolicy::new(100_000.0, 0.20, 0.20, 0.30, 0.60, 0.0).unwrap()
    }

    fn run_series(ledger: &mut Ledger, strategy: &Strategy, all: &[Candle]) -> Vec<TickOutcome> {
        (1..=all.len())
            .map(|end| run_tick(ledger, strategy, &all[..end]))
            .collect()
    }

    #[test]
    fn rising_series_opens_long() {
        let mut ledger = Ledger::new(wide_policy());
        let strategy = momentum_strategy();
        let all = candles(&[100.0, 101.0, 102.0, 103.0, 106.0]);
        let outcomes = run_series(&mut ledger, &strategy, &all);
        assert!(outcomes.iter().any(|o| o.opened));
        assert!(ledger.has_position());
    }

    #[test]
    fn opposing_signal_closes_long() {
        let mut ledger = Ledger::new(wide_policy());
        let strategy = momentum_strategy();
        // Rally opens a long, then a hard reversal emits a short signal.
        let all = candles(&[100.0, 101.0, 102.0, 103.0, 106.0, 104.0, 100.0, 96.0]);
        let outcomes = run_series(&mut ledger, &strategy, &all);
        let closed: Vec<_> = outcomes.iter().filter_map(|o| o.exit.as_ref()).collect();
        assert!(!closed.is_empty());
        assert_eq!(closed[0].exit_reason, ExitReason::SignalClose);
        assert_eq!(closed[0].direction, Direction::Long);
    }

    #[test]
    fn flip_does_not_reenter_same_tick() {
        let mut ledger = Ledger::new(wide_policy());
        let strategy = momentum_strategy();
        let all = candles(&[100.0, 101.0, 102.0, 103.0, 106.0, 104.0, 100.0, 96.0]);
        for end in 1..=all.len() {
            let outcome = run_tick(&mut ledger, &strategy, &all[..end]);
            if outcome
                .exit
                .as_ref()
                .is_some_and(|t| t.exit_reason == ExitReason::SignalClose)
            {
                // The close and a fresh entry never share a tick.
                assert!(!outcome.opened);
                assert_eq!(outcome.rejection, None);
                return;
            }
        }
        panic!("no signal close observed");
    }

    #[test]
    fn exit_then_entry_can_share_a_tick() {
        // Stop fires on the candle range while the same candle's close still
        // supports a fresh long signal.
        let policy = RiskPolicy::new(100_000.0, 0.20, 0.20, 0.02, 0.60, 0.0).unwrap();
        let mut ledger = Ledger::new(policy);
        let strategy = momentum_strategy();

        let mut all = candles(&[100.0, 101.0, 102.0, 103.0, 106.0]);
        // Next candle dips through the stop intraday but closes strongly up.
        let last = all.last().unwrap().clone();
        all.push(Candle {
            timestamp: last.timestamp + Duration::minutes(1),
            timeframe: Timeframe::M1,
            open: last.close,
            high: 112.0,
            low: last.close * 0.94,
            close: 111.0,
            volume: 100.0,
        });

        let outcomes = run_series(&mut ledger, &strategy, &all);
        let last_outcome = outcomes.last().unwrap();
        assert!(last_outcome.exit.is_some());
        assert_eq!(
            last_outcome.exit.as_ref().unwrap().exit_reason,
            ExitReason::StopLoss
        );
        assert!(last_outcome.opened);
    }

    #[test]
    fn equity_curve_grows_one_point_per_tick() {
        let mut ledger = Ledger::new(wide_policy());
        let strategy = momentum_strategy();
        let all = candles(&[100.0, 100.5, 100.2, 100.4, 100.3]);
        run_series(&mut ledger, &strategy, &all);
        assert_eq!(ledger.portfolio().equity_curve.len(), all.len());
    }

    #[test]
    fn flat_market_touches_nothing() {
        let mut ledger = Ledger::new(wide_policy());
        let strategy = momentum_strategy();
        let all = candles(&[100.0; 10]);
        let outcomes = run_series(&mut ledger, &strategy, &all);
        assert!(outcomes.iter().all(|o| !o.opened && o.exit.is_none()));
        assert_eq!(ledger.portfolio().cash, 100_000.0);
        assert!(ledger.portfolio().trades.is_empty());
    }
}
