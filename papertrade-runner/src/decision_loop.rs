//! The live decision loop.
//!
//! `DecisionLoop` owns the feed, the rolling history, and the live ledger.
//! `poll_once` is one cadence step: pull a candle, store it, and if a
//! strategy holds the active slot, advance the ledger one tick through the
//! shared pipeline. The thread wrapper in `spawn` just repeats `poll_once`
//! on the configured interval until the stop flag flips.
//!
//! A poll that finds no new candle mutates nothing: no equity point, no
//! history row, no order activity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, trace};

use crate::active::ActiveSlot;
use crate::metrics::PerformanceStats;
use crate::scheduler::CycleSchedule;
use papertrade_core::domain::{Signal, Timeframe};
use papertrade_core::feed::{FeedError, HistoryStore, MarketFeed};
use papertrade_core::ledger::Ledger;
use papertrade_core::pipeline::{run_tick, TickOutcome};

/// What one poll did.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// No new candle; nothing changed.
    Idle,
    /// Candle stored, but no strategy holds the active slot.
    Stored,
    /// Candle stored and the ledger advanced one tick.
    Ticked(TickOutcome),
}

pub struct DecisionLoop {
    feed: Box<dyn MarketFeed>,
    history: HistoryStore,
    ledger: Ledger,
    slot: Arc<ActiveSlot>,
    timeframe: Timeframe,
    ticks: u64,
    skipped_ticks: u64,
    last_signal: Option<Signal>,
}

impl DecisionLoop {
    pub fn new(
        feed: Box<dyn MarketFeed>,
        ledger: Ledger,
        slot: Arc<ActiveSlot>,
        timeframe: Timeframe,
    ) -> Self {
        Self {
            feed,
            history: HistoryStore::new(),
            ledger,
            slot,
            timeframe,
            ticks: 0,
            skipped_ticks: 0,
            last_signal: None,
        }
    }

    /// Polls that stored a candle.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Polls that found no new candle.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks
    }

    pub fn last_signal(&self) -> Option<&Signal> {
        self.last_signal.as_ref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Replace the ledger, e.g. after a risk profile switch.
    pub fn reset_ledger(&mut self, ledger: Ledger) {
        self.ledger = ledger;
    }

    /// Statistics for the live session so far.
    pub fn session_stats(&self) -> PerformanceStats {
        let portfolio = self.ledger.portfolio();
        PerformanceStats::compute(&portfolio.equity_curve, &portfolio.trades, self.timeframe)
    }

    /// One cadence step.
    pub fn poll_once(&mut self) -> Result<PollOutcome, FeedError> {
        let Some(candle) = self.feed.next_candle()? else {
            trace!("no new candle");
            self.skipped_ticks += 1;
            return Ok(PollOutcome::Idle);
        };
        self.history.append(candle)?;
        self.ticks += 1;

        let Some(active) = self.slot.current() else {
            return Ok(PollOutcome::Stored);
        };

        let window = active.strategy.kind.lookback_window();
        let history = self.history.last_n(self.timeframe, window).to_vec();
        let outcome = run_tick(&mut self.ledger, &active.strategy, &history);
        self.last_signal = Some(outcome.signal.clone());
        Ok(PollOutcome::Ticked(outcome))
    }
}

/// Run the loop on its own thread until `stop` is set.
///
/// Feed errors are logged and the loop keeps polling; a market data hiccup
/// must not kill the session.
pub fn spawn(
    engine: Arc<Mutex<DecisionLoop>>,
    stop: Arc<AtomicBool>,
    tick_interval: Duration,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("papertrade-decision".into())
        .spawn(move || {
            let mut schedule = CycleSchedule::new(tick_interval);
            while !stop.load(Ordering::Relaxed) {
                let now = Instant::now();
                if schedule.is_due(now) {
                    let result = {
                        let mut engine = engine.lock().unwrap_or_else(|p| p.into_inner());
                        engine.poll_once()
                    };
                    if let Err(err) = result {
                        error!(%err, "poll failed");
                    }
                    schedule.completed(Instant::now());
                } else {
                    let wait = schedule
                        .time_until_due(now)
                        .min(Duration::from_millis(50));
                    thread::sleep(wait);
                }
            }
        })
        .expect("failed to spawn decision loop thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::active::ActiveStrategy;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use papertrade_core::domain::Candle;
    use papertrade_core::feed::ReplayFeed;
    use papertrade_core::risk::RiskPolicy;
    use papertrade_core::strategy::{MomentumConfig, Strategy, StrategyKind};

    fn candles(closes: &[f64]) -> Vec<Candle> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                Candle {
                    timestamp: t0 + ChronoDuration::minutes(i as i64),
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

    fn policy() -> RiskPolicy {
        RiskPolicy::new(100_000.0, 0.20, 0.20, 0.30, 0.60, 0.0).unwrap()
    }

    fn active_slot_with_momentum() -> Arc<ActiveSlot> {
        let slot = Arc::new(ActiveSlot::new(0.1));
        let strategy = Strategy::new(StrategyKind::Momentum(MomentumConfig {
            lookback: 3,
            threshold: 0.01,
        }));
        slot.restore(ActiveStrategy {
            strategy,
            score: 0.9,
            stats: PerformanceStats {
                total_return: 0.5,
                annualized_return: 0.5,
                sharpe: 2.0,
                max_drawdown: -0.05,
                win_rate: 0.6,
                profit_factor: 2.0,
                trade_count: 50,
                avg_trade_pnl: 10.0,
                max_consecutive_losses: 2,
            },
            promoted_at: Utc::now(),
        });
        slot
    }

    #[test]
    fn empty_feed_polls_are_pure() {
        // Exhausted feed: repeated polls change nothing at all.
        let slot = active_slot_with_momentum();
        let mut engine = DecisionLoop::new(
            Box::new(ReplayFeed::new(Vec::new())),
            Ledger::new(policy()),
            slot,
            Timeframe::M1,
        );
        for _ in 0..3 {
            assert_eq!(engine.poll_once().unwrap(), PollOutcome::Idle);
        }
        assert_eq!(engine.ledger().portfolio().cash, 100_000.0);
        assert!(engine.ledger().portfolio().equity_curve.is_empty());
        assert!(engine.history().is_empty(Timeframe::M1));
    }

    #[test]
    fn candles_without_active_strategy_only_accumulate() {
        let slot = Arc::new(ActiveSlot::default());
        let mut engine = DecisionLoop::new(
            Box::new(ReplayFeed::new(candles(&[100.0, 101.0, 102.0]))),
            Ledger::new(policy()),
            slot,
            Timeframe::M1,
        );
        for _ in 0..3 {
            assert_eq!(engine.poll_once().unwrap(), PollOutcome::Stored);
        }
        assert_eq!(engine.history().len(Timeframe::M1), 3);
        assert!(engine.ledger().portfolio().equity_curve.is_empty());
    }

    #[test]
    fn active_strategy_trades_the_feed() {
        let slot = active_slot_with_momentum();
        let mut engine = DecisionLoop::new(
            Box::new(ReplayFeed::new(candles(&[
                100.0, 101.0, 102.0, 103.0, 106.0, 108.0,
            ]))),
            Ledger::new(policy()),
            slot,
            Timeframe::M1,
        );
        let mut opened = false;
        loop {
            match engine.poll_once().unwrap() {
                PollOutcome::Idle => break,
                PollOutcome::Ticked(o) => opened |= o.opened,
                PollOutcome::Stored => {}
            }
        }
        assert!(opened);
        assert!(engine.ledger().has_position());
        assert_eq!(engine.ledger().portfolio().equity_curve.len(), 6);
    }

    #[test]
    fn spawned_loop_stops_on_flag() {
        let slot = active_slot_with_momentum();
        let engine = Arc::new(Mutex::new(DecisionLoop::new(
            Box::new(ReplayFeed::new(candles(&[100.0, 101.0, 102.0]))),
            Ledger::new(policy()),
            slot,
            Timeframe::M1,
        )));
        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn(engine.clone(), stop.clone(), Duration::from_millis(1));

        // Let it drain the feed, then stop.
        thread::sleep(Duration::from_millis(50));
        stop.store(true, Ordering::Relaxed);
        handle.join().unwrap();

        let engine = engine.lock().unwrap();
        assert_eq!(engine.history().len(Timeframe::M1), 3);
    }

    #[test]
    fn session_stats_reflect_ledger() {
        let slot = active_slot_with_momentum();
        let mut engine = DecisionLoop::new(
            Box::new(ReplayFeed::new(candles(&[100.0, 100.0, 100.0]))),
            Ledger::new(policy()),
            slot,
            Timeframe::M1,
        );
        while engine.poll_once().unwrap() != PollOutcome::Idle {}
        let stats = engine.session_stats();
        assert_eq!(stats.trade_count, 0);
        assert_eq!(stats.total_return, 0.0);
    }
}
