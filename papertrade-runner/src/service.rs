//! Engine service: owns the threads and exposes the control surface.
//!
//! Two background threads run while the service is started: the decision
//! loop (tick cadence) and the optimization loop (cycle cadence). Both share
//! the active slot; the optimizer promotes into it, the decision loop reads
//! from it. `stop` flips one flag, joins both threads, and persists a
//! snapshot so the next start resumes the same book.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::active::ActiveSlot;
use crate::config::EngineConfig;
use crate::decision_loop::{self, DecisionLoop};
use crate::metrics::PerformanceStats;
use crate::monitor::{self, DivergenceReport};
use crate::optimizer;
use crate::persist::{self, EngineState, PersistError};
use crate::scheduler::CycleSchedule;
use papertrade_core::domain::{Signal, StrategyId};
use papertrade_core::feed::MarketFeed;
use papertrade_core::ledger::Ledger;
use papertrade_core::risk::RiskProfile;
use papertrade_core::strategy::Strategy;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service is already running")]
    AlreadyRunning,
    #[error("service is not running")]
    NotRunning,
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Snapshot of the currently promoted strategy, for status output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSummary {
    pub strategy_id: StrategyId,
    pub family: String,
    pub score: f64,
    pub promoted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub risk_profile: RiskProfile,
    pub cash: f64,
    pub position_open: bool,
    pub trade_count: usize,
    /// Seconds since the last `start`. None when stopped.
    pub uptime_secs: Option<u64>,
    /// Polls that stored a candle.
    pub ticks: u64,
    /// Polls that found no new candle.
    pub skipped_ticks: u64,
    pub last_signal: Option<Signal>,
    pub active: Option<ActiveSummary>,
    pub session: PerformanceStats,
    /// Live-versus-backtest comparison, once the live session has trades.
    pub divergence: Option<DivergenceReport>,
}

pub struct PaperTradingService {
    config: EngineConfig,
    risk_profile: RiskProfile,
    slot: Arc<ActiveSlot>,
    engine: Arc<Mutex<DecisionLoop>>,
    stop: Arc<AtomicBool>,
    started_at: Option<Instant>,
    decision_handle: Option<JoinHandle<()>>,
    optimizer_handle: Option<JoinHandle<()>>,
}

impl PaperTradingService {
    /// Build the service, restoring a persisted snapshot when one exists.
    pub fn new(config: EngineConfig, feed: Box<dyn MarketFeed>) -> Result<Self, ServiceError> {
        let slot = Arc::new(ActiveSlot::new(config.promotion_threshold));

        let (risk_profile, ledger) = match persist::load(&config.state_path)? {
            Some(state) => {
                info!(saved_at = %state.saved_at, "resuming from persisted state");
                if let Some(active) = state.active {
                    slot.restore(active);
                }
                (state.risk_profile, state.ledger)
            }
            None => {
                let profile = config.risk_profile;
                (profile, Ledger::new(profile.policy()))
            }
        };

        let engine = Arc::new(Mutex::new(DecisionLoop::new(
            feed,
            ledger,
            slot.clone(),
            config.timeframe,
        )));

        Ok(Self {
            config,
            risk_profile,
            slot,
            engine,
            stop: Arc::new(AtomicBool::new(false)),
            started_at: None,
            decision_handle: None,
            optimizer_handle: None,
        })
    }

    pub fn is_running(&self) -> bool {
        self.decision_handle.is_some()
    }

    pub fn start(&mut self) -> Result<(), ServiceError> {
        if self.is_running() {
            return Err(ServiceError::AlreadyRunning);
        }
        self.stop.store(false, Ordering::Relaxed);
        self.started_at = Some(Instant::now());

        self.decision_handle = Some(decision_loop::spawn(
            self.engine.clone(),
            self.stop.clone(),
            Duration::from_secs(self.config.tick_interval_secs),
        ));
        self.optimizer_handle = Some(spawn_optimizer(
            self.engine.clone(),
            self.slot.clone(),
            self.config.clone(),
            self.risk_profile,
            self.stop.clone(),
        ));
        info!(
            tick_secs = self.config.tick_interval_secs,
            optimize_secs = self.config.optimize_interval_secs,
            "service started"
        );
        Ok(())
    }

    /// Stop both threads and persist the current state.
    pub fn stop(&mut self) -> Result<(), ServiceError> {
        if !self.is_running() {
            return Err(ServiceError::NotRunning);
        }
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.decision_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.optimizer_handle.take() {
            let _ = handle.join();
        }
        self.started_at = None;
        self.persist_state()?;
        info!("service stopped");
        Ok(())
    }

    /// Switch the risk profile. The live book resets to the new profile's
    /// starting balance; strategy promotion state is unaffected.
    pub fn select_risk_profile(&mut self, profile: RiskProfile) -> Result<(), ServiceError> {
        self.risk_profile = profile;
        {
            let mut engine = self.engine.lock().unwrap_or_else(|p| p.into_inner());
            engine.reset_ledger(Ledger::new(profile.policy()));
        }
        info!(?profile, "risk profile switched, ledger reset");
        self.persist_state()?;
        Ok(())
    }

    pub fn status(&self) -> ServiceStatus {
        let engine = self.engine.lock().unwrap_or_else(|p| p.into_inner());
        let portfolio = engine.ledger().portfolio();
        let session = engine.session_stats();
        let active = self.slot.current();

        let divergence = active
            .as_ref()
            .filter(|_| session.trade_count > 0)
            .map(|a| monitor::compare(&session, &a.stats));

        ServiceStatus {
            running: self.is_running(),
            risk_profile: self.risk_profile,
            cash: portfolio.cash,
            position_open: portfolio.has_position(),
            trade_count: portfolio.trades.len(),
            uptime_secs: self.started_at.map(|t| t.elapsed().as_secs()),
            ticks: engine.ticks(),
            skipped_ticks: engine.skipped_ticks(),
            last_signal: engine.last_signal().cloned(),
            active: active.map(|a| ActiveSummary {
                strategy_id: a.strategy.id.clone(),
                family: a.strategy.kind.family().to_string(),
                score: a.score,
                promoted_at: a.promoted_at,
            }),
            session,
            divergence,
        }
    }

    /// Run one optimization cycle synchronously against the current history
    /// and promote the winner if it qualifies. The background optimizer does
    /// exactly this on its own schedule, additionally carrying prior winners
    /// between cycles.
    pub fn optimize_now(&self) -> optimizer::OptimizationReport {
        let carried = carried_pool(&self.slot, &[]);
        run_optimization_cycle(
            &self.engine,
            &self.slot,
            &self.config,
            self.risk_profile,
            &carried,
            0,
        )
    }

    fn persist_state(&self) -> Result<(), PersistError> {
        let ledger = {
            let engine = self.engine.lock().unwrap_or_else(|p| p.into_inner());
            engine.ledger().clone()
        };
        let active = self.slot.current().map(|a| (*a).clone());
        let state = EngineState::new(
            self.risk_profile,
            ledger,
            active,
            self.config.optimizer.clone(),
        );
        persist::save(&self.config.state_path, &state)
    }
}

impl Drop for PaperTradingService {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}

/// Previous winners plus the active strategy, so cycles refine what already
/// works instead of restarting from the catalog alone.
fn carried_pool(slot: &Arc<ActiveSlot>, winners: &[Strategy]) -> Vec<Strategy> {
    let mut pool: Vec<Strategy> = winners.to_vec();
    if let Some(active) = slot.current() {
        pool.push(active.strategy.clone());
    }
    pool
}

fn run_optimization_cycle(
    engine: &Arc<Mutex<DecisionLoop>>,
    slot: &Arc<ActiveSlot>,
    config: &EngineConfig,
    risk_profile: RiskProfile,
    carried: &[Strategy],
    cycle: u64,
) -> optimizer::OptimizationReport {
    let candles = {
        let engine = engine.lock().unwrap_or_else(|p| p.into_inner());
        engine.history().all(config.timeframe).to_vec()
    };
    let report = optimizer::run_cycle(
        &config.optimizer,
        &risk_profile.policy(),
        &candles,
        carried,
        cycle,
    );
    if let Some(best) = report.best() {
        if let Err(reason) = slot.try_promote(best) {
            info!(%reason, "best candidate not promoted");
        }
    }
    report
}

fn spawn_optimizer(
    engine: Arc<Mutex<DecisionLoop>>,
    slot: Arc<ActiveSlot>,
    config: EngineConfig,
    risk_profile: RiskProfile,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("papertrade-optimizer".into())
        .spawn(move || {
            let mut schedule =
                CycleSchedule::new(Duration::from_secs(config.optimize_interval_secs));
            let mut winners: Vec<Strategy> = Vec::new();
            let mut cycle: u64 = 0;
            while !stop.load(Ordering::Relaxed) {
                let now = Instant::now();
                if schedule.is_due(now) {
                    let carried = carried_pool(&slot, &winners);
                    let report = run_optimization_cycle(
                        &engine,
                        &slot,
                        &config,
                        risk_profile,
                        &carried,
                        cycle,
                    );
                    if report.evaluated == 0 {
                        warn!("optimization cycle had no evaluable candidates");
                    } else {
                        winners = report
                            .ranked
                            .iter()
                            .map(|c| c.strategy.clone())
                            .collect();
                    }
                    cycle += 1;
                    schedule.completed(Instant::now());
                } else {
                    std::thread::sleep(
                        schedule
                            .time_until_due(now)
                            .min(Duration::from_millis(50)),
                    );
                }
            }
        })
        .expect("failed to spawn optimizer thread")
}
