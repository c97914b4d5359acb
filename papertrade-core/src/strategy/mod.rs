//! Strategy catalog: five parameterized families behind one closed enum.
//!
//! Each family lives in its own module and exposes a config struct plus a pure
//! `decide(cfg, closes) -> (Direction, f64)` function over the close series.
//! `Strategy` wraps a `StrategyKind` with its content-addressed id and turns
//! decisions into timestamped `Signal`s.
//!
//! Dispatch is a match over the closed enum rather than trait objects, so
//! configs serialize plainly and candidate generation can enumerate families.

pub mod bollinger;
pub mod indicators;
pub mod ma_cross;
pub mod macd;
pub mod momentum;
pub mod perturb;
pub mod rsi;

pub use bollinger::BollingerConfig;
pub use ma_cross::{MaCrossConfig, MaKind};
pub use macd::MacdConfig;
pub use momentum::MomentumConfig;
pub use rsi::RsiConfig;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::domain::{Candle, Direction, Signal, StrategyId};

/// One strategy family with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyKind {
    RsiReversion(RsiConfig),
    MacdCross(MacdConfig),
    MaCross(MaCrossConfig),
    Momentum(MomentumConfig),
    Bollinger(BollingerConfig),
}

impl StrategyKind {
    pub fn family(&self) -> &'static str {
        match self {
            Self::RsiReversion(_) => "rsi_reversion",
            Self::MacdCross(_) => "macd_cross",
            Self::MaCross(cfg) => match cfg.ma {
                MaKind::Sma => "sma_cross",
                MaKind::Ema => "ema_cross",
            },
            Self::Momentum(_) => "momentum",
            Self::Bollinger(_) => "bollinger",
        }
    }

    /// Minimum number of candles required before the first decision.
    pub fn min_window(&self) -> usize {
        match self {
            Self::RsiReversion(cfg) => cfg.period + 1,
            Self::MacdCross(cfg) => cfg.slow + cfg.signal,
            Self::MaCross(cfg) => cfg.slow + 1,
            Self::Momentum(cfg) => cfg.lookback + 1,
            Self::Bollinger(cfg) => cfg.period,
        }
    }

    /// Trailing candles handed to `evaluate` on every tick. Three warmup
    /// windows is enough for the smoothed indicators to converge, and using
    /// the same span live and in backtests keeps their decisions identical.
    pub fn lookback_window(&self) -> usize {
        self.min_window() * 3
    }

    /// Jitter parameters into a nearby configuration.
    pub fn perturb(&self, rng: &mut StdRng) -> StrategyKind {
        match self {
            Self::RsiReversion(cfg) => Self::RsiReversion(cfg.perturb(rng)),
            Self::MacdCross(cfg) => Self::MacdCross(cfg.perturb(rng)),
            Self::MaCross(cfg) => Self::MaCross(cfg.perturb(rng)),
            Self::Momentum(cfg) => Self::Momentum(cfg.perturb(rng)),
            Self::Bollinger(cfg) => Self::Bollinger(cfg.perturb(rng)),
        }
    }

    fn decide(&self, closes: &[f64]) -> (Direction, f64) {
        match self {
            Self::RsiReversion(cfg) => rsi::decide(cfg, closes),
            Self::MacdCross(cfg) => macd::decide(cfg, closes),
            Self::MaCross(cfg) => ma_cross::decide(cfg, closes),
            Self::Momentum(cfg) => momentum::decide(cfg, closes),
            Self::Bollinger(cfg) => bollinger::decide(cfg, closes),
        }
    }
}

/// A strategy kind paired with its stable identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub kind: StrategyKind,
    pub id: StrategyId,
}

impl Strategy {
    pub fn new(kind: StrategyKind) -> Self {
        // Enum field order is declaration order, so this is deterministic.
        let bytes = serde_json::to_vec(&kind).expect("strategy config must serialize");
        let id = StrategyId::from_config_bytes(&bytes);
        Self { kind, id }
    }

    /// Evaluate the strategy over `history` and emit a signal for the last
    /// candle. Flat (zero-confidence) when the window is too short.
    pub fn evaluate(&self, history: &[Candle]) -> Signal {
        let Some(last) = history.last() else {
            return Signal::flat(self.id.clone(), chrono::Utc::now());
        };
        if history.len() < self.kind.min_window() {
            return Signal::flat(self.id.clone(), last.timestamp);
        }
        let closes: Vec<f64> = history.iter().map(|c| c.close).collect();
        let (direction, confidence) = self.kind.decide(&closes);
        Signal::new(direction, confidence, self.id.clone(), last.timestamp)
    }

    pub fn perturb(&self, rng: &mut StdRng) -> Strategy {
        Strategy::new(self.kind.perturb(rng))
    }
}

/// Baseline catalog used to seed optimization: one conventional
/// parameterization per family.
pub fn seed_catalog() -> Vec<Strategy> {
    vec![
        Strategy::new(StrategyKind::RsiReversion(RsiConfig {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
        })),
        Strategy::new(StrategyKind::MacdCross(MacdConfig {
            fast: 12,
            slow: 26,
            signal: 9,
        })),
        Strategy::new(StrategyKind::MaCross(MaCrossConfig {
            fast: 10,
            slow: 30,
            ma: MaKind::Sma,
        })),
        Strategy::new(StrategyKind::MaCross(MaCrossConfig {
            fast: 12,
            slow: 26,
            ma: MaKind::Ema,
        })),
        Strategy::new(StrategyKind::Momentum(MomentumConfig {
            lookback: 10,
            threshold: 0.02,
        })),
        Strategy::new(StrategyKind::Bollinger(BollingerConfig {
            period: 20,
            std_dev: 2.0,
        })),
    ]
}
