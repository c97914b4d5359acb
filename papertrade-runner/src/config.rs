//! Engine configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) yields a working
//! engine. Validation runs once at load; a config that parses but cannot run
//! is rejected up front.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::optimizer::OptimizerConfig;
use papertrade_core::domain::Timeframe;
use papertrade_core::risk::RiskProfile;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad config toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("tick_interval_secs must be >= 1, got {0}")]
    BadTickInterval(u64),
    #[error("optimize_interval_secs must be >= 1, got {0}")]
    BadOptimizeInterval(u64),
    #[error("promotion_threshold must be in (0, 1], got {0}")]
    BadPromotionThreshold(f64),
    #[error("feed kind 'csv' requires csv_path")]
    MissingCsvPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    /// Seeded random walk, no external data needed.
    #[default]
    Synthetic,
    /// Replay of a CSV candle file.
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub kind: FeedKind,
    pub csv_path: Option<PathBuf>,
    pub seed: u64,
    pub initial_price: f64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            kind: FeedKind::Synthetic,
            csv_path: None,
            seed: 0,
            initial_price: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub timeframe: Timeframe,
    /// Live decision cadence.
    pub tick_interval_secs: u64,
    /// Optimization cycle cadence.
    pub optimize_interval_secs: u64,
    pub risk_profile: RiskProfile,
    pub promotion_threshold: f64,
    pub state_path: PathBuf,
    pub optimizer: OptimizerConfig,
    pub feed: FeedConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::M1,
            tick_interval_secs: 1,
            optimize_interval_secs: 1800,
            risk_profile: RiskProfile::Default,
            promotion_threshold: crate::active::PROMOTION_THRESHOLD,
            state_path: PathBuf::from("papertrade_state.json"),
            optimizer: OptimizerConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_secs == 0 {
            return Err(ConfigError::BadTickInterval(self.tick_interval_secs));
        }
        if self.optimize_interval_secs == 0 {
            return Err(ConfigError::BadOptimizeInterval(self.optimize_interval_secs));
        }
        if !(self.promotion_threshold > 0.0 && self.promotion_threshold <= 1.0) {
            return Err(ConfigError::BadPromotionThreshold(self.promotion_threshold));
        }
        if self.feed.kind == FeedKind::Csv && self.feed.csv_path.is_none() {
            return Err(ConfigError::MissingCsvPath);
        }
        Ok(())
    }
}
