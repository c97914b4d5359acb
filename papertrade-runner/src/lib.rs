//! PaperTrade Runner — optimization, promotion, and the live engine.
//!
//! This crate builds on `papertrade-core` to provide:
//! - Performance metrics and composite scoring
//! - Optimization cycles (seed catalog plus parameter perturbations)
//! - The active slot with threshold-gated promotion
//! - Live-versus-backtest divergence monitoring
//! - The decision loop and the service that owns its threads
//! - Engine state persistence and TOML configuration

pub mod active;
pub mod config;
pub mod decision_loop;
pub mod metrics;
pub mod monitor;
pub mod optimizer;
pub mod persist;
pub mod scheduler;
pub mod score;
pub mod service;

pub use active::{ActiveSlot, ActiveStrategy, PromotionFailure, PROMOTION_THRESHOLD};
pub use config::{ConfigError, EngineConfig, FeedConfig, FeedKind};
pub use decision_loop::{DecisionLoop, PollOutcome};
pub use metrics::PerformanceStats;
pub use monitor::{DivergenceReport, DivergenceVerdict};
pub use optimizer::{OptimizationReport, OptimizerConfig};
pub use persist::{EngineState, PersistError, STATE_SCHEMA_VERSION};
pub use scheduler::CycleSchedule;
pub use score::{composite_score, ScoredCandidate};
pub use service::{ActiveSummary, PaperTradingService, ServiceError, ServiceStatus};
