//! Market data sources.
//!
//! `MarketFeed` is the seam between the engine and wherever candles come
//! from. The replay feed drives backtests and offline runs; the synthetic
//! feed stands in for a live exchange connection.
//!
//! `next_candle` returning `Ok(None)` means "no new data right now" and is a
//! normal outcome, distinct from the error path. The decision loop treats it
//! as an idle tick.

pub mod history;
pub mod replay;
pub mod synthetic;

pub use history::HistoryStore;
pub use replay::ReplayFeed;
pub use synthetic::SyntheticFeed;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::Candle;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("malformed candle at row {row}: {reason}")]
    BadRow { row: usize, reason: String },
    #[error("candle out of order at row {row}: {timestamp} does not advance the series")]
    OutOfOrder {
        row: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A source of candles for one instrument.
///
/// A feed only serves the present. Everything already seen accumulates in the
/// decision loop's `HistoryStore`, which is the single window both the live
/// pipeline and the optimizer read from.
pub trait MarketFeed: Send {
    /// Pull the next candle, or `Ok(None)` when no new candle is available.
    fn next_candle(&mut self) -> Result<Option<Candle>, FeedError>;
}
