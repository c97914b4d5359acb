//! Replay feed: serves a fixed candle series one tick at a time.
//!
//! Drives backtests and deterministic integration runs. When the series is
//! exhausted `next_candle` keeps returning `Ok(None)`.

use super::{FeedError, MarketFeed};
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct ReplayFeed {
    candles: Vec<Candle>,
    cursor: usize,
}

impl ReplayFeed {
    /// `candles` must be sorted ascending by timestamp.
    pub fn new(candles: Vec<Candle>) -> Self {
        Self { candles, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.candles.len() - self.cursor
    }
}

impl MarketFeed for ReplayFeed {
    fn next_candle(&mut self) -> Result<Option<Candle>, FeedError> {
        match self.candles.get(self.cursor) {
            Some(candle) => {
                self.cursor += 1;
                Ok(Some(candle.clone()))
            }
            None => Ok(None),
        }
    }
}
