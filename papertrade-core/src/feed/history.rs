//! In-process candle store with CSV persistence.
//!
//! One store holds every timeframe for a single instrument. Appends must
//! advance the series; out-of-order or insane candles are rejected so every
//! reader can assume a clean ascending sequence.
//!
//! CSV layout per timeframe file: `timestamp,open,high,low,close,volume`,
//! RFC 3339 timestamps, oldest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use super::FeedError;
use crate::domain::{Candle, Timeframe};

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Candle series per timeframe, always sorted ascending by timestamp.
#[derive(Debug, Default, Clone)]
pub struct HistoryStore {
    series: BTreeMap<Timeframe, Vec<Candle>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candle, enforcing sanity and strict timestamp order.
    pub fn append(&mut self, candle: Candle) -> Result<(), FeedError> {
        let series = self.series.entry(candle.timeframe).or_default();
        let row = series.len();
        if !candle.is_sane() {
            return Err(FeedError::BadRow {
                row,
                reason: format!("inconsistent ohlcv at {}", candle.timestamp),
            });
        }
        if let Some(last) = series.last() {
            if candle.timestamp <= last.timestamp {
                return Err(FeedError::OutOfOrder {
                    row,
                    timestamp: candle.timestamp,
                });
            }
        }
        series.push(candle);
        Ok(())
    }

    pub fn len(&self, timeframe: Timeframe) -> usize {
        self.series.get(&timeframe).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, timeframe: Timeframe) -> bool {
        self.len(timeframe) == 0
    }

    /// Full series for a timeframe, oldest first.
    pub fn all(&self, timeframe: Timeframe) -> &[Candle] {
        self.series.get(&timeframe).map_or(&[], Vec::as_slice)
    }

    /// The trailing `n` candles, fewer if the series is shorter.
    pub fn last_n(&self, timeframe: Timeframe, n: usize) -> &[Candle] {
        let all = self.all(timeframe);
        &all[all.len().saturating_sub(n)..]
    }

    /// Candles with `start <= timestamp < end`.
    pub fn range(
        &self,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<Candle> {
        self.all(timeframe)
            .iter()
            .filter(|c| c.timestamp >= start && c.timestamp < end)
            .cloned()
            .collect()
    }

    /// Load one timeframe's series from a CSV file, replacing what was there.
    pub fn load_csv(&mut self, timeframe: Timeframe, path: &Path) -> Result<usize, FeedError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut loaded = Vec::new();
        for (row, record) in reader.deserialize::<CsvRow>().enumerate() {
            let r = record?;
            let candle = Candle {
                timestamp: r.timestamp,
                timeframe,
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
                volume: r.volume,
            };
            if !candle.is_sane() {
                return Err(FeedError::BadRow {
                    row,
                    reason: format!("inconsistent ohlcv at {}", candle.timestamp),
                });
            }
            if let Some(prev) = loaded.last() {
                let prev: &Candle = prev;
                if candle.timestamp <= prev.timestamp {
                    return Err(FeedError::OutOfOrder {
                        row,
                        timestamp: candle.timestamp,
                    });
                }
            }
            loaded.push(candle);
        }
        info!(timeframe = %timeframe, rows = loaded.len(), path = %path.display(), "history loaded");
        self.series.insert(timeframe, loaded);
        Ok(self.len(timeframe))
    }

    /// Write one timeframe's series to a CSV file.
    pub fn save_csv(&self, timeframe: Timeframe, path: &Path) -> Result<(), FeedError> {
        let mut writer = csv::Writer::from_path(path)?;
        for candle in self.all(timeframe) {
            writer.serialize(CsvRow {
                timestamp: candle.timestamp,
                open: candle.open,
                high: candle.high,
                low: candle.low,
                close: candle.close,
                volume: candle.volume,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}
