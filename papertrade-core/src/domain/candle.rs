//! OHLCV candle, the unit of market data for every strategy and backtest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Timeframe;

/// One OHLCV bar.
///
/// `timestamp` is the bar's open time (UTC). Candles belonging to one series
/// are expected to arrive in strictly increasing timestamp order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub timeframe: Timeframe,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Basic shape check: positive prices, high/low bracket open and close,
    /// non-negative volume. Feed implementations drop candles that fail this.
    pub fn is_sane(&self) -> bool {
        self.open > 0.0
            && self.high > 0.0
            && self.low > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    /// Typical price, used by volume-weighted indicators.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            timeframe: Timeframe::M1,
            open,
            high,
            low,
            close,
            volume: 10.0,
        }
    }

    #[test]
    fn sane_candle_passes() {
        assert!(candle(100.0, 105.0, 99.0, 102.0).is_sane());
    }

    #[test]
    fn inverted_high_low_fails() {
        assert!(!candle(100.0, 98.0, 102.0, 100.0).is_sane());
    }

    #[test]
    fn zero_price_fails() {
        assert!(!candle(0.0, 105.0, 0.0, 102.0).is_sane());
    }

    #[test]
    fn negative_volume_fails() {
        let mut c = candle(100.0, 105.0, 99.0, 102.0);
        c.volume = -1.0;
        assert!(!c.is_sane());
    }
}
