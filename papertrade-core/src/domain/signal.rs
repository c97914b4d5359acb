//! Strategy output: a directional opinion with a confidence weight.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StrategyId;

/// Trade direction. `Flat` means "no opinion / stay out".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
    Flat,
}

impl Direction {
    /// Whether this direction opposes an open position in `other`.
    pub fn opposes(&self, other: Direction) -> bool {
        matches!(
            (self, other),
            (Direction::Long, Direction::Short) | (Direction::Short, Direction::Long)
        )
    }
}

/// One strategy decision for one candle.
///
/// `confidence` is clamped to `[0.0, 1.0]` at construction. Flat signals carry
/// zero confidence by convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    pub confidence: f64,
    pub strategy_id: StrategyId,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn new(
        direction: Direction,
        confidence: f64,
        strategy_id: StrategyId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            direction,
            confidence: confidence.clamp(0.0, 1.0),
            strategy_id,
            timestamp,
        }
    }

    pub fn flat(strategy_id: StrategyId, timestamp: DateTime<Utc>) -> Self {
        Self::new(Direction::Flat, 0.0, strategy_id, timestamp)
    }

    pub fn is_actionable(&self) -> bool {
        self.direction != Direction::Flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn confidence_is_clamped() {
        let id = StrategyId::from_config_bytes(b"s");
        let s = Signal::new(Direction::Long, 1.7, id.clone(), ts());
        assert_eq!(s.confidence, 1.0);
        let s = Signal::new(Direction::Short, -0.3, id, ts());
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn flat_is_not_actionable() {
        let id = StrategyId::from_config_bytes(b"s");
        assert!(!Signal::flat(id, ts()).is_actionable());
    }

    #[test]
    fn opposition() {
        assert!(Direction::Long.opposes(Direction::Short));
        assert!(Direction::Short.opposes(Direction::Long));
        assert!(!Direction::Long.opposes(Direction::Long));
        assert!(!Direction::Flat.opposes(Direction::Long));
    }
}
