//! Risk layer: the only gate between a signal and an order.
//!
//! A `RiskPolicy` validates itself once at construction (bad limits are a
//! configuration error, not something to silently clamp) and then sizes and
//! brackets every order. Position size scales linearly with signal confidence
//! up to the policy cap; stop and target are fixed percentage brackets around
//! the entry price.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Direction, Order, Signal};

/// Invalid risk limits. These are fatal at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskConfigError {
    #[error("max_position_fraction must be in (0, 1], got {0}")]
    BadPositionFraction(f64),
    #[error("confidence_threshold must be in (0, 1], got {0}")]
    BadConfidenceThreshold(f64),
    #[error("stop_loss_pct must be in (0, 1), got {0}")]
    BadStopLoss(f64),
    #[error("take_profit_pct must be in (0, 1), got {0}")]
    BadTakeProfit(f64),
    #[error("fee_pct must be in [0, 0.05], got {0}")]
    BadFee(f64),
    #[error("starting_balance must be positive, got {0}")]
    BadStartingBalance(f64),
}

/// Why a signal did not become an order. These are normal outcomes, logged
/// and counted but never fatal.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum OrderRejection {
    #[error("confidence {confidence:.3} below threshold {threshold:.3}")]
    ConfidenceBelowThreshold { confidence: f64, threshold: f64 },
    #[error("a position is already open")]
    PositionAlreadyOpen,
    #[error("stop/target bracket invalid for {direction:?} entry at {entry_price}")]
    InvalidStopPlacement {
        direction: Direction,
        entry_price: f64,
    },
}

/// Sizing and bracket limits applied to every order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    pub starting_balance: f64,
    pub max_position_fraction: f64,
    pub confidence_threshold: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub fee_pct: f64,
}

impl RiskPolicy {
    /// Construct and validate. Rejecting bad limits up front keeps every
    /// downstream invariant unconditional.
    pub fn new(
        starting_balance: f64,
        max_position_fraction: f64,
        confidence_threshold: f64,
        stop_loss_pct: f64,
        take_profit_pct: f64,
        fee_pct: f64,
    ) -> Result<Self, RiskConfigError> {
        let policy = Self {
            starting_balance,
            max_position_fraction,
            confidence_threshold,
            stop_loss_pct,
            take_profit_pct,
            fee_pct,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), RiskConfigError> {
        if !(self.starting_balance > 0.0) {
            return Err(RiskConfigError::BadStartingBalance(self.starting_balance));
        }
        if !(self.max_position_fraction > 0.0 && self.max_position_fraction <= 1.0) {
            return Err(RiskConfigError::BadPositionFraction(
                self.max_position_fraction,
            ));
        }
        if !(self.confidence_threshold > 0.0 && self.confidence_threshold <= 1.0) {
            return Err(RiskConfigError::BadConfidenceThreshold(
                self.confidence_threshold,
            ));
        }
        if !(self.stop_loss_pct > 0.0 && self.stop_loss_pct < 1.0) {
            return Err(RiskConfigError::BadStopLoss(self.stop_loss_pct));
        }
        if !(self.take_profit_pct > 0.0 && self.take_profit_pct < 1.0) {
            return Err(RiskConfigError::BadTakeProfit(self.take_profit_pct));
        }
        if !(0.0..=0.05).contains(&self.fee_pct) {
            return Err(RiskConfigError::BadFee(self.fee_pct));
        }
        Ok(())
    }

    /// Equity fraction committed for a signal of the given confidence.
    pub fn size_for(&self, confidence: f64) -> f64 {
        (confidence * self.max_position_fraction).min(self.max_position_fraction)
    }

    /// Turn a signal into a validated order, or explain why not.
    ///
    /// `has_position` reflects the ledger at decision time; the single open
    /// position rule is enforced here as well as in the ledger.
    pub fn build_order(
        &self,
        signal: &Signal,
        entry_price: f64,
        has_position: bool,
    ) -> Result<Order, OrderRejection> {
        if has_position {
            return Err(OrderRejection::PositionAlreadyOpen);
        }
        if signal.confidence < self.confidence_threshold || !signal.is_actionable() {
            return Err(OrderRejection::ConfidenceBelowThreshold {
                confidence: signal.confidence,
                threshold: self.confidence_threshold,
            });
        }

        let (stop_loss, take_profit) = match signal.direction {
            Direction::Long => (
                entry_price * (1.0 - self.stop_loss_pct),
                entry_price * (1.0 + self.take_profit_pct),
            ),
            Direction::Short => (
                entry_price * (1.0 + self.stop_loss_pct),
                entry_price * (1.0 - self.take_profit_pct),
            ),
            Direction::Flat => {
                return Err(OrderRejection::ConfidenceBelowThreshold {
                    confidence: signal.confidence,
                    threshold: self.confidence_threshold,
                })
            }
        };

        let valid_bracket = match signal.direction {
            Direction::Long => stop_loss < entry_price && take_profit > entry_price,
            Direction::Short => stop_loss > entry_price && take_profit < entry_price,
            Direction::Flat => false,
        };
        if !valid_bracket || entry_price <= 0.0 {
            return Err(OrderRejection::InvalidStopPlacement {
                direction: signal.direction,
                entry_price,
            });
        }

        Ok(Order {
            direction: signal.direction,
            size_fraction: self.size_for(signal.confidence),
            entry_price,
            stop_loss,
            take_profit,
            opened_at: signal.timestamp,
            strategy_id: signal.strategy_id.clone(),
        })
    }
}

/// Preset policy bundles. Each pairs a starting balance with sizing limits;
/// the service exposes them by name so a runtime profile switch is one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Default,
    Conservative,
    Aggressive,
    Learning,
}

impl RiskProfile {
    pub fn policy(&self) -> RiskPolicy {
        // All presets satisfy validate() by construction.
        match self {
            Self::Default => RiskPolicy {
                starting_balance: 100_000.0,
                max_position_fraction: 0.20,
                confidence_threshold: 0.20,
                stop_loss_pct: 0.02,
                take_profit_pct: 0.04,
                fee_pct: 0.001,
            },
            Self::Conservative => RiskPolicy {
                starting_balance: 200_000.0,
                max_position_fraction: 0.10,
                confidence_threshold: 0.80,
                stop_loss_pct: 0.015,
                take_profit_pct: 0.03,
                fee_pct: 0.001,
            },
            Self::Aggressive => RiskPolicy {
                starting_balance: 500_000.0,
                max_position_fraction: 0.30,
                confidence_threshold: 0.60,
                stop_loss_pct: 0.03,
                take_profit_pct: 0.06,
                fee_pct: 0.001,
            },
            Self::Learning => RiskPolicy {
                starting_balance: 100_000.0,
                max_position_fraction: 0.15,
                confidence_threshold: 0.25,
                stop_loss_pct: 0.02,
                take_profit_pct: 0.04,
                fee_pct: 0.001,
            },
        }
    }

    pub fn all() -> [RiskProfile; 4] {
        [
            Self::Default,
            Self::Conservative,
            Self::Aggressive,
            Self::Learning,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StrategyId;
    use chrono::{TimeZone, Utc};

    fn policy() -> RiskPolicy {
        RiskPolicy::new(100_000.0, 0.20, 0.20, 0.05, 0.10, 0.0).unwrap()
    }

    fn signal(direction: Direction, confidence: f64) -> Signal {
        Signal::new(
            direction,
            confidence,
            StrategyId::from_config_bytes(b"risk-test"),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    // ── config validation ──

    #[test]
    fn presets_all_validate() {
        for profile in RiskProfile::all() {
            assert_eq!(profile.policy().validate(), Ok(()));
        }
    }

    #[test]
    fn bad_fraction_rejected() {
        assert!(matches!(
            RiskPolicy::new(100_000.0, 1.5, 0.2, 0.02, 0.04, 0.0),
            Err(RiskConfigError::BadPositionFraction(_))
        ));
        assert!(matches!(
            RiskPolicy::new(100_000.0, 0.0, 0.2, 0.02, 0.04, 0.0),
            Err(RiskConfigError::BadPositionFraction(_))
        ));
    }

    #[test]
    fn bad_stop_rejected() {
        assert!(matches!(
            RiskPolicy::new(100_000.0, 0.2, 0.2, 0.0, 0.04, 0.0),
            Err(RiskConfigError::BadStopLoss(_))
        ));
    }

    #[test]
    fn nan_parameters_rejected() {
        assert!(RiskPolicy::new(100_000.0, f64::NAN, 0.2, 0.02, 0.04, 0.0).is_err());
        assert!(RiskPolicy::new(f64::NAN, 0.2, 0.2, 0.02, 0.04, 0.0).is_err());
    }

    // ── sizing ──

    #[test]
    fn size_scales_with_confidence() {
        let p = policy();
        assert_eq!(p.size_for(1.0), 0.20);
        assert_eq!(p.size_for(0.5), 0.10);
    }

    // ── order building ──

    #[test]
    fn long_bracket_sides() {
        let order = policy()
            .build_order(&signal(Direction::Long, 0.8), 100.0, false)
            .unwrap();
        assert!(order.stop_loss < 100.0);
        assert!(order.take_profit > 100.0);
        assert!((order.stop_loss - 95.0).abs() < 1e-9);
        assert!((order.take_profit - 110.0).abs() < 1e-9);
    }

    #[test]
    fn short_bracket_sides() {
        let order = policy()
            .build_order(&signal(Direction::Short, 0.8), 100.0, false)
            .unwrap();
        assert!(order.stop_loss > 100.0);
        assert!(order.take_profit < 100.0);
    }

    #[test]
    fn low_confidence_rejected() {
        let err = policy()
            .build_order(&signal(Direction::Long, 0.1), 100.0, false)
            .unwrap_err();
        assert!(matches!(
            err,
            OrderRejection::ConfidenceBelowThreshold { .. }
        ));
    }

    #[test]
    fn rejection_survives_serde() {
        // Rejections ride inside serialized tick outcomes.
        let rejection = OrderRejection::ConfidenceBelowThreshold {
            confidence: 0.1,
            threshold: 0.3,
        };
        let json = serde_json::to_string(&rejection).unwrap();
        let back: OrderRejection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rejection);
    }

    #[test]
    fn open_position_rejected() {
        let err = policy()
            .build_order(&signal(Direction::Long, 0.9), 100.0, true)
            .unwrap_err();
        assert_eq!(err, OrderRejection::PositionAlreadyOpen);
    }

    #[test]
    fn flat_signal_never_becomes_order() {
        assert!(policy()
            .build_order(&signal(Direction::Flat, 0.0), 100.0, false)
            .is_err());
    }

    #[test]
    fn nonpositive_entry_price_rejected() {
        let err = policy()
            .build_order(&signal(Direction::Long, 0.9), 0.0, false)
            .unwrap_err();
        assert!(matches!(err, OrderRejection::InvalidStopPlacement { .. }));
    }
}
