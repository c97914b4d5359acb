//! Completed round-trip trade record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Direction, StrategyId};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    SignalClose,
}

/// One closed trade, recorded when a position exits.
///
/// `realized_pnl` is net of all fees charged for the round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub size_fraction: f64,
    pub gross_pnl: f64,
    pub fees: f64,
    pub realized_pnl: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub exit_reason: ExitReason,
    pub strategy_id: StrategyId,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.realized_pnl > 0.0
    }

    /// Net return relative to the margin committed at entry.
    pub fn return_on_margin(&self) -> f64 {
        let margin = self.quantity * self.entry_price;
        if margin > 0.0 {
            self.realized_pnl / margin
        } else {
            0.0
        }
    }
}
