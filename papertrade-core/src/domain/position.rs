//! Open position held by the ledger.

use serde::{Deserialize, Serialize};

use super::{Direction, Order};

/// One open position. At most one exists per portfolio at any time.
///
/// `entry_cost` is the cash moved out of the free balance when the position
/// opened (margin, before entry fees). `quantity` is the asset amount bought
/// or sold, fixed at entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub order: Order,
    pub quantity: f64,
    pub entry_cost: f64,
}

impl Position {
    /// Profit or loss if the position were closed at `price`, before exit fees.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        match self.order.direction {
            Direction::Long => self.quantity * (price - self.order.entry_price),
            Direction::Short => self.quantity * (self.order.entry_price - price),
            Direction::Flat => 0.0,
        }
    }

    /// Current value of the position at `price`: margin plus unrealized P&L.
    pub fn value_at(&self, price: f64) -> f64 {
        self.entry_cost + self.unrealized_pnl(price)
    }
}
