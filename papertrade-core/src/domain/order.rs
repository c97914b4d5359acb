//! Validated order, the only way a position gets opened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Direction, StrategyId};

/// An order that has already passed risk validation.
///
/// `size_fraction` is the fraction of current equity committed as margin.
/// `stop_loss` and `take_profit` are absolute price levels on the correct
/// side of `entry_price` for the given direction (enforced by the risk layer
/// before an `Order` is ever constructed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub direction: Direction,
    pub size_fraction: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub opened_at: DateTime<Utc>,
    pub strategy_id: StrategyId,
}
