//! Virtual portfolio: cash, the open position, and the full trade history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Position, Trade};

/// Equity snapshot taken on every mark to market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Simulated account state.
///
/// At most one position may be open at a time; the ledger enforces this.
/// `equity_curve` grows by one point per marked candle and is the input to
/// drawdown and volatility statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub starting_balance: f64,
    pub cash: f64,
    pub position: Option<Position>,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
}

impl Portfolio {
    pub fn new(starting_balance: f64) -> Self {
        Self {
            starting_balance,
            cash: starting_balance,
            position: None,
            equity_curve: Vec::new(),
            trades: Vec::new(),
        }
    }

    /// Total account value at `price`: free cash plus open position value.
    pub fn equity(&self, price: f64) -> f64 {
        match &self.position {
            Some(pos) => self.cash + pos.value_at(price),
            None => self.cash,
        }
    }

    /// Total return over the starting balance, as a fraction.
    pub fn total_return(&self, price: f64) -> f64 {
        (self.equity(price) - self.starting_balance) / self.starting_balance
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_portfolio_equity_is_cash() {
        let p = Portfolio::new(100_000.0);
        assert_eq!(p.equity(123.0), 100_000.0);
        assert_eq!(p.total_return(123.0), 0.0);
        assert!(!p.has_position());
    }
}
