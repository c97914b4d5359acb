//! Simulated execution ledger.
//!
//! Owns the portfolio and is the only code allowed to mutate it. Every state
//! change is one of four operations: open a position from a validated order,
//! mark equity to market, fire a protective exit, or close on an opposing
//! signal. Everything else reads.
//!
//! Accounting model: opening moves `size_fraction x equity` out of free cash
//! as margin and charges the entry fee on that notional. While open, equity is
//! `cash + margin + unrealized P&L`. Closing returns the margin plus the P&L
//! at the exit price, minus the exit fee on exit notional.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{Candle, Direction, EquityPoint, ExitReason, Order, Portfolio, Position, Trade};
use crate::risk::RiskPolicy;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("cannot open: a position is already open")]
    PositionAlreadyOpen,
    #[error("cannot close: no position is open")]
    NoOpenPosition,
    #[error("order margin {required:.2} exceeds free cash {available:.2}")]
    InsufficientCash { required: f64, available: f64 },
}

/// Portfolio plus the policy that prices its fees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    policy: RiskPolicy,
    portfolio: Portfolio,
}

impl Ledger {
    pub fn new(policy: RiskPolicy) -> Self {
        let portfolio = Portfolio::new(policy.starting_balance);
        Self { policy, portfolio }
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    pub fn has_position(&self) -> bool {
        self.portfolio.has_position()
    }

    pub fn equity(&self, price: f64) -> f64 {
        self.portfolio.equity(price)
    }

    /// Open a position from a validated order. Margin is sized off equity at
    /// the entry price, which equals free cash here because no position can
    /// be open.
    pub fn apply_order(&mut self, order: Order) -> Result<(), LedgerError> {
        if self.portfolio.has_position() {
            return Err(LedgerError::PositionAlreadyOpen);
        }

        let margin = order.size_fraction * self.portfolio.cash;
        let entry_fee = margin * self.policy.fee_pct;
        let required = margin + entry_fee;
        if required > self.portfolio.cash {
            return Err(LedgerError::InsufficientCash {
                required,
                available: self.portfolio.cash,
            });
        }

        let quantity = margin / order.entry_price;
        debug!(
            strategy = %order.strategy_id,
            direction = ?order.direction,
            entry = order.entry_price,
            margin,
            quantity,
            "position opened"
        );

        self.portfolio.cash -= required;
        self.portfolio.position = Some(Position {
            order,
            quantity,
            entry_cost: margin,
        });
        Ok(())
    }

    /// Record one equity point at the candle close.
    pub fn mark_to_market(&mut self, candle: &Candle) {
        let equity = self.portfolio.equity(candle.close);
        self.portfolio.equity_curve.push(EquityPoint {
            timestamp: candle.timestamp,
            equity,
        });
    }

    /// Fire the protective exit if the candle's range touched it.
    ///
    /// The stop is checked before the target. When one candle spans both
    /// levels the stop wins, which is the pessimistic reading of intrabar
    /// ordering. Fills happen at the level itself.
    pub fn check_exits(&mut self, candle: &Candle) -> Option<Trade> {
        let position = self.portfolio.position.as_ref()?;
        let order = &position.order;

        let exit = match order.direction {
            Direction::Long => {
                if candle.low <= order.stop_loss {
                    Some((order.stop_loss, ExitReason::StopLoss))
                } else if candle.high >= order.take_profit {
                    Some((order.take_profit, ExitReason::TakeProfit))
                } else {
                    None
                }
            }
            Direction::Short => {
                if candle.high >= order.stop_loss {
                    Some((order.stop_loss, ExitReason::StopLoss))
                } else if candle.low <= order.take_profit {
                    Some((order.take_profit, ExitReason::TakeProfit))
                } else {
                    None
                }
            }
            Direction::Flat => None,
        };

        let (price, reason) = exit?;
        match self.close_position(price, candle.timestamp, reason) {
            Ok(trade) => Some(trade),
            // Unreachable: the position was just observed open.
            Err(_) => None,
        }
    }

    /// Close the open position at `price` and record the trade.
    pub fn close_position(
        &mut self,
        price: f64,
        closed_at: DateTime<Utc>,
        exit_reason: ExitReason,
    ) -> Result<Trade, LedgerError> {
        let position = self
            .portfolio
            .position
            .take()
            .ok_or(LedgerError::NoOpenPosition)?;

        let gross_pnl = position.unrealized_pnl(price);
        let entry_fee = position.entry_cost * self.policy.fee_pct;
        let exit_fee = position.quantity * price * self.policy.fee_pct;
        let proceeds = position.entry_cost + gross_pnl - exit_fee;
        self.portfolio.cash += proceeds;

        let trade = Trade {
            direction: position.order.direction,
            entry_price: position.order.entry_price,
            exit_price: price,
            quantity: position.quantity,
            size_fraction: position.order.size_fraction,
            gross_pnl,
            fees: entry_fee + exit_fee,
            realized_pnl: gross_pnl - entry_fee - exit_fee,
            opened_at: position.order.opened_at,
            closed_at,
            exit_reason,
            strategy_id: position.order.strategy_id.clone(),
        };
        debug!(
            strategy = %trade.strategy_id,
            reason = ?exit_reason,
            pnl = trade.realized_pnl,
            "position closed"
        );
        self.portfolio.trades.push(trade.clone());
        Ok(trade)
    }
}
