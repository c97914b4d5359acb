//! Domain types for PaperTrade.

pub mod candle;
pub mod ids;
pub mod order;
pub mod portfolio;
pub mod position;
pub mod signal;
pub mod timeframe;
pub mod trade;

pub use candle::Candle;
pub use ids::StrategyId;
pub use order::Order;
pub use portfolio::{EquityPoint, Portfolio};
pub use position::Position;
pub use signal::{Direction, Signal};
pub use timeframe::Timeframe;
pub use trade::{ExitReason, Trade};
