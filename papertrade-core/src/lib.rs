//! PaperTrade Core — the strategy evaluation and paper-trading execution engine.
//!
//! This crate contains the heart of the simulator:
//! - Domain types (candles, signals, orders, positions, trades, portfolio)
//! - Strategy families behind a single evaluation capability
//! - Risk policy and position sizing with typed rejections
//! - The virtual ledger (the only owner of portfolio mutation)
//! - The shared per-tick decision pipeline used by both the live loop
//!   and the backtest replay (no train/live skew)
//! - Market feed abstraction with CSV-backed history and replay/synthetic feeds

pub mod backtest;
pub mod domain;
pub mod feed;
pub mod ledger;
pub mod pipeline;
pub mod risk;
pub mod strategy;
