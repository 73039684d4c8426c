//! kvant: trading decision core with replayable backtesting.
//!
//! Hexagonal architecture: decision logic in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`]. The backtest engine
//! and the live polling loop drive the same strategy/risk code, so simulated
//! and live runs produce identical decisions for identical bars.

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
