//! Order placement contract and the simulated fill model.
//!
//! One contract, two variants: [`SimExecution`] here (used exclusively by the
//! backtest engine) and the broker-delegating live adapter in
//! `adapters::live_execution`. Run mode selects the variant once; strategy
//! and risk logic never branch on it.

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

/// A money-denominated market order. `price` is the reference price (the
/// current bar's close); `notional` is the money value to trade at it.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub symbol: String,
    pub side: OrderSide,
    pub notional: f64,
    pub price: f64,
    pub ts: NaiveDateTime,
}

/// Confirmation that an order executed.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub price: f64,
    pub commission: f64,
    pub ts: NaiveDateTime,
}

/// Why the execution layer refused an order. Never silently retried by this
/// core; retry policy belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    InsufficientFunds,
    Timeout,
    Broker(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InsufficientFunds => write!(f, "insufficient funds"),
            RejectReason::Timeout => write!(f, "timeout"),
            RejectReason::Broker(reason) => write!(f, "broker: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Filled(Fill),
    Rejected(RejectReason),
}

/// Uniform order-placement contract.
pub trait ExecutionPort {
    fn submit(&mut self, order: &Order) -> Submission;
}

/// Deterministic fill model for backtesting: every order fills at its
/// reference price (the bar close, slippage-free) and pays
/// `commission_rate × notional`.
#[derive(Debug, Clone)]
pub struct SimExecution {
    pub commission_rate: f64,
}

impl SimExecution {
    pub fn new(commission_rate: f64) -> Self {
        SimExecution { commission_rate }
    }
}

impl ExecutionPort for SimExecution {
    fn submit(&mut self, order: &Order) -> Submission {
        Submission::Filled(Fill {
            price: order.price,
            commission: order.notional * self.commission_rate,
            ts: order.ts,
        })
    }
}
