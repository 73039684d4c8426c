//! Brokerage port trait (live mode only).
//!
//! `submit` mirrors the execution contract; failures of any kind
//! (connectivity, rejected order, insufficient funds) surface as
//! `Submission::Rejected` with the broker's reason. `open_positions` feeds
//! startup reconciliation so a restarted session resumes managing positions
//! it opened in a previous run.

use crate::domain::error::KvantError;
use crate::domain::execution::{Order, Submission};
use crate::domain::signal::Direction;

/// A position as the brokerage reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerPosition {
    pub symbol: String,
    pub direction: Direction,
    pub notional: f64,
    pub entry_price: f64,
}

pub trait BrokerPort {
    fn submit(&mut self, order: &Order) -> Submission;

    fn open_positions(&self) -> Result<Vec<BrokerPosition>, KvantError>;
}
