//! Trade lifecycle notification port trait.
//!
//! Fire-and-forget: delivery is off the decision path, implementations must
//! not block it and have no way to report failure back into it.

use chrono::NaiveDateTime;

use crate::domain::position::ExitReason;
use crate::domain::signal::Direction;

/// Structured trade lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeEvent {
    Entered {
        symbol: String,
        direction: Direction,
        price: f64,
        notional: f64,
        ts: NaiveDateTime,
    },
    Exited {
        symbol: String,
        reason: ExitReason,
        price: f64,
        pnl: f64,
        ts: NaiveDateTime,
    },
}

pub trait NotifyPort {
    fn notify(&self, event: &TradeEvent);
}

/// Sink for runs that carry no notifier.
pub struct NullNotifier;

impl NotifyPort for NullNotifier {
    fn notify(&self, _event: &TradeEvent) {}
}
