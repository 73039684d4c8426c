//! Open positions and the closed-trade ledger.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

use super::signal::Direction;

/// Why a position left the book. Ordering of the variants mirrors the exit
/// priority: when several conditions hold on the same bar, the first in this
/// order is the one reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TrailingStop,
    TakeProfit,
    MaxHoldingDays,
    OpposingSignal,
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::MaxHoldingDays => "max_holding_days",
            ExitReason::OpposingSignal => "opposing_signal",
            ExitReason::EndOfData => "end_of_data",
        };
        write!(f, "{name}")
    }
}

/// One open position. Created on an entry fill, mutated each bar by the
/// trailing-stop ratchet, destroyed on the exit fill. At most one per symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub direction: Direction,
    /// Money allocated at entry (fractional sizing; no share counts).
    pub notional: f64,
    pub entry_price: f64,
    pub entry_ts: NaiveDateTime,
    pub stop_loss: f64,
    pub trailing_stop: f64,
    pub take_profit: f64,
    /// Most favorable price seen since entry; anchor for the ratchet.
    pub best_price: f64,
    pub max_exit_ts: NaiveDateTime,
}

impl Position {
    /// The stop level currently in force: the trailing stop never loosens,
    /// so it is the binding level once it has ratcheted past the initial
    /// stop, and equal to it before that.
    pub fn effective_stop(&self) -> f64 {
        self.trailing_stop
    }

    /// Whether the trailing stop has ratcheted away from the initial stop.
    pub fn trailing_engaged(&self) -> bool {
        match self.direction {
            Direction::Long => self.trailing_stop > self.stop_loss,
            Direction::Short => self.trailing_stop < self.stop_loss,
            Direction::Flat => false,
        }
    }

    /// Unrealized PnL of the allocated notional at `price`.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        let change = (price - self.entry_price) / self.entry_price;
        match self.direction {
            Direction::Long => self.notional * change,
            Direction::Short => -self.notional * change,
            Direction::Flat => 0.0,
        }
    }

    /// Market value of the position at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        self.notional * (price / self.entry_price)
    }
}

/// Append-only record of a completed position lifecycle. Exactly one per
/// closed position; the ledger feeds the backtest metrics and the report
/// sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub symbol: String,
    pub direction: Direction,
    pub notional: f64,
    pub entry_ts: NaiveDateTime,
    pub entry_price: f64,
    pub exit_ts: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    /// Net of round-trip commissions.
    pub pnl: f64,
    pub commission_paid: f64,
}

impl Trade {
    pub fn holding_days(&self) -> f64 {
        (self.exit_ts - self.entry_ts).num_seconds() as f64 / 86_400.0
    }
}
