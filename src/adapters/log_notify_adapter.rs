//! Notification adapter that writes trade lifecycle events to the log.
//!
//! Stands in for an external messaging collaborator; deployments wanting
//! push delivery implement [`NotifyPort`] over their own transport.

use tracing::info;

use crate::ports::notify_port::{NotifyPort, TradeEvent};

pub struct LogNotifyAdapter;

impl NotifyPort for LogNotifyAdapter {
    fn notify(&self, event: &TradeEvent) {
        match event {
            TradeEvent::Entered {
                symbol,
                direction,
                price,
                notional,
                ts,
            } => {
                info!(symbol, %direction, price, notional, %ts, "trade entered");
            }
            TradeEvent::Exited {
                symbol,
                reason,
                price,
                pnl,
                ts,
            } => {
                info!(symbol, %reason, price, pnl, %ts, "trade exited");
            }
        }
    }
}
