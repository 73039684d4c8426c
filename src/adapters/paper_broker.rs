//! In-process paper-trading broker.
//!
//! Fills every order at its reference price with the configured commission
//! and tracks the resulting positions, so the live loop can run end to end
//! without a real brokerage connection.

use std::collections::HashMap;

use crate::domain::error::KvantError;
use crate::domain::execution::{Fill, Order, OrderSide, Submission};
use crate::domain::signal::Direction;
use crate::ports::broker_port::{BrokerPort, BrokerPosition};

pub struct PaperBroker {
    commission_rate: f64,
    positions: HashMap<String, BrokerPosition>,
}

impl PaperBroker {
    pub fn new(commission_rate: f64) -> Self {
        PaperBroker {
            commission_rate,
            positions: HashMap::new(),
        }
    }
}

impl BrokerPort for PaperBroker {
    fn submit(&mut self, order: &Order) -> Submission {
        match order.side {
            OrderSide::Buy if !self.positions.contains_key(&order.symbol) => {
                self.positions.insert(
                    order.symbol.clone(),
                    BrokerPosition {
                        symbol: order.symbol.clone(),
                        direction: Direction::Long,
                        notional: order.notional,
                        entry_price: order.price,
                    },
                );
            }
            _ => {
                // Closing leg (or a sell opening a short); drop the tracked
                // position if one exists.
                self.positions.remove(&order.symbol);
            }
        }

        Submission::Filled(Fill {
            price: order.price,
            commission: order.notional * self.commission_rate,
            ts: order.ts,
        })
    }

    fn open_positions(&self) -> Result<Vec<BrokerPosition>, KvantError> {
        let mut positions: Vec<BrokerPosition> = self.positions.values().cloned().collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn order(symbol: &str, side: OrderSide, notional: f64, price: f64) -> Order {
        Order {
            symbol: symbol.into(),
            side,
            notional,
            price,
            ts: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn buy_opens_tracked_position() {
        let mut broker = PaperBroker::new(0.003);
        let submission = broker.submit(&order("SBER", OrderSide::Buy, 45000.0, 270.0));

        assert!(matches!(submission, Submission::Filled(_)));
        let positions = broker.open_positions().unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].symbol, "SBER");
        assert_eq!(positions[0].entry_price, 270.0);
    }

    #[test]
    fn sell_closes_tracked_position() {
        let mut broker = PaperBroker::new(0.003);
        broker.submit(&order("SBER", OrderSide::Buy, 45000.0, 270.0));
        broker.submit(&order("SBER", OrderSide::Sell, 46000.0, 276.0));

        assert!(broker.open_positions().unwrap().is_empty());
    }

    #[test]
    fn fill_carries_commission() {
        let mut broker = PaperBroker::new(0.003);
        match broker.submit(&order("SBER", OrderSide::Buy, 10000.0, 270.0)) {
            Submission::Filled(fill) => assert!((fill.commission - 30.0).abs() < 1e-9),
            Submission::Rejected(_) => panic!("paper broker never rejects"),
        }
    }

    #[test]
    fn open_positions_sorted_by_symbol() {
        let mut broker = PaperBroker::new(0.0);
        broker.submit(&order("SBER", OrderSide::Buy, 1000.0, 270.0));
        broker.submit(&order("GAZP", OrderSide::Buy, 1000.0, 160.0));

        let positions = broker.open_positions().unwrap();
        assert_eq!(positions[0].symbol, "GAZP");
        assert_eq!(positions[1].symbol, "SBER");
    }
}
