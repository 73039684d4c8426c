//! Shared capital pool, trade ledger and equity curve.
//!
//! The account is the single serialization point for money: every entry and
//! exit settles through the guarded debit/credit methods here, and a debit
//! that would push capital negative is refused outright, never clipped.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::position::Trade;

/// Aggregate account state at one timeline timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub ts: NaiveDateTime,
    pub capital: f64,
    pub unrealized_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub capital: f64,
    pub initial_capital: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Account {
    pub fn new(initial_capital: f64) -> Self {
        Account {
            capital: initial_capital,
            initial_capital,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Reserve entry cost (notional + commission). Refuses the debit if it
    /// would overdraw the pool; the caller treats that as a rejected fill.
    pub fn debit_entry(&mut self, notional: f64, commission: f64) -> bool {
        let cost = notional + commission;
        if cost > self.capital {
            return false;
        }
        self.capital -= cost;
        true
    }

    /// Settle an exit: return the entry notional plus the price PnL, minus
    /// the exit commission.
    pub fn credit_exit(&mut self, notional: f64, price_pnl: f64, commission: f64) {
        self.capital += notional + price_pnl - commission;
    }

    pub fn record_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn record_equity(&mut self, ts: NaiveDateTime, unrealized_pnl: f64) {
        self.equity_curve.push(EquityPoint {
            ts,
            capital: self.capital,
            unrealized_pnl,
        });
    }

    pub fn total_commission(&self) -> f64 {
        self.trades.iter().map(|t| t.commission_paid).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::ExitReason;
    use crate::domain::signal::Direction;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn new_account() {
        let account = Account::new(50000.0);
        assert_eq!(account.capital, 50000.0);
        assert_eq!(account.initial_capital, 50000.0);
        assert!(account.trades.is_empty());
        assert!(account.equity_curve.is_empty());
    }

    #[test]
    fn debit_entry_within_capital() {
        let mut account = Account::new(50000.0);
        assert!(account.debit_entry(45000.0, 135.0));
        assert!((account.capital - 4865.0).abs() < 1e-9);
    }

    #[test]
    fn debit_entry_overdraw_refused() {
        let mut account = Account::new(50000.0);
        assert!(!account.debit_entry(50000.0, 150.0));
        assert_eq!(account.capital, 50000.0);
    }

    #[test]
    fn debit_entry_exact_cost_allowed() {
        let mut account = Account::new(50000.0);
        assert!(account.debit_entry(49850.0, 150.0));
        assert!(account.capital.abs() < 1e-9);
    }

    #[test]
    fn credit_exit_round_trip() {
        let mut account = Account::new(50000.0);
        account.debit_entry(45000.0, 135.0);
        account.credit_exit(45000.0, 900.0, 137.7);
        // 50000 - 135 + 900 - 137.7
        assert!((account.capital - 50627.3).abs() < 1e-9);
    }

    #[test]
    fn record_equity_snapshots_capital() {
        let mut account = Account::new(50000.0);
        account.record_equity(ts(1), 0.0);
        account.capital = 48000.0;
        account.record_equity(ts(2), 1200.0);

        assert_eq!(account.equity_curve.len(), 2);
        assert_eq!(account.equity_curve[0].capital, 50000.0);
        assert_eq!(account.equity_curve[1].capital, 48000.0);
        assert_eq!(account.equity_curve[1].unrealized_pnl, 1200.0);
    }

    #[test]
    fn total_commission_sums_ledger() {
        let mut account = Account::new(50000.0);
        for (pnl, commission) in [(500.0, 270.0), (-300.0, 268.0)] {
            account.record_trade(Trade {
                symbol: "SBER".into(),
                direction: Direction::Long,
                notional: 45000.0,
                entry_ts: ts(1),
                entry_price: 100.0,
                exit_ts: ts(3),
                exit_price: 101.0,
                exit_reason: ExitReason::TakeProfit,
                pnl,
                commission_paid: commission,
            });
        }
        assert!((account.total_commission() - 538.0).abs() < 1e-9);
    }
}
