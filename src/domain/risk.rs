//! Risk management: entry gating, sizing, protective levels, exit priority.
//!
//! Per-symbol lifecycle: flat → entering → open → exiting → flat. The risk
//! manager owns the open-position table and is the only writer of stop,
//! trailing-stop and take-profit levels. Percent parameters are denominated
//! in percent (2.0 = 2%) and divided by 100 at use.

use chrono::Duration;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use tracing::{debug, info};

use super::bar::Bar;
use super::position::{ExitReason, Position};
use super::signal::Direction;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskParams {
    pub stop_loss_percent: f64,
    pub trailing_stop_percent: f64,
    pub take_profit_percent: f64,
    /// Fraction of free capital allocated per position, in (0, 1].
    pub max_position_size: f64,
    /// System-wide cap on simultaneous open positions, across all symbols.
    pub max_positions: usize,
    pub max_holding_days: i64,
    /// Entry sizing leaves headroom for the entry commission so the fill can
    /// never overdraw the capital pool.
    pub commission_rate: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        RiskParams {
            stop_loss_percent: 2.0,
            trailing_stop_percent: 1.5,
            take_profit_percent: 4.0,
            max_position_size: 0.9,
            max_positions: 1,
            max_holding_days: 7,
            commission_rate: 0.003,
        }
    }
}

/// Outcome of entry gating. Skips are recorded outcomes, not errors: the
/// signal is dropped (never queued) and evaluation continues next bar.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryDecision {
    Enter { notional: f64 },
    Skip(SkipCause),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipCause {
    AlreadyOpen,
    CapacityExceeded,
    InsufficientCapital,
}

#[derive(Debug)]
pub struct RiskManager {
    params: RiskParams,
    positions: HashMap<String, Position>,
}

impl RiskManager {
    pub fn new(params: RiskParams) -> Self {
        RiskManager {
            params,
            positions: HashMap::new(),
        }
    }

    pub fn params(&self) -> &RiskParams {
        &self.params
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> &HashMap<String, Position> {
        &self.positions
    }

    pub fn open_count(&self) -> usize {
        self.positions.len()
    }

    /// Gate a non-flat effective signal and size the entry from free
    /// capital. The notional is capped so notional + entry commission can
    /// never exceed the pool.
    pub fn evaluate_entry(&self, symbol: &str, free_capital: f64) -> EntryDecision {
        if self.positions.contains_key(symbol) {
            return EntryDecision::Skip(SkipCause::AlreadyOpen);
        }
        if self.positions.len() >= self.params.max_positions {
            info!(
                symbol,
                open = self.positions.len(),
                cap = self.params.max_positions,
                "entry dropped: position cap reached"
            );
            return EntryDecision::Skip(SkipCause::CapacityExceeded);
        }

        let sized = free_capital * self.params.max_position_size;
        let notional = sized.min(free_capital / (1.0 + self.params.commission_rate));
        if notional <= 0.0 {
            return EntryDecision::Skip(SkipCause::InsufficientCapital);
        }

        EntryDecision::Enter { notional }
    }

    /// Register a filled entry: compute protective levels and insert the
    /// position. Stop and take-profit are mirrored for shorts; the trailing
    /// stop starts at the initial stop and only ever ratchets.
    pub fn open_position(
        &mut self,
        symbol: &str,
        direction: Direction,
        fill_price: f64,
        notional: f64,
        ts: NaiveDateTime,
    ) -> &Position {
        let slp = self.params.stop_loss_percent / 100.0;
        let tpp = self.params.take_profit_percent / 100.0;

        let (stop_loss, take_profit) = match direction {
            Direction::Short => (fill_price * (1.0 + slp), fill_price * (1.0 - tpp)),
            _ => (fill_price * (1.0 - slp), fill_price * (1.0 + tpp)),
        };

        let position = Position {
            symbol: symbol.to_string(),
            direction,
            notional,
            entry_price: fill_price,
            entry_ts: ts,
            stop_loss,
            trailing_stop: stop_loss,
            take_profit,
            best_price: fill_price,
            max_exit_ts: ts + Duration::days(self.params.max_holding_days),
        };

        debug!(
            symbol,
            %direction,
            price = fill_price,
            stop = stop_loss,
            take = take_profit,
            "position opened"
        );

        self.positions.insert(symbol.to_string(), position);
        &self.positions[symbol]
    }

    /// First matching exit condition in priority order, or None to stay
    /// open. Stops and take-profits trigger on intrabar extremes; only one
    /// exit executes per bar even when several conditions hold.
    pub fn check_exit(
        &self,
        position: &Position,
        bar: &Bar,
        opposing_signal: bool,
    ) -> Option<ExitReason> {
        let stop = position.effective_stop();

        let stop_hit = match position.direction {
            Direction::Long => bar.low <= stop,
            Direction::Short => bar.high >= stop,
            Direction::Flat => false,
        };
        if stop_hit {
            return Some(if position.trailing_engaged() {
                ExitReason::TrailingStop
            } else {
                ExitReason::StopLoss
            });
        }

        let take_hit = match position.direction {
            Direction::Long => bar.high >= position.take_profit,
            Direction::Short => bar.low <= position.take_profit,
            Direction::Flat => false,
        };
        if take_hit {
            return Some(ExitReason::TakeProfit);
        }

        if bar.ts >= position.max_exit_ts {
            return Some(ExitReason::MaxHoldingDays);
        }

        if opposing_signal {
            return Some(ExitReason::OpposingSignal);
        }

        None
    }

    /// Ingest the bar's favorable extreme and ratchet the trailing stop.
    /// The level only ever tightens: up for longs, down for shorts.
    pub fn ratchet_trailing(&mut self, symbol: &str, bar: &Bar) {
        let tsp = self.params.trailing_stop_percent / 100.0;
        let Some(position) = self.positions.get_mut(symbol) else {
            return;
        };

        match position.direction {
            Direction::Long => {
                if bar.high > position.best_price {
                    position.best_price = bar.high;
                    let candidate = position.best_price * (1.0 - tsp);
                    if candidate > position.trailing_stop {
                        debug!(symbol, level = candidate, "trailing stop raised");
                        position.trailing_stop = candidate;
                    }
                }
            }
            Direction::Short => {
                if bar.low < position.best_price {
                    position.best_price = bar.low;
                    let candidate = position.best_price * (1.0 + tsp);
                    if candidate < position.trailing_stop {
                        debug!(symbol, level = candidate, "trailing stop lowered");
                        position.trailing_stop = candidate;
                    }
                }
            }
            Direction::Flat => {}
        }
    }

    /// Free the symbol's slot. The caller turns the returned position into
    /// exactly one trade record.
    pub fn close_position(&mut self, symbol: &str) -> Option<Position> {
        self.positions.remove(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn bar(day: u32, low: f64, high: f64, close: f64) -> Bar {
        Bar {
            symbol: "SBER".into(),
            ts: ts(day),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    fn manager() -> RiskManager {
        RiskManager::new(RiskParams::default())
    }

    #[test]
    fn entry_sizing_uses_position_fraction() {
        let rm = manager();
        match rm.evaluate_entry("SBER", 50000.0) {
            EntryDecision::Enter { notional } => {
                assert!((notional - 45000.0).abs() < 1e-9);
            }
            other => panic!("expected entry, got {:?}", other),
        }
    }

    #[test]
    fn entry_sizing_leaves_commission_headroom() {
        let rm = RiskManager::new(RiskParams {
            max_position_size: 1.0,
            ..RiskParams::default()
        });
        match rm.evaluate_entry("SBER", 50000.0) {
            EntryDecision::Enter { notional } => {
                // notional * (1 + rate) must fit in the pool
                assert!(notional * 1.003 <= 50000.0 + 1e-9);
            }
            other => panic!("expected entry, got {:?}", other),
        }
    }

    #[test]
    fn entry_blocked_when_symbol_open() {
        let mut rm = manager();
        rm.open_position("SBER", Direction::Long, 100.0, 45000.0, ts(1));
        assert_eq!(
            rm.evaluate_entry("SBER", 5000.0),
            EntryDecision::Skip(SkipCause::AlreadyOpen)
        );
    }

    #[test]
    fn entry_blocked_at_position_cap() {
        let mut rm = manager();
        rm.open_position("SBER", Direction::Long, 100.0, 45000.0, ts(1));
        assert_eq!(
            rm.evaluate_entry("GAZP", 5000.0),
            EntryDecision::Skip(SkipCause::CapacityExceeded)
        );
    }

    #[test]
    fn entry_blocked_without_capital() {
        let rm = manager();
        assert_eq!(
            rm.evaluate_entry("SBER", 0.0),
            EntryDecision::Skip(SkipCause::InsufficientCapital)
        );
    }

    #[test]
    fn open_position_sets_long_levels() {
        let mut rm = manager();
        let pos = rm.open_position("SBER", Direction::Long, 100.0, 45000.0, ts(10));

        assert!((pos.stop_loss - 98.0).abs() < 1e-9);
        assert!((pos.take_profit - 104.0).abs() < 1e-9);
        assert_eq!(pos.trailing_stop, pos.stop_loss);
        assert_eq!(pos.best_price, 100.0);
        assert_eq!(pos.max_exit_ts, ts(17));
    }

    #[test]
    fn open_position_mirrors_short_levels() {
        let mut rm = manager();
        let pos = rm.open_position("SBER", Direction::Short, 100.0, 45000.0, ts(10));

        assert!((pos.stop_loss - 102.0).abs() < 1e-9);
        assert!((pos.take_profit - 96.0).abs() < 1e-9);
        assert_eq!(pos.trailing_stop, pos.stop_loss);
    }

    #[test]
    fn stop_loss_has_top_priority() {
        let mut rm = manager();
        rm.open_position("SBER", Direction::Long, 100.0, 45000.0, ts(10));
        let pos = rm.position("SBER").unwrap().clone();

        // Wide bar breaches stop AND take-profit AND holding limit; stop wins.
        let wild = bar(20, 97.0, 105.0, 101.0);
        assert_eq!(
            rm.check_exit(&pos, &wild, true),
            Some(ExitReason::StopLoss)
        );
    }

    #[test]
    fn take_profit_before_holding_limit() {
        let mut rm = manager();
        rm.open_position("SBER", Direction::Long, 100.0, 45000.0, ts(10));
        let pos = rm.position("SBER").unwrap().clone();

        let profit_late = bar(20, 103.0, 105.0, 104.5);
        assert_eq!(
            rm.check_exit(&pos, &profit_late, true),
            Some(ExitReason::TakeProfit)
        );
    }

    #[test]
    fn holding_limit_before_opposing_signal() {
        let mut rm = manager();
        rm.open_position("SBER", Direction::Long, 100.0, 45000.0, ts(10));
        let pos = rm.position("SBER").unwrap().clone();

        let quiet_late = bar(17, 100.0, 101.0, 100.5);
        assert_eq!(
            rm.check_exit(&pos, &quiet_late, true),
            Some(ExitReason::MaxHoldingDays)
        );
    }

    #[test]
    fn opposing_signal_last() {
        let mut rm = manager();
        rm.open_position("SBER", Direction::Long, 100.0, 45000.0, ts(10));
        let pos = rm.position("SBER").unwrap().clone();

        let quiet = bar(12, 100.0, 101.0, 100.5);
        assert_eq!(
            rm.check_exit(&pos, &quiet, true),
            Some(ExitReason::OpposingSignal)
        );
        assert_eq!(rm.check_exit(&pos, &quiet, false), None);
    }

    #[test]
    fn holding_limit_boundary() {
        let mut rm = manager();
        rm.open_position("SBER", Direction::Long, 100.0, 45000.0, ts(10));
        let pos = rm.position("SBER").unwrap().clone();

        assert_eq!(rm.check_exit(&pos, &bar(16, 100.0, 101.0, 100.5), false), None);
        assert_eq!(
            rm.check_exit(&pos, &bar(17, 100.0, 101.0, 100.5), false),
            Some(ExitReason::MaxHoldingDays)
        );
    }

    #[test]
    fn ratchet_raises_trailing_on_new_high() {
        let mut rm = manager();
        rm.open_position("SBER", Direction::Long, 100.0, 45000.0, ts(10));

        rm.ratchet_trailing("SBER", &bar(11, 101.0, 106.0, 105.0));
        let pos = rm.position("SBER").unwrap();
        // best 106 → trailing 106 * 0.985
        assert!((pos.trailing_stop - 106.0 * 0.985).abs() < 1e-9);
        assert!(pos.trailing_engaged());
    }

    #[test]
    fn ratchet_never_loosens() {
        let mut rm = manager();
        rm.open_position("SBER", Direction::Long, 100.0, 45000.0, ts(10));

        rm.ratchet_trailing("SBER", &bar(11, 101.0, 110.0, 108.0));
        let high_level = rm.position("SBER").unwrap().trailing_stop;

        rm.ratchet_trailing("SBER", &bar(12, 99.0, 103.0, 100.0));
        assert_eq!(rm.position("SBER").unwrap().trailing_stop, high_level);
    }

    #[test]
    fn ratchet_short_lowers_trailing() {
        let mut rm = manager();
        rm.open_position("SBER", Direction::Short, 100.0, 45000.0, ts(10));

        rm.ratchet_trailing("SBER", &bar(11, 94.0, 99.0, 95.0));
        let pos = rm.position("SBER").unwrap();
        assert!((pos.trailing_stop - 94.0 * 1.015).abs() < 1e-9);

        rm.ratchet_trailing("SBER", &bar(12, 97.0, 101.0, 100.0));
        assert!((rm.position("SBER").unwrap().trailing_stop - 94.0 * 1.015).abs() < 1e-9);
    }

    #[test]
    fn trailing_stop_exit_reported_once_engaged() {
        let mut rm = manager();
        rm.open_position("SBER", Direction::Long, 100.0, 45000.0, ts(10));
        rm.ratchet_trailing("SBER", &bar(11, 101.0, 110.0, 108.0));
        let pos = rm.position("SBER").unwrap().clone();

        // trailing is now 108.35; a dip through it is a trailing exit
        let dip = bar(12, 107.0, 109.0, 107.5);
        assert_eq!(
            rm.check_exit(&pos, &dip, false),
            Some(ExitReason::TrailingStop)
        );
    }

    #[test]
    fn close_position_frees_slot() {
        let mut rm = manager();
        rm.open_position("SBER", Direction::Long, 100.0, 45000.0, ts(10));
        assert_eq!(rm.open_count(), 1);

        let closed = rm.close_position("SBER").unwrap();
        assert_eq!(closed.symbol, "SBER");
        assert_eq!(rm.open_count(), 0);
        assert!(rm.close_position("SBER").is_none());

        // Slot freed: a new entry for the symbol passes gating again.
        assert!(matches!(
            rm.evaluate_entry("SBER", 5000.0),
            EntryDecision::Enter { .. }
        ));
    }
}
