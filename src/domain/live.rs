//! Live decision loop: one polling pass per interval.
//!
//! Runs the identical strategy/combiner/risk code the backtest engine runs,
//! against the market-data port and whatever execution implementation the
//! caller selected (paper broker in-tree, a real brokerage adapter outside).
//! Wall-clock time enters only through the `now` parameter supplied by the
//! loop driver; the decision functions themselves stay deterministic.

use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::ports::broker_port::BrokerPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::notify_port::{NotifyPort, TradeEvent};

use super::bar::{validate_series, Bar};
use super::error::KvantError;
use super::execution::{ExecutionPort, Order, OrderSide, Submission};
use super::position::ExitReason;
use super::risk::{EntryDecision, RiskManager};
use super::settings::{Settings, Timeframe};
use super::signal::Direction;
use super::snapshot::IndicatorSet;
use super::strategy::{combiner, evaluate_all};

pub struct LiveSession {
    settings: Settings,
    risk: RiskManager,
    capital: f64,
    entry_commissions: HashMap<String, f64>,
}

impl LiveSession {
    pub fn new(settings: Settings) -> Self {
        let capital = settings.initial_capital;
        let risk = RiskManager::new(settings.risk.clone());
        LiveSession {
            settings,
            risk,
            capital,
            entry_commissions: HashMap::new(),
        }
    }

    pub fn open_count(&self) -> usize {
        self.risk.open_count()
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    /// Adopt positions the brokerage reports at startup so a restarted
    /// session resumes managing them. Holding-time limits restart from
    /// `now`; the broker does not report entry times.
    pub fn reconcile(
        &mut self,
        broker: &dyn BrokerPort,
        now: NaiveDateTime,
    ) -> Result<usize, KvantError> {
        let positions = broker.open_positions()?;
        let count = positions.len();
        for p in positions {
            self.risk
                .open_position(&p.symbol, p.direction, p.entry_price, p.notional, now);
            info!(symbol = %p.symbol, direction = %p.direction, "position adopted from broker");
        }
        Ok(count)
    }

    /// One decision pass over every configured symbol: fetch bars, validate,
    /// evaluate, gate, submit, notify. A symbol with broken or short data is
    /// skipped this pass; the others proceed.
    pub fn poll_once(
        &mut self,
        data: &dyn MarketDataPort,
        exec: &mut dyn ExecutionPort,
        notify: &dyn NotifyPort,
        now: NaiveDateTime,
    ) -> Result<(), KvantError> {
        let warmup = self.settings.indicator.warmup_bars();
        let minimum = self.settings.min_data_points.max(warmup + 2);

        let bar_span = match self.settings.timeframe {
            Timeframe::Hour => Duration::hours(1),
            Timeframe::Day => Duration::days(1),
        };
        // Generous fetch window: weekends and holidays thin out the series.
        let start = now - bar_span * (minimum as i32 * 3);

        for symbol in self.settings.symbols.clone() {
            let bars = match data.fetch_bars(&symbol, self.settings.timeframe, start, now) {
                Ok(bars) => bars,
                Err(e) => {
                    warn!(%symbol, error = %e, "fetch failed, symbol skipped this pass");
                    continue;
                }
            };
            if let Err(e) = validate_series(&bars) {
                warn!(%symbol, error = %e, "integrity violation, symbol skipped this pass");
                continue;
            }
            if bars.len() < minimum {
                warn!(
                    %symbol,
                    bars = bars.len(),
                    minimum,
                    "not enough history yet, symbol skipped this pass"
                );
                continue;
            }

            self.decide(&symbol, &bars, exec, notify);
        }

        Ok(())
    }

    fn decide(
        &mut self,
        symbol: &str,
        bars: &[Bar],
        exec: &mut dyn ExecutionPort,
        notify: &dyn NotifyPort,
    ) {
        let indicators = IndicatorSet::compute(bars, &self.settings.indicator);
        let i = bars.len() - 1;
        let bar = &bars[i];

        let effective = match (
            indicators.snapshot_at(bars, i - 1),
            indicators.snapshot_at(bars, i),
        ) {
            (Ok(prev), Ok(curr)) => combiner::combine(
                &evaluate_all(
                    &self.settings.active_strategies,
                    &self.settings.strategy,
                    &prev,
                    &curr,
                ),
                self.settings.strategy_mode,
            ),
            _ => Direction::Flat,
        };

        if let Some(position) = self.risk.position(symbol).cloned() {
            let opposing = !effective.is_flat() && effective == position.direction.opposite();
            if let Some(reason) = self.risk.check_exit(&position, bar, opposing) {
                self.exit(symbol, bar, reason, exec, notify);
            } else {
                self.risk.ratchet_trailing(symbol, bar);
            }
        } else if !effective.is_flat() {
            self.enter(symbol, effective, bar, exec, notify);
        }
    }

    fn enter(
        &mut self,
        symbol: &str,
        direction: Direction,
        bar: &Bar,
        exec: &mut dyn ExecutionPort,
        notify: &dyn NotifyPort,
    ) {
        let EntryDecision::Enter { notional } = self.risk.evaluate_entry(symbol, self.capital)
        else {
            return;
        };

        let order = Order {
            symbol: symbol.to_string(),
            side: match direction {
                Direction::Short => OrderSide::Sell,
                _ => OrderSide::Buy,
            },
            notional,
            price: bar.close,
            ts: bar.ts,
        };

        match exec.submit(&order) {
            Submission::Filled(fill) => {
                let cost = notional + fill.commission;
                if cost > self.capital {
                    warn!(symbol, notional, "entry fill refused: would overdraw capital");
                    return;
                }
                self.capital -= cost;
                self.risk
                    .open_position(symbol, direction, fill.price, notional, fill.ts);
                self.entry_commissions
                    .insert(symbol.to_string(), fill.commission);
                notify.notify(&TradeEvent::Entered {
                    symbol: symbol.to_string(),
                    direction,
                    price: fill.price,
                    notional,
                    ts: fill.ts,
                });
            }
            Submission::Rejected(reason) => {
                warn!(symbol, %reason, "entry order rejected");
            }
        }
    }

    fn exit(
        &mut self,
        symbol: &str,
        bar: &Bar,
        reason: ExitReason,
        exec: &mut dyn ExecutionPort,
        notify: &dyn NotifyPort,
    ) {
        let Some(position) = self.risk.position(symbol).cloned() else {
            return;
        };

        let order = Order {
            symbol: symbol.to_string(),
            side: match position.direction {
                Direction::Short => OrderSide::Buy,
                _ => OrderSide::Sell,
            },
            notional: position.market_value(bar.close),
            price: bar.close,
            ts: bar.ts,
        };

        match exec.submit(&order) {
            Submission::Filled(fill) => {
                let Some(position) = self.risk.close_position(symbol) else {
                    return;
                };
                let entry_commission = self.entry_commissions.remove(symbol).unwrap_or(0.0);
                let price_pnl = position.unrealized_pnl(fill.price);
                self.capital += position.notional + price_pnl - fill.commission;

                notify.notify(&TradeEvent::Exited {
                    symbol: symbol.to_string(),
                    reason,
                    price: fill.price,
                    pnl: price_pnl - entry_commission - fill.commission,
                    ts: fill.ts,
                });
            }
            Submission::Rejected(reject) => {
                warn!(symbol, %reject, %reason, "exit order rejected, position stays open");
            }
        }
    }
}
