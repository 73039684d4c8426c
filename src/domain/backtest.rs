//! Bar-by-bar replay engine.
//!
//! Drives indicators → strategies → combiner → risk manager → execution over
//! historical bars, strictly in increasing timestamp order. Symbols are
//! validated independently: a symbol with broken data or too little history
//! is skipped with a recorded reason while the rest of the run proceeds.
//! All symbols share one capital pool; the account is the single
//! serialization point for money.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

use crate::ports::notify_port::{NotifyPort, TradeEvent};

use super::account::Account;
use super::bar::{validate_series, Bar};
use super::error::KvantError;
use super::execution::{ExecutionPort, Order, OrderSide, Submission};
use super::metrics::Summary;
use super::position::{ExitReason, Trade};
use super::risk::{EntryDecision, RiskManager};
use super::settings::Settings;
use super::signal::Direction;
use super::snapshot::IndicatorSet;
use super::strategy::{combiner, evaluate_all};

/// One symbol's historical bars, oldest first.
#[derive(Debug, Clone)]
pub struct SymbolSeries {
    pub symbol: String,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DataIntegrity { reason: String },
    InsufficientHistory { bars: usize, minimum: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub account: Account,
    pub summary: Summary,
    pub skipped: Vec<SkippedSymbol>,
}

struct ActiveSymbol {
    symbol: String,
    bars: Vec<Bar>,
    indicators: IndicatorSet,
    /// Cursor into `bars`, advanced along the unified timeline.
    cursor: usize,
}

/// Run the full pipeline over the given series with the supplied execution
/// implementation. Fails only when no symbol survives validation; per-symbol
/// failures are recorded in the result instead.
pub fn run_backtest(
    series: &[SymbolSeries],
    settings: &Settings,
    exec: &mut dyn ExecutionPort,
    notify: &dyn NotifyPort,
) -> Result<BacktestResult, KvantError> {
    let warmup = settings.indicator.warmup_bars();
    // Strategies need the previous snapshot too, hence warmup + 2 bars.
    let minimum = settings.min_data_points.max(warmup + 2);

    let mut active: Vec<ActiveSymbol> = Vec::new();
    let mut skipped: Vec<SkippedSymbol> = Vec::new();

    for s in series {
        if let Err(e) = validate_series(&s.bars) {
            warn!(symbol = %s.symbol, error = %e, "symbol skipped");
            let reason = match e {
                KvantError::DataIntegrity { reason, .. } => reason,
                other => other.to_string(),
            };
            skipped.push(SkippedSymbol {
                symbol: s.symbol.clone(),
                reason: SkipReason::DataIntegrity { reason },
            });
            continue;
        }
        if s.bars.len() < minimum {
            warn!(
                symbol = %s.symbol,
                bars = s.bars.len(),
                minimum,
                "symbol skipped: insufficient history"
            );
            skipped.push(SkippedSymbol {
                symbol: s.symbol.clone(),
                reason: SkipReason::InsufficientHistory {
                    bars: s.bars.len(),
                    minimum,
                },
            });
            continue;
        }

        active.push(ActiveSymbol {
            symbol: s.symbol.clone(),
            indicators: IndicatorSet::compute(&s.bars, &settings.indicator),
            bars: s.bars.clone(),
            cursor: 0,
        });
    }

    if active.is_empty() {
        // Single-symbol runs surface their own failure; multi-symbol runs
        // only fail outright when every symbol was skipped.
        if series.len() == 1 && skipped.len() == 1 {
            let symbol = skipped[0].symbol.clone();
            return Err(match &skipped[0].reason {
                SkipReason::DataIntegrity { reason } => KvantError::DataIntegrity {
                    symbol,
                    reason: reason.clone(),
                },
                SkipReason::InsufficientHistory { bars, minimum } => {
                    KvantError::InsufficientHistory {
                        symbol,
                        bars: *bars,
                        minimum: *minimum,
                    }
                }
            });
        }
        return Err(KvantError::InsufficientHistory {
            symbol: "all".into(),
            bars: series.iter().map(|s| s.bars.len()).max().unwrap_or(0),
            minimum,
        });
    }

    let timeline: BTreeSet<NaiveDateTime> = active
        .iter()
        .flat_map(|a| a.bars.iter().map(|b| b.ts))
        .collect();
    let Some(&last_ts) = timeline.iter().next_back() else {
        return Err(KvantError::InsufficientHistory {
            symbol: "all".into(),
            bars: 0,
            minimum,
        });
    };

    let mut risk = RiskManager::new(settings.risk.clone());
    let mut account = Account::new(settings.initial_capital);
    let mut entry_commissions: HashMap<String, f64> = HashMap::new();
    let mut last_close: HashMap<String, f64> = HashMap::new();
    let mut last_bar_ts: HashMap<String, NaiveDateTime> = HashMap::new();

    for ts in timeline {
        for idx in 0..active.len() {
            let (symbol, bar, i) = {
                let a = &active[idx];
                let Some(bar) = a.bars.get(a.cursor).filter(|b| b.ts == ts) else {
                    continue;
                };
                (a.symbol.clone(), bar.clone(), a.cursor)
            };
            active[idx].cursor += 1;
            last_close.insert(symbol.clone(), bar.close);
            last_bar_ts.insert(symbol.clone(), bar.ts);

            // Flat until both snapshots have left warmup; the indicator
            // series themselves refuse to produce partial values.
            let effective = if i >= 1 {
                let a = &active[idx];
                match (
                    a.indicators.snapshot_at(&a.bars, i - 1),
                    a.indicators.snapshot_at(&a.bars, i),
                ) {
                    (Ok(prev), Ok(curr)) => combiner::combine(
                        &evaluate_all(
                            &settings.active_strategies,
                            &settings.strategy,
                            &prev,
                            &curr,
                        ),
                        settings.strategy_mode,
                    ),
                    _ => Direction::Flat,
                }
            } else {
                Direction::Flat
            };

            if let Some(position) = risk.position(&symbol).cloned() {
                let opposing =
                    !effective.is_flat() && effective == position.direction.opposite();
                if let Some(reason) = risk.check_exit(&position, &bar, opposing) {
                    close_position(
                        &mut risk,
                        &mut account,
                        &mut entry_commissions,
                        exec,
                        notify,
                        &symbol,
                        bar.close,
                        bar.ts,
                        reason,
                    );
                } else {
                    risk.ratchet_trailing(&symbol, &bar);
                }
            } else if !effective.is_flat() {
                match risk.evaluate_entry(&symbol, account.capital) {
                    EntryDecision::Enter { notional } => {
                        let order = Order {
                            symbol: symbol.clone(),
                            side: match effective {
                                Direction::Short => OrderSide::Sell,
                                _ => OrderSide::Buy,
                            },
                            notional,
                            price: bar.close,
                            ts: bar.ts,
                        };
                        match exec.submit(&order) {
                            Submission::Filled(fill) => {
                                if account.debit_entry(notional, fill.commission) {
                                    risk.open_position(
                                        &symbol, effective, fill.price, notional, fill.ts,
                                    );
                                    entry_commissions.insert(symbol.clone(), fill.commission);
                                    notify.notify(&TradeEvent::Entered {
                                        symbol: symbol.clone(),
                                        direction: effective,
                                        price: fill.price,
                                        notional,
                                        ts: fill.ts,
                                    });
                                } else {
                                    warn!(
                                        %symbol,
                                        notional, "entry fill refused: would overdraw capital"
                                    );
                                }
                            }
                            Submission::Rejected(reason) => {
                                warn!(%symbol, %reason, "entry order rejected");
                            }
                        }
                    }
                    EntryDecision::Skip(_) => {}
                }
            }
        }

        // Forced close-out at the end of data, before the final equity point
        // so the curve ends flat. Normal exit checks on the final bar have
        // already run above, so a same-bar stop keeps its priority.
        if ts == last_ts {
            let mut open: Vec<String> = risk.positions().keys().cloned().collect();
            open.sort();
            for symbol in open {
                let price = last_close[&symbol];
                let close_ts = last_bar_ts[&symbol];
                close_position(
                    &mut risk,
                    &mut account,
                    &mut entry_commissions,
                    exec,
                    notify,
                    &symbol,
                    price,
                    close_ts,
                    ExitReason::EndOfData,
                );
            }
        }

        let unrealized: f64 = active
            .iter()
            .filter_map(|a| {
                let position = risk.position(&a.symbol)?;
                let price = last_close.get(&a.symbol)?;
                Some(position.unrealized_pnl(*price))
            })
            .sum();
        account.record_equity(ts, unrealized);
    }

    let summary = Summary::compute(&account);
    info!(
        trades = account.trades.len(),
        total_return = summary.total_return,
        "backtest finished"
    );

    Ok(BacktestResult {
        account,
        summary,
        skipped,
    })
}

/// Route an exit through the execution layer and settle it. A rejected exit
/// leaves the position open; the next bar retries via its own exit checks.
#[allow(clippy::too_many_arguments)]
fn close_position(
    risk: &mut RiskManager,
    account: &mut Account,
    entry_commissions: &mut HashMap<String, f64>,
    exec: &mut dyn ExecutionPort,
    notify: &dyn NotifyPort,
    symbol: &str,
    price: f64,
    ts: NaiveDateTime,
    reason: ExitReason,
) {
    let Some(position) = risk.position(symbol).cloned() else {
        return;
    };

    let order = Order {
        symbol: symbol.to_string(),
        side: match position.direction {
            Direction::Short => OrderSide::Buy,
            _ => OrderSide::Sell,
        },
        notional: position.market_value(price),
        price,
        ts,
    };

    match exec.submit(&order) {
        Submission::Filled(fill) => {
            let Some(position) = risk.close_position(symbol) else {
                return;
            };
            let entry_commission = entry_commissions.remove(symbol).unwrap_or(0.0);
            let price_pnl = position.unrealized_pnl(fill.price);

            account.credit_exit(position.notional, price_pnl, fill.commission);
            let trade = Trade {
                symbol: position.symbol.clone(),
                direction: position.direction,
                notional: position.notional,
                entry_ts: position.entry_ts,
                entry_price: position.entry_price,
                exit_ts: fill.ts,
                exit_price: fill.price,
                exit_reason: reason,
                pnl: price_pnl - entry_commission - fill.commission,
                commission_paid: entry_commission + fill.commission,
            };
            notify.notify(&TradeEvent::Exited {
                symbol: position.symbol.clone(),
                reason,
                price: fill.price,
                pnl: trade.pnl,
                ts: fill.ts,
            });
            account.record_trade(trade);
        }
        Submission::Rejected(reject) => {
            warn!(symbol, %reject, %reason, "exit order rejected, position stays open");
        }
    }
}
