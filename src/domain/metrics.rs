//! Summary statistics over the trade ledger and equity curve.

use serde::Serialize;

use super::account::{Account, EquityPoint};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const RISK_FREE_RATE: f64 = 0.02;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_trade_duration_days: f64,
    pub commission_paid: f64,
}

impl Summary {
    pub fn compute(account: &Account) -> Self {
        let initial_capital = account.initial_capital;
        let final_capital = account.capital;

        let total_return = if initial_capital > 0.0 {
            (final_capital - initial_capital) / initial_capital
        } else {
            0.0
        };

        let trading_days = account.equity_curve.len() as f64;
        let years = trading_days / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let max_drawdown = compute_drawdown(&account.equity_curve);
        let sharpe_ratio = compute_sharpe(&account.equity_curve);

        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut total_wins = 0.0;
        let mut total_losses = 0.0;
        let mut total_duration = 0.0;

        for trade in &account.trades {
            if trade.pnl > 0.0 {
                trades_won += 1;
                total_wins += trade.pnl;
            } else {
                trades_lost += 1;
                total_losses += trade.pnl.abs();
            }
            total_duration += trade.holding_days();
        }

        let total_trades = account.trades.len();
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let avg_win = if trades_won > 0 {
            total_wins / trades_won as f64
        } else {
            0.0
        };
        let avg_loss = if trades_lost > 0 {
            total_losses / trades_lost as f64
        } else {
            0.0
        };
        let avg_trade_duration_days = if total_trades > 0 {
            total_duration / total_trades as f64
        } else {
            0.0
        };

        Summary {
            initial_capital,
            final_capital,
            total_return,
            annualized_return,
            sharpe_ratio,
            max_drawdown,
            total_trades,
            trades_won,
            trades_lost,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            avg_trade_duration_days,
            commission_paid: account.total_commission(),
        }
    }
}

/// Deepest peak-to-trough decline of total equity (capital + unrealized),
/// as a fraction of the peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_dd = 0.0;

    for point in equity_curve {
        let equity = point.capital + point.unrealized_pnl;
        if equity > peak {
            peak = equity;
        } else if peak > 0.0 {
            let dd = (peak - equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

fn compute_sharpe(equity_curve: &[EquityPoint]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }

    let daily_rf = (1.0 + RISK_FREE_RATE).powf(1.0 / TRADING_DAYS_PER_YEAR) - 1.0;
    let excess: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].capital + w[0].unrealized_pnl;
            let curr = w[1].capital + w[1].unrealized_pnl;
            let ret = if prev > 0.0 { (curr - prev) / prev } else { 0.0 };
            ret - daily_rf
        })
        .collect();

    let n = excess.len() as f64;
    let mean = excess.iter().sum::<f64>() / n;
    let variance = excess.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        TRADING_DAYS_PER_YEAR.sqrt() * mean / stddev
    } else {
        0.0
    }
}
