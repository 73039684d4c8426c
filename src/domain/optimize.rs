//! Grid-search parameter optimization.
//!
//! Sweeps strategy and risk parameters over a grid, replays the backtest for
//! every combination and ranks the outcomes by a chosen metric. Combinations
//! that fail validation (ema_short >= ema_long, inverted RSI thresholds) are
//! skipped at generation time; combinations whose warmup outgrows the data
//! are skipped at evaluation time. Candidates run in parallel: each sweep
//! replay owns its settings and fill model, and the shared bar series is
//! read-only.

use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::ports::notify_port::NullNotifier;

use super::backtest::{run_backtest, SymbolSeries};
use super::error::KvantError;
use super::execution::SimExecution;
use super::metrics::Summary;
use super::settings::Settings;

/// The swept parameter values of one candidate, recorded alongside its
/// score so the report stays readable without the full settings dump.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamChoice {
    pub ema_short: usize,
    pub ema_long: usize,
    pub min_volume_factor: f64,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub bollinger_period: usize,
    pub bollinger_std: f64,
    pub stop_loss_percent: f64,
    pub take_profit_percent: f64,
}

impl ParamChoice {
    fn from_settings(settings: &Settings) -> Self {
        ParamChoice {
            ema_short: settings.indicator.ema_short,
            ema_long: settings.indicator.ema_long,
            min_volume_factor: settings.strategy.trend.min_volume_factor,
            rsi_period: settings.indicator.rsi_period,
            rsi_oversold: settings.strategy.reversal.rsi_oversold,
            rsi_overbought: settings.strategy.reversal.rsi_overbought,
            bollinger_period: settings.indicator.bollinger_period,
            bollinger_std: settings.indicator.bollinger_mult_x100 as f64 / 100.0,
            stop_loss_percent: settings.risk.stop_loss_percent,
            take_profit_percent: settings.risk.take_profit_percent,
        }
    }
}

/// One runnable parameter combination.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub choice: ParamChoice,
    pub settings: Settings,
}

/// Value ranges per parameter. An empty range pins the parameter to the
/// base settings value; the grid is the cartesian product of the non-empty
/// ranges with invalid combinations dropped.
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    pub ema_short: Vec<usize>,
    pub ema_long: Vec<usize>,
    pub min_volume_factor: Vec<f64>,
    pub rsi_period: Vec<usize>,
    pub rsi_oversold: Vec<f64>,
    pub rsi_overbought: Vec<f64>,
    pub bollinger_period: Vec<usize>,
    pub bollinger_std: Vec<f64>,
    pub stop_loss_percent: Vec<f64>,
    pub take_profit_percent: Vec<f64>,
}

impl ParamGrid {
    /// Stock ranges for tuning the trend strategy.
    pub fn trend() -> Self {
        ParamGrid {
            ema_short: vec![3, 5, 8, 10, 12],
            ema_long: vec![15, 20, 25, 30],
            min_volume_factor: vec![1.0, 1.5, 2.0, 2.5],
            stop_loss_percent: vec![1.5, 2.0, 2.5, 3.0],
            take_profit_percent: vec![3.0, 4.0, 5.0, 6.0, 7.0],
            ..ParamGrid::default()
        }
    }

    /// Stock ranges for tuning the reversal strategy.
    pub fn reversal() -> Self {
        ParamGrid {
            rsi_period: vec![7, 10, 14, 21],
            rsi_oversold: vec![20.0, 25.0, 30.0, 35.0],
            rsi_overbought: vec![65.0, 70.0, 75.0, 80.0],
            bollinger_period: vec![15, 20, 25],
            bollinger_std: vec![1.5, 2.0, 2.5],
            stop_loss_percent: vec![1.5, 2.0, 2.5, 3.0],
            take_profit_percent: vec![3.0, 4.0, 5.0, 6.0],
            ..ParamGrid::default()
        }
    }

    /// Coarser ranges for tuning both strategies together.
    pub fn combined() -> Self {
        ParamGrid {
            ema_short: vec![5, 8, 10],
            ema_long: vec![15, 20, 25],
            rsi_period: vec![10, 14, 21],
            rsi_oversold: vec![25.0, 30.0, 35.0],
            rsi_overbought: vec![65.0, 70.0, 75.0],
            stop_loss_percent: vec![2.0, 2.5, 3.0],
            take_profit_percent: vec![4.0, 5.0, 6.0],
            ..ParamGrid::default()
        }
    }

    /// All combinations over the base settings, invalid ones dropped.
    pub fn generate(&self, base: &Settings) -> Vec<Candidate> {
        let mut candidates = vec![Candidate {
            choice: ParamChoice::from_settings(base),
            settings: base.clone(),
        }];

        candidates = expand(candidates, &self.ema_short, |c, v| {
            c.settings.indicator.ema_short = v;
            c.choice.ema_short = v;
        });
        candidates = expand(candidates, &self.ema_long, |c, v| {
            c.settings.indicator.ema_long = v;
            c.choice.ema_long = v;
        });
        candidates = expand(candidates, &self.min_volume_factor, |c, v| {
            c.settings.strategy.trend.min_volume_factor = v;
            c.choice.min_volume_factor = v;
        });
        candidates = expand(candidates, &self.rsi_period, |c, v| {
            c.settings.indicator.rsi_period = v;
            c.choice.rsi_period = v;
        });
        candidates = expand(candidates, &self.rsi_oversold, |c, v| {
            c.settings.strategy.reversal.rsi_oversold = v;
            c.choice.rsi_oversold = v;
        });
        candidates = expand(candidates, &self.rsi_overbought, |c, v| {
            c.settings.strategy.reversal.rsi_overbought = v;
            c.choice.rsi_overbought = v;
        });
        candidates = expand(candidates, &self.bollinger_period, |c, v| {
            c.settings.indicator.bollinger_period = v;
            c.choice.bollinger_period = v;
        });
        candidates = expand(candidates, &self.bollinger_std, |c, v| {
            c.settings.indicator.bollinger_mult_x100 = (v * 100.0).round() as u32;
            c.choice.bollinger_std = v;
        });
        candidates = expand(candidates, &self.stop_loss_percent, |c, v| {
            c.settings.risk.stop_loss_percent = v;
            c.choice.stop_loss_percent = v;
        });
        candidates = expand(candidates, &self.take_profit_percent, |c, v| {
            c.settings.risk.take_profit_percent = v;
            c.choice.take_profit_percent = v;
        });

        candidates.retain(|c| c.settings.validate().is_ok());
        candidates
    }
}

fn expand<T, F>(candidates: Vec<Candidate>, values: &[T], apply: F) -> Vec<Candidate>
where
    T: Copy,
    F: Fn(&mut Candidate, T),
{
    if values.is_empty() {
        return candidates;
    }
    let mut expanded = Vec::with_capacity(candidates.len() * values.len());
    for candidate in &candidates {
        for &value in values {
            let mut next = candidate.clone();
            apply(&mut next, value);
            expanded.push(next);
        }
    }
    expanded
}

/// Metric the sweep ranks by. Higher is always better; drawdown is not
/// offered directly since minimizing it alone degenerates to never trading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeMetric {
    SharpeRatio,
    TotalReturn,
    WinRate,
    ProfitFactor,
}

impl OptimizeMetric {
    pub fn score(&self, summary: &Summary) -> f64 {
        match self {
            OptimizeMetric::SharpeRatio => summary.sharpe_ratio,
            OptimizeMetric::TotalReturn => summary.total_return,
            OptimizeMetric::WinRate => summary.win_rate,
            OptimizeMetric::ProfitFactor => summary.profit_factor,
        }
    }
}

impl FromStr for OptimizeMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sharpe_ratio" => Ok(OptimizeMetric::SharpeRatio),
            "total_return" => Ok(OptimizeMetric::TotalReturn),
            "win_rate" => Ok(OptimizeMetric::WinRate),
            "profit_factor" => Ok(OptimizeMetric::ProfitFactor),
            other => Err(format!("unknown optimization metric: {other}")),
        }
    }
}

impl fmt::Display for OptimizeMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizeMetric::SharpeRatio => write!(f, "sharpe_ratio"),
            OptimizeMetric::TotalReturn => write!(f, "total_return"),
            OptimizeMetric::WinRate => write!(f, "win_rate"),
            OptimizeMetric::ProfitFactor => write!(f, "profit_factor"),
        }
    }
}

/// One evaluated combination, in rank order within [`GridSearchResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub params: ParamChoice,
    pub score: f64,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSearchResult {
    pub metric: OptimizeMetric,
    pub combinations: usize,
    pub evaluated: usize,
    pub skipped: usize,
    /// Best first. Ties keep generation order, so reruns rank identically.
    pub ranked: Vec<RankedCandidate>,
}

impl GridSearchResult {
    pub fn best(&self) -> Option<&RankedCandidate> {
        self.ranked.first()
    }
}

/// Replay the backtest for every combination in the grid and rank the
/// outcomes. A combination that cannot run (warmup outgrew the data) is
/// skipped; the sweep fails only when no combination ran at all.
pub fn run_grid_search(
    series: &[SymbolSeries],
    base: &Settings,
    grid: &ParamGrid,
    metric: OptimizeMetric,
) -> Result<GridSearchResult, KvantError> {
    let candidates = grid.generate(base);
    if candidates.is_empty() {
        return Err(KvantError::ConfigInvalid {
            section: "optimizer".into(),
            key: "grid".into(),
            reason: "no valid parameter combination".into(),
        });
    }

    let combinations = candidates.len();
    info!(combinations, %metric, "starting grid search");

    let outcomes: Vec<Result<RankedCandidate, KvantError>> = candidates
        .par_iter()
        .map(|candidate| {
            let mut exec = SimExecution::new(candidate.settings.commission_rate);
            let result = run_backtest(series, &candidate.settings, &mut exec, &NullNotifier)?;
            Ok(RankedCandidate {
                params: candidate.choice.clone(),
                score: metric.score(&result.summary),
                summary: result.summary,
            })
        })
        .collect();

    let mut first_error = None;
    let mut ranked = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(candidate) => ranked.push(candidate),
            Err(e) => {
                debug!(error = %e, "combination skipped");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if ranked.is_empty() {
        return Err(first_error.unwrap_or(KvantError::ConfigInvalid {
            section: "optimizer".into(),
            key: "grid".into(),
            reason: "no combination produced a runnable backtest".into(),
        }));
    }

    let evaluated = ranked.len();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    info!(
        evaluated,
        skipped = combinations - evaluated,
        best = ranked[0].score,
        "grid search finished"
    );

    Ok(GridSearchResult {
        metric,
        combinations,
        evaluated,
        skipped: combinations - evaluated,
        ranked,
    })
}
