//! Strategy engine: a closed set of signal generators plus the combiner.
//!
//! The combiner's any/all semantics iterate a known, ordered strategy set,
//! so the variants are a closed enum rather than trait objects. Each variant
//! evaluates the previous and current indicator snapshot and votes a
//! direction; both the backtest engine and the live loop call the same code.

pub mod combiner;
pub mod reversal;
pub mod trend;

use std::fmt;
use std::str::FromStr;

use super::signal::{Direction, Signal};
use super::snapshot::IndicatorSnapshot;

/// Thresholds for the Trend strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendParams {
    pub min_volume_factor: f64,
}

/// Thresholds for the Reversal strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct ReversalParams {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
}

/// Per-strategy thresholds, passed to every evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub trend: TrendParams,
    pub reversal: ReversalParams,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            trend: TrendParams {
                min_volume_factor: 1.2,
            },
            reversal: ReversalParams {
                rsi_oversold: 30.0,
                rsi_overbought: 70.0,
            },
        }
    }
}

/// The closed set of strategy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Trend,
    Reversal,
}

impl StrategyKind {
    /// Evaluate this strategy over consecutive snapshots of the same symbol.
    pub fn evaluate(
        &self,
        params: &StrategyParams,
        prev: &IndicatorSnapshot,
        curr: &IndicatorSnapshot,
    ) -> Signal {
        let direction = match self {
            StrategyKind::Trend => trend::evaluate(&params.trend, prev, curr),
            StrategyKind::Reversal => reversal::evaluate(&params.reversal, curr),
        };
        Signal {
            strategy: *self,
            direction,
            ts: curr.ts,
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trend" => Ok(StrategyKind::Trend),
            "reversal" => Ok(StrategyKind::Reversal),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Trend => write!(f, "trend"),
            StrategyKind::Reversal => write!(f, "reversal"),
        }
    }
}

/// Parse a comma-separated strategy list, preserving order and rejecting
/// duplicates; the order is the combiner's tie-break order.
pub fn parse_strategies(input: &str) -> Result<Vec<StrategyKind>, String> {
    let mut kinds = Vec::new();
    for token in input.split(',') {
        let kind: StrategyKind = token.parse()?;
        if kinds.contains(&kind) {
            return Err(format!("duplicate strategy: {kind}"));
        }
        kinds.push(kind);
    }
    if kinds.is_empty() {
        return Err("empty strategy list".into());
    }
    Ok(kinds)
}

/// Evaluate all active strategies in configured order. Signal order mirrors
/// `active` so the combiner's first-match rule is deterministic.
pub fn evaluate_all(
    active: &[StrategyKind],
    params: &StrategyParams,
    prev: &IndicatorSnapshot,
    curr: &IndicatorSnapshot,
) -> Vec<Signal> {
    active
        .iter()
        .map(|kind| kind.evaluate(params, prev, curr))
        .collect()
}
