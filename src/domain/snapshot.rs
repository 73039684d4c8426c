//! Per-bar indicator snapshot assembly.
//!
//! [`IndicatorSet::compute`] runs every configured indicator over the full
//! bar history once; [`IndicatorSet::snapshot_at`] then collects the values
//! at a single bar index into an [`IndicatorSnapshot`] for the strategies.
//! A snapshot exists only when every component has left its warmup window;
//! otherwise the underlying series reports `InsufficientData`.

use chrono::NaiveDateTime;

use super::bar::Bar;
use super::error::KvantError;
use super::indicator::bollinger::calculate_bollinger;
use super::indicator::ema::calculate_ema;
use super::indicator::macd::calculate_macd;
use super::indicator::rsi::calculate_rsi;
use super::indicator::volume_ma::calculate_volume_ma;
use super::indicator::{IndicatorSeries, IndicatorValue};

/// Periods and thresholds for the indicator stack, one instance per run.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub ema_short: usize,
    pub ema_long: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rsi_period: usize,
    pub bollinger_period: usize,
    pub bollinger_mult_x100: u32,
    pub volume_ma_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            ema_short: 8,
            ema_long: 21,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            rsi_period: 14,
            bollinger_period: 20,
            bollinger_mult_x100: 200,
            volume_ma_period: 20,
        }
    }
}

impl IndicatorParams {
    /// First bar index at which every component series is valid. Strategy
    /// evaluation needs the previous snapshot too, so the engine starts one
    /// bar later.
    pub fn warmup_bars(&self) -> usize {
        let macd_warmup =
            self.macd_slow.saturating_sub(1) + self.macd_signal.saturating_sub(1);
        [
            self.ema_short.saturating_sub(1),
            self.ema_long.saturating_sub(1),
            macd_warmup,
            self.rsi_period,
            self.bollinger_period.saturating_sub(1),
            self.volume_ma_period.saturating_sub(1),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Derived values for one bar. Recomputed per bar, never mutated
/// retroactively; carries the bar's close and volume so strategies evaluate
/// from the snapshot alone.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub ts: NaiveDateTime,
    pub close: f64,
    pub volume: f64,
    pub ema_short: f64,
    pub ema_long: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub rsi: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub volume_ma: f64,
}

/// All indicator series for one symbol's history.
#[derive(Debug, Clone)]
pub struct IndicatorSet {
    ema_short: IndicatorSeries,
    ema_long: IndicatorSeries,
    macd: IndicatorSeries,
    rsi: IndicatorSeries,
    bollinger: IndicatorSeries,
    volume_ma: IndicatorSeries,
}

impl IndicatorSet {
    pub fn compute(bars: &[Bar], params: &IndicatorParams) -> Self {
        IndicatorSet {
            ema_short: calculate_ema(bars, params.ema_short),
            ema_long: calculate_ema(bars, params.ema_long),
            macd: calculate_macd(bars, params.macd_fast, params.macd_slow, params.macd_signal),
            rsi: calculate_rsi(bars, params.rsi_period),
            bollinger: calculate_bollinger(
                bars,
                params.bollinger_period,
                params.bollinger_mult_x100,
            ),
            volume_ma: calculate_volume_ma(bars, params.volume_ma_period),
        }
    }

    pub fn snapshot_at(&self, bars: &[Bar], i: usize) -> Result<IndicatorSnapshot, KvantError> {
        let bar = bars.get(i).ok_or_else(|| KvantError::InsufficientData {
            indicator: "snapshot".into(),
            bars: bars.len(),
            needed: i + 1,
        })?;

        let ema_short = expect_simple(self.ema_short.value_at(i)?);
        let ema_long = expect_simple(self.ema_long.value_at(i)?);
        let rsi = expect_simple(self.rsi.value_at(i)?);
        let volume_ma = expect_simple(self.volume_ma.value_at(i)?);

        let (macd, macd_signal, macd_histogram) = match self.macd.value_at(i)? {
            IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } => (line, signal, histogram),
            _ => (0.0, 0.0, 0.0),
        };

        let (bb_upper, bb_middle, bb_lower) = match self.bollinger.value_at(i)? {
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } => (upper, middle, lower),
            _ => (0.0, 0.0, 0.0),
        };

        Ok(IndicatorSnapshot {
            ts: bar.ts,
            close: bar.close,
            volume: bar.volume as f64,
            ema_short,
            ema_long,
            macd,
            macd_signal,
            macd_histogram,
            rsi,
            bb_upper,
            bb_middle,
            bb_lower,
            volume_ma,
        })
    }
}

fn expect_simple(value: IndicatorValue) -> f64 {
    match value {
        IndicatorValue::Simple(v) => v,
        _ => 0.0,
    }
}
