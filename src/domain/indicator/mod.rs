//! Technical indicator implementations.
//!
//! Each indicator is a pure function over a bar slice producing an
//! [`IndicatorSeries`]: one [`IndicatorPoint`] per input bar, with points
//! inside the warmup window flagged invalid. All computations are
//! bit-reproducible for a given input window: no randomness, no global
//! state. [`IndicatorSeries::value_at`] is the failure surface: asking for a
//! value before the window fills is an `InsufficientData` error, never a
//! partial value.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod volume_ma;

use chrono::NaiveDateTime;
use std::fmt;

use crate::domain::error::KvantError;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub ts: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, Copy)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

/// Indicator identity plus parameters. Hashable so it can key lookup tables;
/// the Bollinger multiplier is carried in hundredths to stay `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ema(usize),
    Rsi(usize),
    VolumeMa(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        mult_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// The value at bar index `i`, or `InsufficientData` while the trailing
    /// window is still filling (or the series is shorter than `i`).
    pub fn value_at(&self, i: usize) -> Result<IndicatorValue, KvantError> {
        match self.values.get(i) {
            Some(point) if point.valid => Ok(point.value),
            _ => Err(KvantError::InsufficientData {
                indicator: self.indicator_type.to_string(),
                bars: self.values.len().min(i + 1),
                needed: self.first_valid_index().map_or(i + 2, |w| w + 1),
            }),
        }
    }

    /// Index of the first valid point, if the series ever leaves warmup.
    pub fn first_valid_index(&self) -> Option<usize> {
        self.values.iter().position(|p| p.valid)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::VolumeMa(period) => write!(f, "VOLUME_MA({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger { period, mult_x100 } => {
                write!(f, "BOLLINGER({},{})", period, *mult_x100 as f64 / 100.0)
            }
        }
    }
}
