//! OHLCV bar representation and series integrity checks.

use chrono::NaiveDateTime;

use super::error::KvantError;

/// One OHLCV observation for a symbol at a fixed timeframe. Immutable once
/// produced by the data feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub ts: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Verify a per-symbol series: one symbol throughout, strictly increasing
/// timestamps, no duplicates. Violations are fatal for the symbol; the feed
/// contract forbids silently skipping or reordering bars.
pub fn validate_series(bars: &[Bar]) -> Result<(), KvantError> {
    let Some(first) = bars.first() else {
        return Ok(());
    };

    for window in bars.windows(2) {
        let (prev, curr) = (&window[0], &window[1]);
        if curr.symbol != first.symbol {
            return Err(KvantError::DataIntegrity {
                symbol: first.symbol.clone(),
                reason: format!("mixed symbols in series: found {}", curr.symbol),
            });
        }
        if curr.ts == prev.ts {
            return Err(KvantError::DataIntegrity {
                symbol: first.symbol.clone(),
                reason: format!("duplicate timestamp {}", curr.ts),
            });
        }
        if curr.ts < prev.ts {
            return Err(KvantError::DataIntegrity {
                symbol: first.symbol.clone(),
                reason: format!("out-of-order timestamp {} after {}", curr.ts, prev.ts),
            });
        }
    }

    Ok(())
}
