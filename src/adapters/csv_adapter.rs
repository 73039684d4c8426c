//! CSV file market-data adapter.
//!
//! One file per symbol under a base directory, named `<SYMBOL>.csv`, columns
//! `ts,open,high,low,close,volume` with a header row. Timestamps are either
//! `YYYY-MM-DD` (daily bars, midnight) or `YYYY-MM-DDTHH:MM:SS`.

use chrono::{NaiveDate, NaiveDateTime};
use std::fs::File;
use std::path::PathBuf;

use crate::domain::bar::Bar;
use crate::domain::error::KvantError;
use crate::domain::settings::Timeframe;
use crate::ports::market_data_port::MarketDataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn parse_ts(raw: &str) -> Result<NaiveDateTime, KvantError> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
        .map_err(|e| KvantError::Data {
            reason: format!("invalid timestamp {raw:?}: {e}"),
        })
}

fn field<'a>(
    record: &'a csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<&'a str, KvantError> {
    record.get(index).ok_or_else(|| KvantError::Data {
        reason: format!("missing {name} column"),
    })
}

fn parse_number<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, KvantError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e| KvantError::Data {
        reason: format!("invalid {name} value {raw:?}: {e}"),
    })
}

impl MarketDataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, KvantError> {
        let path = self.csv_path(symbol);
        let file = File::open(&path).map_err(|e| KvantError::Data {
            reason: format!("failed to open {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(file);
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| KvantError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let ts = parse_ts(field(&record, 0, "ts")?)?;
            if ts < start || ts > end {
                continue;
            }

            bars.push(Bar {
                symbol: symbol.to_string(),
                ts,
                open: parse_number(field(&record, 1, "open")?, "open")?,
                high: parse_number(field(&record, 2, "high")?, "high")?,
                low: parse_number(field(&record, 3, "low")?, "low")?,
                close: parse_number(field(&record, 4, "close")?, "close")?,
                volume: parse_number(field(&record, 5, "volume")?, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.ts);
        Ok(bars)
    }
}
