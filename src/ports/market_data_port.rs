//! Market data feed port trait.
//!
//! Implementations return a time-ordered bar series per symbol/timeframe.
//! The core validates ordering itself (`bar::validate_series`) and treats
//! violations as fatal for the symbol, so adapters only need to deliver what
//! their source holds.

use chrono::NaiveDateTime;

use crate::domain::bar::Bar;
use crate::domain::error::KvantError;
use crate::domain::settings::Timeframe;

pub trait MarketDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Bar>, KvantError>;
}
