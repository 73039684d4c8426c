#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::RefCell;

use kvant::domain::bar::Bar;
use kvant::domain::error::KvantError;
use kvant::domain::settings::{Settings, Timeframe};
use kvant::domain::strategy::StrategyKind;
use kvant::ports::market_data_port::MarketDataPort;
use kvant::ports::notify_port::{NotifyPort, TradeEvent};
use std::collections::HashMap;

pub fn ts(day: u32) -> NaiveDateTime {
    // Sequential daily timestamps starting 2024-01-01; day 0 is Jan 1.
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::days(day as i64)
}

pub fn make_bar(symbol: &str, day: u32, close: f64) -> Bar {
    Bar {
        symbol: symbol.into(),
        ts: ts(day),
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume: 1000,
    }
}

pub fn make_bar_full(
    symbol: &str,
    day: u32,
    low: f64,
    high: f64,
    close: f64,
    volume: i64,
) -> Bar {
    Bar {
        symbol: symbol.into(),
        ts: ts(day),
        open: close,
        high,
        low,
        close,
        volume,
    }
}

/// Settings tuned for short test series: small indicator periods (combined
/// warmup 11 bars, so evaluation starts at bar 12), trend-only by default.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.symbols = vec!["SBER".into()];
    settings.active_strategies = vec![StrategyKind::Trend];
    settings.indicator.ema_short = 5;
    settings.indicator.ema_long = 12;
    settings.indicator.macd_fast = 3;
    settings.indicator.macd_slow = 6;
    settings.indicator.macd_signal = 4;
    settings.indicator.rsi_period = 5;
    settings.indicator.bollinger_period = 5;
    settings.indicator.volume_ma_period = 5;
    settings.min_data_points = 13;
    settings
}

/// Quiet tape near 100 through bar 19, then a confirmed breakout at bar 20:
/// price jumps to 110 on triple volume (EMA crossover + positive MACD
/// histogram + volume above floor), then drifts near `after_close` with the
/// given low/high spread until `n` bars exist.
///
/// Closes alternate by a tick (odd bars a tenth lower) so the Bollinger
/// deviation never collapses to zero and RSI stays mid-range on the quiet
/// stretches; a perfectly flat tape would pin both at their degenerate
/// extremes. Odd parity on bar 19 keeps the bar-20 crossover genuine.
pub fn breakout_bars(
    symbol: &str,
    n: u32,
    after_close: f64,
    after_low: f64,
    after_high: f64,
) -> Vec<Bar> {
    let tick = |day: u32| if day % 2 == 1 { -0.1 } else { 0.0 };
    let mut bars = Vec::new();
    for day in 0..20 {
        let close = 100.0 + tick(day);
        bars.push(make_bar_full(symbol, day, close - 0.5, close + 0.5, close, 1000));
    }
    bars.push(make_bar_full(symbol, 20, 104.0, 110.0, 110.0, 3000));
    for day in 21..n {
        bars.push(make_bar_full(
            symbol,
            day,
            after_low,
            after_high,
            after_close + tick(day),
            1000,
        ));
    }
    bars
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl MarketDataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        _start: NaiveDateTime,
        _end: NaiveDateTime,
    ) -> Result<Vec<Bar>, KvantError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(KvantError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }
}

pub struct RecordingNotifier {
    pub events: RefCell<Vec<TradeEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            events: RefCell::new(Vec::new()),
        }
    }
}

impl NotifyPort for RecordingNotifier {
    fn notify(&self, event: &TradeEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}
