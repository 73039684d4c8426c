//! Typed run configuration.
//!
//! Built once at startup from a [`ConfigPort`] and never reloaded mid-run.
//! Defaults mirror the deployment configuration this core was built to run;
//! every override is range-checked here so the engine can assume sane
//! parameters throughout.

use std::str::FromStr;

use crate::ports::config_port::ConfigPort;

use super::error::KvantError;
use super::risk::RiskParams;
use super::signal::StrategyMode;
use super::snapshot::IndicatorParams;
use super::strategy::{parse_strategies, StrategyKind, StrategyParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Hour,
    Day,
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hour" | "1h" => Ok(Timeframe::Hour),
            "day" | "1d" => Ok(Timeframe::Day),
            other => Err(format!("unknown timeframe: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub active_strategies: Vec<StrategyKind>,
    pub strategy_mode: StrategyMode,
    pub update_interval_secs: u64,
    pub indicator: IndicatorParams,
    pub strategy: StrategyParams,
    pub risk: RiskParams,
    pub commission_rate: f64,
    pub order_timeout_secs: u64,
    pub initial_capital: f64,
    pub min_data_points: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            symbols: ["SBER", "GAZP", "LKOH", "ROSN"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeframe: Timeframe::Day,
            active_strategies: vec![StrategyKind::Trend, StrategyKind::Reversal],
            strategy_mode: StrategyMode::Any,
            update_interval_secs: 900,
            indicator: IndicatorParams::default(),
            strategy: StrategyParams::default(),
            risk: RiskParams::default(),
            commission_rate: 0.003,
            order_timeout_secs: 10,
            initial_capital: 50000.0,
            min_data_points: 30,
        }
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> KvantError {
    KvantError::ConfigInvalid {
        section: section.into(),
        key: key.into(),
        reason: reason.into(),
    }
}

impl Settings {
    /// Read every key from the config port, falling back to defaults, then
    /// validate the result as a whole.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, KvantError> {
        let defaults = Settings::default();

        let symbols = match config.get_string("trading", "symbols") {
            Some(raw) => parse_symbols(&raw)?,
            None => defaults.symbols,
        };

        let timeframe = match config.get_string("trading", "timeframe") {
            Some(raw) => raw
                .parse()
                .map_err(|e: String| invalid("trading", "timeframe", e))?,
            None => defaults.timeframe,
        };

        let active_strategies = match config.get_string("trading", "active_strategies") {
            Some(raw) => parse_strategies(&raw)
                .map_err(|e| invalid("trading", "active_strategies", e))?,
            None => defaults.active_strategies,
        };

        let strategy_mode = match config.get_string("trading", "strategy_mode") {
            Some(raw) => raw
                .parse()
                .map_err(|e: String| invalid("trading", "strategy_mode", e))?,
            None => defaults.strategy_mode,
        };

        let indicator = IndicatorParams {
            ema_short: get_period(config, "trend", "ema_short", defaults.indicator.ema_short)?,
            ema_long: get_period(config, "trend", "ema_long", defaults.indicator.ema_long)?,
            macd_fast: get_period(config, "trend", "macd_fast", defaults.indicator.macd_fast)?,
            macd_slow: get_period(config, "trend", "macd_slow", defaults.indicator.macd_slow)?,
            macd_signal: get_period(
                config,
                "trend",
                "macd_signal",
                defaults.indicator.macd_signal,
            )?,
            volume_ma_period: get_period(
                config,
                "trend",
                "volume_ma_period",
                defaults.indicator.volume_ma_period,
            )?,
            rsi_period: get_period(
                config,
                "reversal",
                "rsi_period",
                defaults.indicator.rsi_period,
            )?,
            bollinger_period: get_period(
                config,
                "reversal",
                "bollinger_period",
                defaults.indicator.bollinger_period,
            )?,
            bollinger_mult_x100: {
                let mult = config.get_double("reversal", "bollinger_std", 2.0);
                if mult <= 0.0 {
                    return Err(invalid("reversal", "bollinger_std", "must be positive"));
                }
                (mult * 100.0).round() as u32
            },
        };

        let strategy = StrategyParams {
            trend: super::strategy::TrendParams {
                min_volume_factor: config.get_double(
                    "trend",
                    "min_volume_factor",
                    defaults.strategy.trend.min_volume_factor,
                ),
            },
            reversal: super::strategy::ReversalParams {
                rsi_oversold: config.get_double(
                    "reversal",
                    "rsi_oversold",
                    defaults.strategy.reversal.rsi_oversold,
                ),
                rsi_overbought: config.get_double(
                    "reversal",
                    "rsi_overbought",
                    defaults.strategy.reversal.rsi_overbought,
                ),
            },
        };

        let commission_rate =
            config.get_double("execution", "commission_rate", defaults.commission_rate);

        let risk = RiskParams {
            stop_loss_percent: config.get_double(
                "risk",
                "stop_loss_percent",
                defaults.risk.stop_loss_percent,
            ),
            trailing_stop_percent: config.get_double(
                "risk",
                "trailing_stop_percent",
                defaults.risk.trailing_stop_percent,
            ),
            take_profit_percent: config.get_double(
                "risk",
                "take_profit_percent",
                defaults.risk.take_profit_percent,
            ),
            max_position_size: config.get_double(
                "risk",
                "max_position_size",
                defaults.risk.max_position_size,
            ),
            max_positions: {
                let value =
                    config.get_int("risk", "max_positions", defaults.risk.max_positions as i64);
                if value < 0 {
                    return Err(invalid("risk", "max_positions", "must not be negative"));
                }
                value as usize
            },
            max_holding_days: config.get_int(
                "risk",
                "max_holding_days",
                defaults.risk.max_holding_days,
            ),
            commission_rate,
        };

        let settings = Settings {
            symbols,
            timeframe,
            active_strategies,
            strategy_mode,
            update_interval_secs: config.get_int(
                "trading",
                "update_interval",
                defaults.update_interval_secs as i64,
            ) as u64,
            indicator,
            strategy,
            risk,
            commission_rate,
            order_timeout_secs: config.get_int(
                "execution",
                "order_timeout_secs",
                defaults.order_timeout_secs as i64,
            ) as u64,
            initial_capital: config.get_double(
                "backtest",
                "initial_capital",
                defaults.initial_capital,
            ),
            min_data_points: {
                let value = config.get_int(
                    "backtest",
                    "min_data_points",
                    defaults.min_data_points as i64,
                );
                if value < 0 {
                    return Err(invalid("backtest", "min_data_points", "must not be negative"));
                }
                value as usize
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), KvantError> {
        if self.symbols.is_empty() {
            return Err(invalid("trading", "symbols", "empty symbol list"));
        }
        if self.indicator.ema_short >= self.indicator.ema_long {
            return Err(invalid(
                "trend",
                "ema_short",
                "must be less than ema_long",
            ));
        }
        if self.indicator.macd_fast >= self.indicator.macd_slow {
            return Err(invalid(
                "trend",
                "macd_fast",
                "must be less than macd_slow",
            ));
        }
        if self.strategy.trend.min_volume_factor <= 0.0 {
            return Err(invalid("trend", "min_volume_factor", "must be positive"));
        }
        if self.strategy.reversal.rsi_oversold >= self.strategy.reversal.rsi_overbought {
            return Err(invalid(
                "reversal",
                "rsi_oversold",
                "must be below rsi_overbought",
            ));
        }
        for (key, value) in [
            ("stop_loss_percent", self.risk.stop_loss_percent),
            ("trailing_stop_percent", self.risk.trailing_stop_percent),
            ("take_profit_percent", self.risk.take_profit_percent),
        ] {
            if value <= 0.0 || value >= 100.0 {
                return Err(invalid("risk", key, "must be in (0, 100)"));
            }
        }
        if self.risk.max_position_size <= 0.0 || self.risk.max_position_size > 1.0 {
            return Err(invalid("risk", "max_position_size", "must be in (0, 1]"));
        }
        if self.risk.max_positions == 0 {
            return Err(invalid("risk", "max_positions", "must be at least 1"));
        }
        if self.risk.max_holding_days <= 0 {
            return Err(invalid("risk", "max_holding_days", "must be positive"));
        }
        if !(0.0..1.0).contains(&self.commission_rate) {
            return Err(invalid(
                "execution",
                "commission_rate",
                "must be in [0, 1)",
            ));
        }
        if self.initial_capital <= 0.0 {
            return Err(invalid("backtest", "initial_capital", "must be positive"));
        }
        if self.min_data_points == 0 {
            return Err(invalid("backtest", "min_data_points", "must be positive"));
        }
        Ok(())
    }
}

/// Parse a comma-separated symbol list: trimmed, uppercased, duplicates and
/// empty tokens rejected.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, KvantError> {
    let mut symbols = Vec::new();
    for token in input.split(',') {
        let symbol = token.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(invalid("trading", "symbols", "empty token in symbol list"));
        }
        if symbols.contains(&symbol) {
            return Err(invalid(
                "trading",
                "symbols",
                format!("duplicate symbol: {symbol}"),
            ));
        }
        symbols.push(symbol);
    }
    Ok(symbols)
}

fn get_period(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, KvantError> {
    let value = config.get_int(section, key, default as i64);
    if value <= 0 {
        return Err(invalid(section, key, "must be a positive period"));
    }
    Ok(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn from_ini(content: &str) -> Result<Settings, KvantError> {
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        Settings::from_config(&adapter)
    }

    #[test]
    fn empty_config_yields_defaults() {
        let settings = from_ini("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn overrides_applied() {
        let settings = from_ini(
            r#"
[trading]
symbols = SBER,GAZP
timeframe = hour
active_strategies = trend
strategy_mode = all

[trend]
ema_short = 5
ema_long = 12

[risk]
stop_loss_percent = 3.5
max_positions = 2

[backtest]
initial_capital = 100000
"#,
        )
        .unwrap();

        assert_eq!(settings.symbols, vec!["SBER", "GAZP"]);
        assert_eq!(settings.timeframe, Timeframe::Hour);
        assert_eq!(settings.active_strategies, vec![StrategyKind::Trend]);
        assert_eq!(settings.strategy_mode, StrategyMode::All);
        assert_eq!(settings.indicator.ema_short, 5);
        assert_eq!(settings.indicator.ema_long, 12);
        assert_eq!(settings.risk.stop_loss_percent, 3.5);
        assert_eq!(settings.risk.max_positions, 2);
        assert_eq!(settings.initial_capital, 100000.0);
    }

    #[test]
    fn symbols_normalized_uppercase() {
        let settings = from_ini("[trading]\nsymbols = sber, gazp\n").unwrap();
        assert_eq!(settings.symbols, vec!["SBER", "GAZP"]);
    }

    #[test]
    fn duplicate_symbols_rejected() {
        let err = from_ini("[trading]\nsymbols = SBER,SBER\n").unwrap_err();
        assert!(matches!(err, KvantError::ConfigInvalid { .. }));
    }

    #[test]
    fn unknown_strategy_rejected() {
        let err = from_ini("[trading]\nactive_strategies = momentum\n").unwrap_err();
        assert!(err.to_string().contains("active_strategies"));
    }

    #[test]
    fn unknown_mode_rejected() {
        assert!(from_ini("[trading]\nstrategy_mode = both\n").is_err());
    }

    #[test]
    fn ema_ordering_enforced() {
        let err = from_ini("[trend]\nema_short = 21\nema_long = 8\n").unwrap_err();
        assert!(err.to_string().contains("ema_short"));
    }

    #[test]
    fn percent_ranges_enforced() {
        assert!(from_ini("[risk]\nstop_loss_percent = 0\n").is_err());
        assert!(from_ini("[risk]\nstop_loss_percent = 150\n").is_err());
        assert!(from_ini("[risk]\ntake_profit_percent = -4\n").is_err());
    }

    #[test]
    fn position_size_range_enforced() {
        assert!(from_ini("[risk]\nmax_position_size = 0\n").is_err());
        assert!(from_ini("[risk]\nmax_position_size = 1.5\n").is_err());
        assert!(from_ini("[risk]\nmax_position_size = 1.0\n").is_ok());
    }

    #[test]
    fn commission_range_enforced() {
        assert!(from_ini("[execution]\ncommission_rate = 1.0\n").is_err());
        assert!(from_ini("[execution]\ncommission_rate = 0\n").is_ok());
    }

    #[test]
    fn commission_feeds_risk_sizing() {
        let settings = from_ini("[execution]\ncommission_rate = 0.01\n").unwrap();
        assert_eq!(settings.risk.commission_rate, 0.01);
    }

    #[test]
    fn bollinger_std_converted_to_hundredths() {
        let settings = from_ini("[reversal]\nbollinger_std = 2.5\n").unwrap();
        assert_eq!(settings.indicator.bollinger_mult_x100, 250);
    }

    #[test]
    fn zero_period_rejected() {
        assert!(from_ini("[reversal]\nrsi_period = 0\n").is_err());
    }
}
