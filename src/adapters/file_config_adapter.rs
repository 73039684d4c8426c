//! INI file configuration adapter.

use crate::domain::error::KvantError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, KvantError> {
        let mut config = Ini::new();
        config
            .load(path.as_ref())
            .map_err(|e| KvantError::ConfigParse {
                file: path.as_ref().display().to_string(),
                reason: e,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, KvantError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| KvantError::ConfigParse {
                file: "<inline>".into(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[trading]
symbols = SBER,GAZP
strategy_mode = any

[risk]
stop_loss_percent = 2.0
max_positions = 1

[backtest]
initial_capital = 50000
"#;

    #[test]
    fn from_string_reads_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("trading", "symbols"),
            Some("SBER,GAZP".to_string())
        );
        assert_eq!(
            adapter.get_string("trading", "strategy_mode"),
            Some("any".to_string())
        );
    }

    #[test]
    fn missing_key_is_none() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("trading", "missing"), None);
        assert_eq!(adapter.get_string("missing", "symbols"), None);
    }

    #[test]
    fn get_int_value_and_defaults() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_int("risk", "max_positions", 0), 1);
        assert_eq!(adapter.get_int("risk", "missing", 42), 42);
    }

    #[test]
    fn get_int_non_numeric_falls_back() {
        let adapter = FileConfigAdapter::from_string("[risk]\nmax_positions = lots\n").unwrap();
        assert_eq!(adapter.get_int("risk", "max_positions", 3), 3);
    }

    #[test]
    fn get_double_value_and_defaults() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_double("risk", "stop_loss_percent", 0.0), 2.0);
        assert_eq!(adapter.get_double("risk", "missing", 1.5), 1.5);
        assert_eq!(
            adapter.get_double("backtest", "initial_capital", 0.0),
            50000.0
        );
    }

    #[test]
    fn get_bool_recognized_forms() {
        let adapter =
            FileConfigAdapter::from_string("[x]\na = true\nb = no\nc = 1\nd = maybe\n").unwrap();
        assert!(adapter.get_bool("x", "a", false));
        assert!(!adapter.get_bool("x", "b", true));
        assert!(adapter.get_bool("x", "c", false));
        assert!(!adapter.get_bool("x", "d", false));
        assert!(adapter.get_bool("x", "missing", true));
    }

    #[test]
    fn from_file_round_trip() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();

        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_int("risk", "max_positions", 0), 1);
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/kvant.ini").unwrap_err();
        assert!(matches!(err, KvantError::ConfigParse { .. }));
    }
}
