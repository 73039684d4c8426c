//! Domain error taxonomy.
//!
//! Fatal conditions (`DataIntegrity`, `InsufficientHistory`) abort the run
//! for the affected symbol only. `InsufficientData` means an indicator window
//! is still filling and the caller must wait for more bars. Execution
//! rejections and the position-count cap are not errors; they are recorded
//! outcomes and processing continues on the next bar.

/// Top-level error type for kvant.
#[derive(Debug, thiserror::Error)]
pub enum KvantError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("market data error: {reason}")]
    Data { reason: String },

    #[error("data integrity violation for {symbol}: {reason}")]
    DataIntegrity { symbol: String, reason: String },

    #[error("insufficient data for {indicator}: have {bars} bars, need {needed}")]
    InsufficientData {
        indicator: String,
        bars: usize,
        needed: usize,
    },

    #[error("insufficient history for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientHistory {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&KvantError> for std::process::ExitCode {
    fn from(err: &KvantError) -> Self {
        let code: u8 = match err {
            KvantError::Io(_) => 1,
            KvantError::ConfigParse { .. }
            | KvantError::ConfigMissing { .. }
            | KvantError::ConfigInvalid { .. } => 2,
            KvantError::Data { .. } => 3,
            KvantError::DataIntegrity { .. } => 4,
            KvantError::InsufficientData { .. } | KvantError::InsufficientHistory { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = KvantError::InsufficientHistory {
            symbol: "SBER".into(),
            bars: 12,
            minimum: 30,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history for SBER: have 12 bars, need 30"
        );
    }

    #[test]
    fn insufficient_data_names_indicator() {
        let err = KvantError::InsufficientData {
            indicator: "RSI(14)".into(),
            bars: 10,
            needed: 15,
        };
        assert!(err.to_string().contains("RSI(14)"));
    }

    #[test]
    fn config_invalid_names_section_and_key() {
        let err = KvantError::ConfigInvalid {
            section: "risk".into(),
            key: "stop_loss_percent".into(),
            reason: "must be in (0, 100)".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [risk] stop_loss_percent: must be in (0, 100)"
        );
    }
}
