//! JSON report adapter.
//!
//! Writes the full backtest result (summary metrics, trade ledger, equity
//! series and skipped symbols) as one JSON document for external rendering.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::KvantError;
use crate::ports::report_port::ReportPort;

pub struct JsonReportAdapter;

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), KvantError> {
        let file = File::create(output_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, result).map_err(|e| KvantError::Data {
            reason: format!("failed to serialize report: {e}"),
        })
    }
}
