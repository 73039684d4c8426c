//! Concrete adapter implementations for the ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_report_adapter;
pub mod live_execution;
pub mod log_notify_adapter;
pub mod paper_broker;
