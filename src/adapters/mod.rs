//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod fallback_adapter;
pub mod file_config_adapter;
pub mod json_report_adapter;
pub mod sample_data_adapter;
