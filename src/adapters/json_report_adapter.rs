//! JSON report adapter implementing ReportPort.
//!
//! Writes the result document with the field names callers consume
//! (`initial_capital`, `final_equity`, `total_return`, ...).

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::AlgoblocksError;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportAdapter {
    pretty: bool,
}

impl JsonReportAdapter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn render(&self, result: &BacktestResult) -> Result<String, AlgoblocksError> {
        let text = if self.pretty {
            serde_json::to_string_pretty(result)
        } else {
            serde_json::to_string(result)
        };
        text.map_err(AlgoblocksError::Render)
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), AlgoblocksError> {
        let path = Path::new(output_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut text = self.render(result)?;
        text.push('\n');
        fs::write(path, text)?;
        Ok(())
    }
}
