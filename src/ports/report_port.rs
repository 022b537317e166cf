//! Result sink port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::AlgoblocksError;

/// Port for writing backtest result documents.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), AlgoblocksError>;
}
