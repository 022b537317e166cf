//! Configuration validation.
//!
//! Validates the `[backtest]` and `[data]` sections before a run and builds
//! the typed `BacktestConfig` from them.

use chrono::NaiveDate;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::AlgoblocksError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_SYMBOL: &str = "AAPL";
pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DATA_SOURCES: [&str; 2] = ["csv", "sample"];

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), AlgoblocksError> {
    validate_symbol(config)?;
    validate_initial_capital(config)?;
    validate_dates(config)?;
    validate_data_source(config)?;
    Ok(())
}

/// Validate, then read `[backtest]` into a `BacktestConfig`.
pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, AlgoblocksError> {
    validate_backtest_config(config)?;

    let symbol = config
        .get_string("backtest", "symbol")
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_else(|| DEFAULT_SYMBOL.to_string());

    Ok(BacktestConfig {
        symbol,
        start_date: optional_date(config, "start_date")?,
        end_date: optional_date(config, "end_date")?,
        initial_capital: config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL),
    })
}

/// Parse a `YYYY-MM-DD` value, reporting failures against `[section] key`.
pub fn parse_date(value: &str, section: &str, key: &str) -> Result<NaiveDate, AlgoblocksError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        AlgoblocksError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("invalid {} format, expected YYYY-MM-DD", key),
        }
    })
}

/// Bounds are inclusive, so equal dates are allowed.
pub fn check_date_order(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), AlgoblocksError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(AlgoblocksError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "start_date".to_string(),
                reason: format!("start_date {} is after end_date {}", start, end),
            });
        }
    }
    Ok(())
}

fn validate_symbol(config: &dyn ConfigPort) -> Result<(), AlgoblocksError> {
    match config.get_string("backtest", "symbol") {
        Some(s) if s.trim().is_empty() => Err(AlgoblocksError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "symbol".to_string(),
            reason: "symbol must not be empty".to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), AlgoblocksError> {
    if let Some(raw) = config.get_string("backtest", "initial_capital") {
        if raw.trim().parse::<f64>().is_err() {
            return Err(AlgoblocksError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "initial_capital".to_string(),
                reason: format!("not a number: {}", raw),
            });
        }
    }

    let value = config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL);
    if value <= 0.0 || !value.is_finite() {
        return Err(AlgoblocksError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_capital".to_string(),
            reason: "initial_capital must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), AlgoblocksError> {
    let start = optional_date(config, "start_date")?;
    let end = optional_date(config, "end_date")?;
    check_date_order(start, end)
}

fn optional_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, AlgoblocksError> {
    match config.get_string("backtest", key) {
        Some(s) if !s.trim().is_empty() => parse_date(&s, "backtest", key).map(Some),
        _ => Ok(None),
    }
}

fn validate_data_source(config: &dyn ConfigPort) -> Result<(), AlgoblocksError> {
    let source = config
        .get_string("data", "source")
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| "sample".to_string());

    if !DATA_SOURCES.contains(&source.as_str()) {
        return Err(AlgoblocksError::ConfigInvalid {
            section: "data".to_string(),
            key: "source".to_string(),
            reason: format!("unknown source '{}', expected one of {:?}", source, DATA_SOURCES),
        });
    }

    if source == "csv" {
        match config.get_string("data", "dir") {
            Some(dir) if !dir.trim().is_empty() => {}
            _ => {
                return Err(AlgoblocksError::ConfigMissing {
                    section: "data".to_string(),
                    key: "dir".to_string(),
                });
            }
        }
    }
    Ok(())
}
