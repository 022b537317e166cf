#![allow(dead_code)]

use algoblocks::domain::backtest::BacktestConfig;
use algoblocks::domain::condition::{Condition, Operator};
use algoblocks::domain::error::AlgoblocksError;
use algoblocks::domain::indicator::IndicatorSpec;
pub use algoblocks::domain::ohlcv::PriceBar;
use algoblocks::domain::strategy::Strategy;
use algoblocks::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<PriceBar>, AlgoblocksError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(AlgoblocksError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, AlgoblocksError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: &str, close: f64) -> PriceBar {
    PriceBar {
        time: NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000,
    }
}

/// Daily bars from `start` with the given closes.
pub fn bars_from_closes(start: &str, closes: &[f64]) -> Vec<PriceBar> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let day = start + chrono::Duration::days(i as i64);
            make_bar(&day.format("%Y-%m-%d").to_string(), close)
        })
        .collect()
}

/// 100, 110, 100, 110, ...
pub fn alternating_closes(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| if i % 2 == 0 { 100.0 } else { 110.0 })
        .collect()
}

pub fn sma_cross_strategy(period: usize) -> Strategy {
    let column = format!("SMA_{period}");
    Strategy {
        indicators: vec![IndicatorSpec::Sma { period }],
        entry_rules: vec![Condition::new("close", Operator::Gt, column.as_str())],
        exit_rules: vec![Condition::new("close", Operator::Lt, column.as_str())],
    }
}

/// Like `sma_cross_strategy`, but the rules read the bar's `high`.
pub fn high_cross_strategy(period: usize) -> Strategy {
    let column = format!("SMA_{period}");
    Strategy {
        indicators: vec![IndicatorSpec::Sma { period }],
        entry_rules: vec![Condition::new("high", Operator::Gt, column.as_str())],
        exit_rules: vec![Condition::new("high", Operator::Lt, column.as_str())],
    }
}

/// Always enter, never exit.
pub fn buy_and_hold_strategy() -> Strategy {
    Strategy {
        indicators: vec![],
        entry_rules: vec![Condition::new("close", Operator::Ge, 0.0)],
        exit_rules: vec![Condition::new("close", Operator::Lt, 0.0)],
    }
}

/// `time,open,high,low,close,volume` text for the given bars.
pub fn bars_to_csv(bars: &[PriceBar]) -> String {
    let mut content = String::from("time,open,high,low,close,volume\n");
    for bar in bars {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.date(),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    content
}

pub fn sample_config(symbol: &str) -> BacktestConfig {
    BacktestConfig {
        symbol: symbol.to_string(),
        start_date: None,
        end_date: None,
        initial_capital: 10_000.0,
    }
}
