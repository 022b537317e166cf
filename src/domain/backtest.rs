//! Backtest orchestration and result report.
//!
//! `run_backtest` chains the engine stages:
//! bars -> cleaning -> date filter -> indicators -> simulation -> metrics -> report.
//! Short history is a normal outcome: the report carries an `error` message,
//! a flat one-point equity curve and zero metrics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::indicator::compute;
use crate::domain::metrics::{round2, Metrics};
use crate::domain::ohlcv::{clean_bars, PriceBar};
use crate::domain::simulation::{self, SimulationOutcome, Trade};
use crate::domain::strategy::Strategy;

/// Minimum bars the data source must supply.
pub const MIN_FETCHED_BARS: usize = 30;
/// Minimum bars left after date filtering.
pub const MIN_FILTERED_BARS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub symbol: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_capital: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            symbol: "AAPL".to_string(),
            start_date: None,
            end_date: None,
            initial_capital: 10_000.0,
        }
    }
}

/// The report handed to callers, rounded for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub initial_capital: f64,
    pub final_equity: f64,
    #[serde(rename = "total_return")]
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
    #[serde(rename = "max_drawdown")]
    pub max_drawdown_pct: f64,
    pub total_trades: usize,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BacktestResult {
    pub fn insufficient_data(initial_capital: f64, reason: impl Into<String>) -> Self {
        BacktestResult {
            initial_capital,
            final_equity: initial_capital,
            total_return_pct: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown_pct: 0.0,
            total_trades: 0,
            trades: Vec::new(),
            equity_curve: vec![initial_capital],
            error: Some(reason.into()),
        }
    }

    pub fn from_outcome(initial_capital: f64, outcome: &SimulationOutcome, metrics: &Metrics) -> Self {
        let final_equity = outcome
            .equity_curve
            .last()
            .copied()
            .unwrap_or(initial_capital);

        BacktestResult {
            initial_capital,
            final_equity: round2(final_equity),
            total_return_pct: round2(metrics.total_return_pct),
            sharpe_ratio: round2(metrics.sharpe_ratio),
            max_drawdown_pct: round2(metrics.max_drawdown_pct),
            total_trades: outcome.trades.len(),
            trades: outcome.trades.clone(),
            equity_curve: outcome.equity_curve.iter().copied().map(round2).collect(),
            error: None,
        }
    }
}

/// Keep bars whose calendar date falls within the optional bounds (inclusive).
pub fn filter_by_date(
    bars: &[PriceBar],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<PriceBar> {
    bars.iter()
        .filter(|bar| {
            let date = bar.date();
            start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
        })
        .cloned()
        .collect()
}

/// Full-precision outputs of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRun {
    pub outcome: SimulationOutcome,
    pub metrics: Metrics,
}

/// Run the engine on already-filtered bars without the length checks.
pub fn simulate(bars: &[PriceBar], strategy: &Strategy, initial_capital: f64) -> BacktestRun {
    let augmented = compute(bars, &strategy.indicators);
    let outcome = simulation::run(
        &augmented,
        &strategy.entry_rules,
        &strategy.exit_rules,
        initial_capital,
    );
    let metrics = Metrics::compute(&outcome.equity_curve);
    BacktestRun { outcome, metrics }
}

pub fn run_backtest(bars: &[PriceBar], strategy: &Strategy, config: &BacktestConfig) -> BacktestResult {
    let bars = clean_bars(&config.symbol, bars.to_vec());
    if bars.len() < MIN_FETCHED_BARS {
        warn!(
            symbol = %config.symbol,
            bars = bars.len(),
            required = MIN_FETCHED_BARS,
            "insufficient historical data"
        );
        return BacktestResult::insufficient_data(
            config.initial_capital,
            format!("Insufficient historical data for {}", config.symbol),
        );
    }

    let filtered = filter_by_date(&bars, config.start_date, config.end_date);
    if filtered.len() < MIN_FILTERED_BARS {
        warn!(
            symbol = %config.symbol,
            bars = filtered.len(),
            required = MIN_FILTERED_BARS,
            "insufficient data after date filtering"
        );
        return BacktestResult::insufficient_data(
            config.initial_capital,
            "Insufficient data after date filtering",
        );
    }

    info!(
        symbol = %config.symbol,
        bars = filtered.len(),
        indicators = strategy.indicators.len(),
        capital = config.initial_capital,
        "starting backtest"
    );

    let run = simulate(&filtered, strategy, config.initial_capital);
    let result = BacktestResult::from_outcome(config.initial_capital, &run.outcome, &run.metrics);

    info!(
        symbol = %config.symbol,
        trades = result.total_trades,
        final_equity = result.final_equity,
        total_return = result.total_return_pct,
        "backtest complete"
    );

    result
}
