//! Simulation loop.
//!
//! Single-pass, long-only replay of an augmented series:
//! 1. Skip the first `WARMUP_BARS` bars
//! 2. At step i, evaluate rules on row i-1 (never the current bar)
//! 3. FLAT + entry true: buy floor(cash / close[i]) shares
//! 4. LONG + exit true: sell the whole position at close[i]
//! 5. Mark to market at close[i] and append to the equity curve
//!
//! The equity curve starts with the initial capital, so it holds one point
//! per processed step plus one.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::condition::{referenced_columns, Condition};
use crate::domain::condition_eval::{evaluate, has_missing_values};
use crate::domain::indicator::AugmentedSeries;
use crate::domain::ohlcv::is_valid_price;

/// Bars skipped before the first decision.
pub const WARMUP_BARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    Buy,
    Sell,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::Buy => f.write_str("BUY"),
            TradeType::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub price: f64,
    pub shares: i64,
    pub value: f64,
}

/// Mutable state owned by one run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub cash: f64,
    pub shares_held: i64,
    pub trade_log: Vec<Trade>,
    pub equity_curve: Vec<f64>,
}

impl SimulationState {
    pub fn new(initial_capital: f64) -> Self {
        SimulationState {
            cash: initial_capital,
            shares_held: 0,
            trade_log: Vec::new(),
            equity_curve: vec![initial_capital],
        }
    }

    pub fn is_flat(&self) -> bool {
        self.shares_held == 0
    }

    pub fn equity_at(&self, price: f64) -> f64 {
        self.cash + self.shares_held as f64 * price
    }

    /// Deploy all cash in whole shares. Returns false (and records nothing)
    /// when the price is not a positive finite number or not even one share
    /// is affordable.
    pub fn buy_all(&mut self, date: NaiveDate, price: f64) -> bool {
        if !is_valid_price(price) {
            return false;
        }
        let shares = (self.cash / price).floor() as i64;
        if shares <= 0 {
            return false;
        }

        let value = shares as f64 * price;
        self.cash -= value;
        self.shares_held = shares;
        self.trade_log.push(Trade {
            date,
            trade_type: TradeType::Buy,
            price,
            shares,
            value,
        });
        true
    }

    /// Close the whole position.
    pub fn sell_all(&mut self, date: NaiveDate, price: f64) {
        let shares = self.shares_held;
        let value = shares as f64 * price;
        self.cash += value;
        self.shares_held = 0;
        self.trade_log.push(Trade {
            date,
            trade_type: TradeType::Sell,
            price,
            shares,
            value,
        });
    }

    fn mark_to_market(&mut self, price: f64) {
        let equity = self.equity_at(price);
        self.equity_curve.push(equity);
    }

    fn carry_forward(&mut self) {
        let last = self.equity_curve.last().copied().unwrap_or(self.cash);
        self.equity_curve.push(last);
    }
}

/// Everything a run produces before metrics are derived.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
    pub cash: f64,
    pub shares_held: i64,
}

impl From<SimulationState> for SimulationOutcome {
    fn from(state: SimulationState) -> Self {
        SimulationOutcome {
            trades: state.trade_log,
            equity_curve: state.equity_curve,
            cash: state.cash,
            shares_held: state.shares_held,
        }
    }
}

pub fn run(
    series: &AugmentedSeries,
    entry_rules: &[Condition],
    exit_rules: &[Condition],
    initial_capital: f64,
) -> SimulationOutcome {
    let mut state = SimulationState::new(initial_capital);

    let watched = referenced_columns(&[entry_rules, exit_rules]);

    let bars = series.bars();
    for i in WARMUP_BARS..bars.len() {
        let bar = &bars[i];
        let price = bar.close;
        let previous = series.row(i - 1);

        if !is_valid_price(price) {
            debug!(date = %bar.date(), price, "unusable close, carrying equity forward");
            state.carry_forward();
            continue;
        }

        if has_missing_values(&previous, &watched) {
            debug!(date = %bar.date(), "previous row has NaN values, no decision");
        } else if state.is_flat() {
            if evaluate(&previous, entry_rules) && state.buy_all(bar.date(), price) {
                info!(
                    date = %bar.date(),
                    shares = state.shares_held,
                    price,
                    "BUY"
                );
            }
        } else if evaluate(&previous, exit_rules) {
            let shares = state.shares_held;
            state.sell_all(bar.date(), price);
            info!(date = %bar.date(), shares, price, "SELL");
        }

        state.mark_to_market(price);
    }

    state.into()
}
