//! Indicator engine.
//!
//! Computes named numeric columns from a price series:
//! - `IndicatorSpec`: closed set of supported indicators with their periods
//! - `AugmentedSeries`: the bars plus one column per computed output
//! - `compute`: applies every spec, skipping (and logging) malformed ones
//!
//! Column names are addressed by strategy rules and must stay stable:
//! `SMA_<p>`, `EMA_<p>`, `RSI_<p>`, and for MACD `EMA_<fast>`, `EMA_<slow>`,
//! `MACD`, `MACD_Signal`, `MACD_Hist`. MACD writes its intermediate EMA
//! columns under the plain `EMA_<p>` names, so a standalone EMA with the same
//! period shares (and may be overwritten by) that column.

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::domain::error::IndicatorError;
use crate::domain::ohlcv::PriceBar;

pub use ema::calculate_ema;
pub use macd::{calculate_macd, MacdLines};
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

/// Price fields every row exposes alongside the indicator columns.
pub const PRICE_FIELDS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// One point in time: price fields and indicator columns by name.
pub type Row = HashMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "parameters")]
pub enum IndicatorSpec {
    #[serde(rename = "SMA")]
    Sma { period: usize },
    #[serde(rename = "EMA")]
    Ema { period: usize },
    #[serde(rename = "RSI")]
    Rsi { period: usize },
    #[serde(rename = "MACD")]
    Macd {
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    },
}

impl IndicatorSpec {
    /// Names of the columns this indicator writes, in write order.
    pub fn column_names(&self) -> Vec<String> {
        match self {
            IndicatorSpec::Sma { period } => vec![format!("SMA_{period}")],
            IndicatorSpec::Ema { period } => vec![format!("EMA_{period}")],
            IndicatorSpec::Rsi { period } => vec![format!("RSI_{period}")],
            IndicatorSpec::Macd {
                fast_period,
                slow_period,
                ..
            } => vec![
                format!("EMA_{fast_period}"),
                format!("EMA_{slow_period}"),
                "MACD".to_string(),
                "MACD_Signal".to_string(),
                "MACD_Hist".to_string(),
            ],
        }
    }

    pub fn validate(&self) -> Result<(), IndicatorError> {
        let check = |indicator, parameter, value: usize| {
            if value == 0 {
                Err(IndicatorError::InvalidPeriod {
                    indicator,
                    parameter,
                    value,
                })
            } else {
                Ok(())
            }
        };

        match self {
            IndicatorSpec::Sma { period } => check("SMA", "period", *period),
            IndicatorSpec::Ema { period } => check("EMA", "period", *period),
            IndicatorSpec::Rsi { period } => check("RSI", "period", *period),
            IndicatorSpec::Macd {
                fast_period,
                slow_period,
                signal_period,
            } => {
                check("MACD", "fast_period", *fast_period)?;
                check("MACD", "slow_period", *slow_period)?;
                check("MACD", "signal_period", *signal_period)
            }
        }
    }

    /// Compute this indicator's columns from a close series.
    pub fn calculate(&self, closes: &[f64]) -> Result<Vec<(String, Vec<f64>)>, IndicatorError> {
        self.validate()?;

        let values = match self {
            IndicatorSpec::Sma { period } => vec![calculate_sma(closes, *period)],
            IndicatorSpec::Ema { period } => vec![calculate_ema(closes, *period)],
            IndicatorSpec::Rsi { period } => vec![calculate_rsi(closes, *period)],
            IndicatorSpec::Macd {
                fast_period,
                slow_period,
                signal_period,
            } => {
                let lines = calculate_macd(closes, *fast_period, *slow_period, *signal_period);
                vec![
                    lines.ema_fast,
                    lines.ema_slow,
                    lines.macd,
                    lines.signal,
                    lines.histogram,
                ]
            }
        };

        Ok(self.column_names().into_iter().zip(values).collect())
    }
}

impl fmt::Display for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorSpec::Sma { period } => write!(f, "SMA({})", period),
            IndicatorSpec::Ema { period } => write!(f, "EMA({})", period),
            IndicatorSpec::Rsi { period } => write!(f, "RSI({})", period),
            IndicatorSpec::Macd {
                fast_period,
                slow_period,
                signal_period,
            } => write!(f, "MACD({},{},{})", fast_period, slow_period, signal_period),
        }
    }
}

/// Price bars extended with named indicator columns.
///
/// Every column has exactly one value per bar; warm-up values are NaN.
#[derive(Debug, Clone)]
pub struct AugmentedSeries {
    bars: Vec<PriceBar>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl AugmentedSeries {
    pub fn new(bars: Vec<PriceBar>) -> Self {
        Self {
            bars,
            columns: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Insert or replace a column. Returns the replaced values, if any.
    pub fn insert_column(&mut self, name: String, values: Vec<f64>) -> Option<Vec<f64>> {
        debug_assert_eq!(values.len(), self.bars.len());
        self.columns.insert(name, values)
    }

    /// Snapshot of the price fields and every column at `index`.
    pub fn row(&self, index: usize) -> Row {
        let bar = &self.bars[index];
        let mut row = Row::with_capacity(PRICE_FIELDS.len() + self.columns.len());
        row.insert("open".to_string(), bar.open);
        row.insert("high".to_string(), bar.high);
        row.insert("low".to_string(), bar.low);
        row.insert("close".to_string(), bar.close);
        row.insert("volume".to_string(), bar.volume as f64);
        for (name, values) in &self.columns {
            row.insert(name.clone(), values[index]);
        }
        row
    }
}

/// Apply every indicator to a working copy of `series`.
///
/// A spec that fails validation is logged and skipped; its columns are simply
/// absent from the result.
pub fn compute(series: &[PriceBar], indicators: &[IndicatorSpec]) -> AugmentedSeries {
    let mut augmented = AugmentedSeries::new(series.to_vec());
    let closes = augmented.closes();

    for spec in indicators {
        match spec.calculate(&closes) {
            Ok(columns) => {
                for (name, values) in columns {
                    if augmented.insert_column(name.clone(), values).is_some() {
                        debug!(column = %name, indicator = %spec, "column overwritten");
                    }
                }
                debug!(indicator = %spec, "calculated indicator");
            }
            Err(e) => {
                error!(indicator = %spec, error = %e, "error calculating indicator, skipping");
            }
        }
    }

    augmented
}
