//! Deterministic synthetic price history.
//!
//! Used when no real data source is configured or reachable. Each symbol gets
//! its own reproducible series: business days over the 365 days ending at
//! `end_date`, a per-symbol base price and volatility, and a random
//! up/down/sideways drift chosen once per series.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::error::AlgoblocksError;
use crate::domain::metrics::round2;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;

const HISTORY_DAYS: i64 = 365;
const MIN_PRICE: f64 = 1.0;
const DRIFTS: [f64; 3] = [0.0005, -0.0005, 0.0];

pub struct SampleDataAdapter {
    end_date: NaiveDate,
    symbols: Vec<String>,
}

impl SampleDataAdapter {
    pub fn new(end_date: NaiveDate, symbols: Vec<String>) -> Self {
        Self { end_date, symbols }
    }

    pub fn generate(&self, symbol: &str) -> Vec<PriceBar> {
        generate_sample_bars(symbol, self.end_date)
    }
}

impl DataPort for SampleDataAdapter {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<PriceBar>, AlgoblocksError> {
        Ok(self.generate(symbol))
    }

    fn list_symbols(&self) -> Result<Vec<String>, AlgoblocksError> {
        let mut symbols = self.symbols.clone();
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }
}

/// Sum of the symbol's character codes.
fn symbol_seed(symbol: &str) -> u64 {
    symbol.chars().map(|c| c as u64).sum()
}

fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn generate_sample_bars(symbol: &str, end_date: NaiveDate) -> Vec<PriceBar> {
    let seed = symbol_seed(symbol);
    let mut rng = StdRng::seed_from_u64(seed);

    let base_price = 100.0 + (seed % 400) as f64;
    let volatility = 0.01 + (seed % 100) as f64 * 0.0001;
    let drift = DRIFTS[rng.gen_range(0..DRIFTS.len())];
    // Uniform shock with the same standard deviation as N(0, volatility).
    let half_width = volatility * 3f64.sqrt();

    let mut bars = Vec::new();
    let mut current_price = base_price;
    let mut date = end_date - Duration::days(HISTORY_DAYS);

    while date <= end_date {
        if !is_business_day(date) {
            date += Duration::days(1);
            continue;
        }

        let shock = rng.gen_range(-half_width..half_width);
        current_price = (current_price + (drift + shock) * current_price).max(MIN_PRICE);

        let close = current_price;
        let (open, high, low) = if rng.gen_bool(0.5) {
            let open = close * (1.0 - rng.gen_range(0.0..volatility));
            let high = close * (1.0 + rng.gen_range(0.0..volatility));
            let low = open * (1.0 - rng.gen_range(0.0..volatility));
            (open, high, low)
        } else {
            let open = close * (1.0 + rng.gen_range(0.0..volatility));
            let high = open * (1.0 + rng.gen_range(0.0..volatility));
            let low = close * (1.0 - rng.gen_range(0.0..volatility));
            (open, high, low)
        };
        let volume = rng.gen_range(100_000..10_000_000i64);

        if let Some(time) = date.and_hms_opt(0, 0, 0) {
            bars.push(PriceBar {
                time,
                open: round2(open),
                high: round2(high),
                low: round2(low),
                close: round2(close),
                volume,
            });
        }

        date += Duration::days(1);
    }

    bars
}
