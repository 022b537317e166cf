//! Price bar representation.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PriceBar {
    /// Calendar date of the bar, used for trade records and date filtering.
    pub fn date(&self) -> NaiveDate {
        self.time.date()
    }

    /// high >= max(open, close) >= min(open, close) >= low
    pub fn is_consistent(&self) -> bool {
        let body_high = self.open.max(self.close);
        let body_low = self.open.min(self.close);
        self.high >= body_high && body_low >= self.low
    }

    /// Positive finite prices, non-negative volume, consistent OHLC.
    pub fn is_valid(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .into_iter()
            .all(is_valid_price)
            && self.volume >= 0
            && self.is_consistent()
    }
}

pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// True when timestamps are strictly increasing (no duplicates).
pub fn is_strictly_ordered(bars: &[PriceBar]) -> bool {
    bars.windows(2).all(|w| w[0].time < w[1].time)
}

/// Drop invalid bars, then sort by time keeping the first bar of each
/// timestamp. Every drop is logged against `symbol`.
pub fn clean_bars(symbol: &str, mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
    let before = bars.len();
    bars.retain(PriceBar::is_valid);
    if bars.len() < before {
        warn!(symbol, dropped = before - bars.len(), "dropped invalid price bars");
    }

    if !is_strictly_ordered(&bars) {
        bars.sort_by_key(|b| b.time);
        let before = bars.len();
        bars.dedup_by_key(|b| b.time);
        if bars.len() < before {
            warn!(symbol, dropped = before - bars.len(), "dropped duplicate timestamps");
        }
    }

    bars
}
