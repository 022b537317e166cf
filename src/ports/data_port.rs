//! Price history port trait.

use crate::domain::error::AlgoblocksError;
use crate::domain::ohlcv::PriceBar;

pub trait DataPort {
    /// Full available history for `symbol`, ordered by time.
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<PriceBar>, AlgoblocksError>;

    fn list_symbols(&self) -> Result<Vec<String>, AlgoblocksError>;
}
