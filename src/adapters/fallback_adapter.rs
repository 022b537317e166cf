//! Primary data source with synthetic fallback.

use tracing::warn;

use crate::adapters::sample_data_adapter::SampleDataAdapter;
use crate::domain::error::AlgoblocksError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::DataPort;

pub struct FallbackDataAdapter {
    primary: Box<dyn DataPort>,
    fallback: SampleDataAdapter,
}

impl FallbackDataAdapter {
    pub fn new(primary: Box<dyn DataPort>, fallback: SampleDataAdapter) -> Self {
        Self { primary, fallback }
    }
}

impl DataPort for FallbackDataAdapter {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<PriceBar>, AlgoblocksError> {
        match self.primary.fetch_bars(symbol) {
            Ok(bars) if !bars.is_empty() => Ok(bars),
            Ok(_) => {
                warn!(symbol, "no data from primary source, using sample data");
                self.fallback.fetch_bars(symbol)
            }
            Err(e) => {
                warn!(symbol, error = %e, "primary source failed, using sample data");
                self.fallback.fetch_bars(symbol)
            }
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, AlgoblocksError> {
        match self.primary.list_symbols() {
            Ok(symbols) if !symbols.is_empty() => Ok(symbols),
            Ok(_) => self.fallback.list_symbols(),
            Err(e) => {
                warn!(error = %e, "primary source failed to list symbols, using sample list");
                self.fallback.list_symbols()
            }
        }
    }
}
