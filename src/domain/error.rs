//! Domain error types.
//!
//! Only structural problems are errors. Data-quality conditions (short
//! history, warm-up gaps, unresolvable conditions) are absorbed by the
//! engine and reported in the result payload instead.

/// A single indicator spec that cannot be computed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndicatorError {
    #[error("{indicator}: {parameter} must be positive, got {value}")]
    InvalidPeriod {
        indicator: &'static str,
        parameter: &'static str,
        value: usize,
    },
}

/// Top-level error type for algoblocks.
#[derive(Debug, thiserror::Error)]
pub enum AlgoblocksError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid strategy: {reason}")]
    StrategyShape { reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("failed to render output: {0}")]
    Render(#[source] serde_json::Error),

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&AlgoblocksError> for std::process::ExitCode {
    fn from(err: &AlgoblocksError) -> Self {
        let code: u8 = match err {
            AlgoblocksError::Io(_) | AlgoblocksError::Render(_) => 1,
            AlgoblocksError::ConfigParse { .. }
            | AlgoblocksError::ConfigMissing { .. }
            | AlgoblocksError::ConfigInvalid { .. } => 2,
            AlgoblocksError::DataSource { .. } => 3,
            AlgoblocksError::StrategyShape { .. } | AlgoblocksError::Json(_) => 4,
            AlgoblocksError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
