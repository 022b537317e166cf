//! Strategy configuration.
//!
//! A strategy is a list of indicators plus entry and exit rule sets. Rule sets
//! address indicator outputs by column name (see [`crate::domain::indicator`]).

use serde::{Deserialize, Serialize};

use crate::domain::condition::{Condition, ConditionValue, Operator};
use crate::domain::indicator::IndicatorSpec;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub indicators: Vec<IndicatorSpec>,
    pub entry_rules: Vec<Condition>,
    pub exit_rules: Vec<Condition>,
}

impl Strategy {
    /// Synthesize symmetric rules when indicators are present but a rule set
    /// is empty.
    ///
    /// Entry comes from the first SMA, RSI or EMA indicator (`SMA_p > close`,
    /// `RSI_p > 50`, `EMA_p > close`); exit mirrors every entry rule.
    /// Returns true if any rule was added.
    pub fn fill_default_rules(&mut self) -> bool {
        if self.indicators.is_empty()
            || (!self.entry_rules.is_empty() && !self.exit_rules.is_empty())
        {
            return false;
        }

        let mut changed = false;

        if self.entry_rules.is_empty() {
            let default_entry = self.indicators.iter().find_map(|spec| match spec {
                IndicatorSpec::Sma { period } => Some(Condition::new(
                    format!("SMA_{period}"),
                    Operator::Gt,
                    "close",
                )),
                IndicatorSpec::Rsi { period } => Some(Condition::new(
                    format!("RSI_{period}"),
                    Operator::Gt,
                    ConditionValue::Text("50".into()),
                )),
                IndicatorSpec::Ema { period } => Some(Condition::new(
                    format!("EMA_{period}"),
                    Operator::Gt,
                    "close",
                )),
                IndicatorSpec::Macd { .. } => None,
            });
            if let Some(rule) = default_entry {
                self.entry_rules.push(rule);
                changed = true;
            }
        }

        if self.exit_rules.is_empty() && !self.entry_rules.is_empty() {
            self.exit_rules = self.entry_rules.iter().map(Condition::mirrored).collect();
            changed = true;
        }

        changed
    }
}
