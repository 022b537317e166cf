//! Block list to Strategy normalizer.
//!
//! The editor emits a flat list of blocks:
//!
//! ```json
//! [
//!   {"type": "indicator", "indicatorType": "RSI", "period": 14},
//!   {"type": "entry", "conditions": [{"indicator": "RSI_14", "operator": "<", "value": 30}]},
//!   {"type": "exit",  "conditions": [{"indicator": "RSI_14", "operator": ">", "value": 70}]}
//! ]
//! ```
//!
//! Malformed blocks and conditions are logged and skipped. Missing pieces are
//! filled with defaults so the result is always runnable:
//! - no indicators: SMA(20)
//! - no entry rules: one rule on the first SMA or RSI indicator
//! - no exit rules: the first entry rule with its operator mirrored

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::domain::condition::{Condition, ConditionValue, Operator};
use crate::domain::error::AlgoblocksError;
use crate::domain::indicator::IndicatorSpec;
use crate::domain::indicator::macd::{DEFAULT_FAST, DEFAULT_SIGNAL, DEFAULT_SLOW};
use crate::domain::strategy::Strategy;

const DEFAULT_MA_PERIOD: usize = 20;
const DEFAULT_RSI_PERIOD: usize = 14;
const DEFAULT_RULE_COLUMN: &str = "SMA_20";

pub fn parse_blocks(blocks: &Value) -> Result<Strategy, AlgoblocksError> {
    let parsed_from_text;
    let blocks = match blocks {
        Value::String(text) => {
            parsed_from_text = serde_json::from_str::<Value>(text).unwrap_or_else(|e| {
                warn!(error = %e, "failed to parse blocks from JSON string");
                Value::Array(Vec::new())
            });
            &parsed_from_text
        }
        other => other,
    };

    let list: &[Value] = match blocks {
        Value::Array(items) => items.as_slice(),
        Value::Null => &[],
        other => {
            warn!(kind = %json_kind(other), "blocks are not a list, treating as empty");
            &[]
        }
    };

    info!(blocks = list.len(), "parsing strategy blocks");

    let mut indicators = Vec::new();
    let mut entry_rules = Vec::new();
    let mut exit_rules = Vec::new();

    for block in list {
        let Some(obj) = block.as_object() else {
            warn!(block = %block, "skipping non-object block");
            continue;
        };

        let block_type = obj.get("type").and_then(Value::as_str).unwrap_or("");
        debug!(block_type, "processing block");

        match block_type {
            "indicator" => {
                if let Some(spec) = parse_indicator(obj)? {
                    info!(indicator = %spec, "added indicator");
                    indicators.push(spec);
                }
            }
            "entry" => parse_conditions(obj, "entry", &mut entry_rules),
            "exit" => parse_conditions(obj, "exit", &mut exit_rules),
            other => warn!(block_type = other, "unknown block type"),
        }
    }

    if indicators.is_empty() {
        info!("no indicators found, adding default SMA(20)");
        indicators.push(IndicatorSpec::Sma {
            period: DEFAULT_MA_PERIOD,
        });
    }

    if entry_rules.is_empty() {
        let rule = default_entry_rule(&indicators);
        info!(rule = %rule, "no entry rules found, adding default");
        entry_rules.push(rule);
    }

    if exit_rules.is_empty() {
        let rule = entry_rules
            .first()
            .map(Condition::mirrored)
            .unwrap_or_else(|| Condition::new(DEFAULT_RULE_COLUMN, Operator::Lt, "close"));
        info!(rule = %rule, "no exit rules found, adding default");
        exit_rules.push(rule);
    }

    info!(
        indicators = indicators.len(),
        entry_rules = entry_rules.len(),
        exit_rules = exit_rules.len(),
        "parsed strategy"
    );

    Ok(Strategy {
        indicators,
        entry_rules,
        exit_rules,
    })
}

/// Parse a strategy file: either a full Strategy object, an object with a
/// `blocks` list, or a bare block list.
pub fn parse_strategy_document(text: &str) -> Result<Strategy, AlgoblocksError> {
    let value: Value = serde_json::from_str(text)?;

    match &value {
        Value::Object(obj) if obj.contains_key("indicators") => {
            serde_json::from_value(value.clone()).map_err(|e| AlgoblocksError::StrategyShape {
                reason: e.to_string(),
            })
        }
        Value::Object(obj) => match obj.get("blocks") {
            Some(blocks) => parse_blocks(blocks),
            None => Err(AlgoblocksError::StrategyShape {
                reason: "expected `indicators` or `blocks`".to_string(),
            }),
        },
        Value::Array(_) | Value::String(_) => parse_blocks(&value),
        other => Err(AlgoblocksError::StrategyShape {
            reason: format!("expected an object or a list, got {}", json_kind(other)),
        }),
    }
}

fn parse_indicator(block: &Map<String, Value>) -> Result<Option<IndicatorSpec>, AlgoblocksError> {
    let indicator_type = ["indicatorType", "indicator_type"]
        .iter()
        .filter_map(|key| block.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty());

    let Some(indicator_type) = indicator_type else {
        warn!("indicator block missing indicator type");
        return Ok(None);
    };

    let spec = match indicator_type {
        "SMA" => IndicatorSpec::Sma {
            period: period_param(block, "period", DEFAULT_MA_PERIOD)?,
        },
        "EMA" => IndicatorSpec::Ema {
            period: period_param(block, "period", DEFAULT_MA_PERIOD)?,
        },
        "RSI" => IndicatorSpec::Rsi {
            period: period_param(block, "period", DEFAULT_RSI_PERIOD)?,
        },
        "MACD" => IndicatorSpec::Macd {
            fast_period: period_param(block, "fastPeriod", DEFAULT_FAST)?,
            slow_period: period_param(block, "slowPeriod", DEFAULT_SLOW)?,
            signal_period: period_param(block, "signalPeriod", DEFAULT_SIGNAL)?,
        },
        other => {
            warn!(indicator_type = other, "unsupported indicator type");
            return Ok(None);
        }
    };

    Ok(Some(spec))
}

/// Integer period from a number or numeric string; absent means `default`.
fn period_param(
    block: &Map<String, Value>,
    key: &str,
    default: usize,
) -> Result<usize, AlgoblocksError> {
    let invalid = |value: &Value| AlgoblocksError::StrategyShape {
        reason: format!("{key} must be a non-negative integer, got {value}"),
    };

    match block.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value @ Value::Number(n)) => {
            if let Some(u) = n.as_u64() {
                usize::try_from(u).map_err(|_| invalid(value))
            } else {
                match n.as_f64() {
                    Some(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as usize),
                    _ => Err(invalid(value)),
                }
            }
        }
        Some(value @ Value::String(s)) => s.trim().parse::<usize>().map_err(|_| invalid(value)),
        Some(other) => Err(invalid(other)),
    }
}

fn parse_conditions(block: &Map<String, Value>, rule_type: &str, out: &mut Vec<Condition>) {
    let conditions = block
        .get("conditions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    if conditions.is_empty() {
        warn!(rule_type, "no conditions found in rule block");
        return;
    }

    for raw in conditions {
        let Some(obj) = raw.as_object() else {
            warn!(rule_type, condition = %raw, "skipping non-object condition");
            continue;
        };

        let indicator = obj.get("indicator").and_then(Value::as_str).unwrap_or("");
        if indicator.is_empty() {
            warn!(rule_type, "missing indicator in condition");
            continue;
        }

        let operator = match obj.get("operator") {
            None => Operator::Gt,
            Some(Value::String(s)) => match s.parse::<Operator>() {
                Ok(op) => op,
                Err(e) => {
                    warn!(rule_type, indicator, error = %e, "skipping condition");
                    continue;
                }
            },
            Some(other) => {
                warn!(rule_type, indicator, operator = %other, "skipping condition with non-string operator");
                continue;
            }
        };

        let value = match obj.get("value") {
            None | Some(Value::Null) => ConditionValue::Number(0.0),
            Some(Value::Number(n)) => match n.as_f64() {
                Some(f) => ConditionValue::Number(f),
                None => {
                    warn!(rule_type, indicator, "skipping condition with unrepresentable value");
                    continue;
                }
            },
            Some(Value::String(s)) => ConditionValue::Text(s.clone()),
            Some(other) => {
                warn!(rule_type, indicator, value = %other, "skipping condition with unsupported value");
                continue;
            }
        };

        let condition = Condition {
            indicator: indicator.to_string(),
            operator,
            value,
        };
        info!(rule_type, condition = %condition, "added rule");
        out.push(condition);
    }
}

fn default_entry_rule(indicators: &[IndicatorSpec]) -> Condition {
    let column = indicators
        .iter()
        .find_map(|spec| match spec {
            IndicatorSpec::Sma { period } => Some(format!("SMA_{period}")),
            IndicatorSpec::Rsi { period } => Some(format!("RSI_{period}")),
            _ => None,
        })
        .unwrap_or_else(|| DEFAULT_RULE_COLUMN.to_string());

    if column.starts_with("RSI") {
        Condition::new(column, Operator::Gt, "50")
    } else {
        Condition::new(column, Operator::Gt, "close")
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
