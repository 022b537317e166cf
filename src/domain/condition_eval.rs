//! Condition evaluation.
//!
//! Evaluates a rule set against one row of price fields and indicator values.
//!
//! # Evaluation Semantics
//!
//! - Left operand: looked up by column name
//! - Right operand: numeric literal if it parses, otherwise a column name
//! - A condition whose operands are missing or NaN is skipped, not failed
//! - Result is `true` only if at least one condition resolved and every
//!   resolved condition holds; an empty or fully unresolvable set is `false`

use tracing::debug;

use crate::domain::condition::{Condition, ConditionValue};
use crate::domain::indicator::Row;

pub fn evaluate(row: &Row, conditions: &[Condition]) -> bool {
    let mut resolved = 0usize;

    for condition in conditions {
        let Some(left) = resolve_column(row, &condition.indicator) else {
            debug!(condition = %condition, "left operand unavailable, skipping condition");
            continue;
        };
        let Some(right) = resolve_value(row, &condition.value) else {
            debug!(condition = %condition, "right operand unavailable, skipping condition");
            continue;
        };

        resolved += 1;
        if !condition.operator.apply(left, right) {
            return false;
        }
    }

    resolved > 0
}

/// True when any of `columns` is present in the row with a NaN value.
/// Absent columns are not counted; the evaluator skips those per condition.
pub fn has_missing_values(row: &Row, columns: &[&str]) -> bool {
    columns
        .iter()
        .any(|name| row.get(*name).is_some_and(|v| v.is_nan()))
}

fn resolve_column(row: &Row, name: &str) -> Option<f64> {
    row.get(name).copied().filter(|v| !v.is_nan())
}

fn resolve_value(row: &Row, value: &ConditionValue) -> Option<f64> {
    let resolved = match value.as_literal() {
        Some(literal) => Some(literal),
        None => match value {
            ConditionValue::Text(name) => row.get(name.as_str()).copied(),
            ConditionValue::Number(n) => Some(*n),
        },
    };
    resolved.filter(|v| !v.is_nan())
}
