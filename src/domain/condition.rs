//! Condition data structures.
//!
//! A rule set (entry or exit) is an ordered list of conditions, ANDed:
//! - `Operator`: the comparison applied between the two operands
//! - `ConditionValue`: right operand, a number or a string naming a literal,
//!   a price field, or another column
//! - `Condition`: `<column> <operator> <value>`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

impl Operator {
    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            Operator::Gt => left > right,
            Operator::Lt => left < right,
            Operator::Eq => left == right,
            Operator::Ge => left >= right,
            Operator::Le => left <= right,
        }
    }

    /// Mirror used when deriving an exit rule from an entry rule.
    /// `==` has no mirror and is returned unchanged.
    pub fn flipped(self) -> Self {
        match self {
            Operator::Gt => Operator::Lt,
            Operator::Lt => Operator::Gt,
            Operator::Ge => Operator::Le,
            Operator::Le => Operator::Ge,
            Operator::Eq => Operator::Eq,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Eq => "==",
            Operator::Ge => ">=",
            Operator::Le => "<=",
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            "==" => Ok(Operator::Eq),
            ">=" => Ok(Operator::Ge),
            "<=" => Ok(Operator::Le),
            other => Err(format!("unsupported operator: {other}")),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Number(f64),
    Text(String),
}

impl ConditionValue {
    /// The numeric literal this value carries, if any. Numeric strings such
    /// as `"50"` count as literals.
    pub fn as_literal(&self) -> Option<f64> {
        match self {
            ConditionValue::Number(n) => Some(*n),
            ConditionValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// The column this value names, when it is not a numeric literal.
    pub fn column_ref(&self) -> Option<&str> {
        match self {
            ConditionValue::Text(s) if self.as_literal().is_none() => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<f64> for ConditionValue {
    fn from(value: f64) -> Self {
        ConditionValue::Number(value)
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        ConditionValue::Text(value.to_string())
    }
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::Number(n) => write!(f, "{}", n),
            ConditionValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub indicator: String,
    pub operator: Operator,
    pub value: ConditionValue,
}

impl Condition {
    pub fn new(
        indicator: impl Into<String>,
        operator: Operator,
        value: impl Into<ConditionValue>,
    ) -> Self {
        Self {
            indicator: indicator.into(),
            operator,
            value: value.into(),
        }
    }

    /// Same condition with the operator mirrored.
    pub fn mirrored(&self) -> Self {
        Self {
            operator: self.operator.flipped(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.indicator, self.operator, self.value)
    }
}

/// Every column name the given rule sets read, without duplicates. Within a
/// set left operands come first; sets are visited in order.
pub fn referenced_columns<'a>(rule_sets: &[&'a [Condition]]) -> Vec<&'a str> {
    let mut names: Vec<&str> = Vec::new();
    for conditions in rule_sets {
        let lefts = conditions.iter().map(|c| c.indicator.as_str());
        let rights = conditions.iter().filter_map(|c| c.value.column_ref());
        for name in lefts.chain(rights) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}
