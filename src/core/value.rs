use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::FilterError;

/// Value held by a condition
///
/// A missing value is represented by `Option::None` on the condition, so the
/// JSON form stays the natural one: `null`, `true`, `18`, `"bob"`, `["a","b"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "json_schema", derive(schemars::JsonSchema))]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Coerce raw numeric input: empty means "no value", anything that is not a
    /// finite number is rejected.
    pub fn parse_number_input(input: &str) -> Result<Option<FilterValue>, FilterError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Some(FilterValue::Number(n))),
            _ => Err(FilterError::InvalidNumber(trimmed.to_string())),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Number(n) => Some(*n),
            FilterValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FilterValue::List(_))
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(self, FilterValue::Text(s) if s.is_empty())
    }

    /// Elements of a list value; a scalar is a one-element list
    pub fn to_list(&self) -> Vec<FilterValue> {
        match self {
            FilterValue::List(items) => items.clone(),
            other => vec![other.clone()],
        }
    }

    /// First element of a list value, or the scalar itself
    pub fn first_scalar(&self) -> Option<FilterValue> {
        match self {
            FilterValue::List(items) => items.first().cloned(),
            other => Some(other.clone()),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Bool(b) => write!(f, "{b}"),
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::Text(s) => write!(f, "{s}"),
            FilterValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        FilterValue::Number(n)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Number(n as f64)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(items: Vec<T>) -> Self {
        FilterValue::List(items.into_iter().map(Into::into).collect())
    }
}
