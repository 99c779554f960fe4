//! Single-predicate condition and its editing operations
//!
//! Every editing operation returns a new condition; the tree editor swaps it
//! into the group with `update_condition`.

use serde::{Deserialize, Serialize};

use super::column::{Column, column_type_of, find_column};
use super::error::FilterError;
use super::operator::{self, Operator, ValueArity};
use super::types::{ColumnType, NodeId};
use super::value::FilterValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "json_schema", derive(schemars::JsonSchema))]
pub struct FilterCondition {
    pub id: NodeId,
    pub column: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Option<FilterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<FilterValue>,
}

impl FilterCondition {
    /// Fresh condition on `column` using the registry default operator
    pub fn new(column: &Column) -> Self {
        Self {
            id: NodeId::new(),
            column: column.key.clone(),
            operator: operator::default_operator(column.column_type),
            value: None,
            value2: None,
        }
    }

    /// Fully specified condition; the shape of the values is normalized to the operator
    pub fn with_parts(
        column: impl Into<String>,
        operator: Operator,
        value: Option<FilterValue>,
        value2: Option<FilterValue>,
    ) -> Self {
        Self {
            id: NodeId::new(),
            column: column.into(),
            operator,
            value,
            value2,
        }
        .normalized()
    }

    pub fn column_type(&self, columns: &[Column]) -> ColumnType {
        column_type_of(columns, &self.column)
    }

    /// Switch to another column: operator resets to that type's default, values are cleared
    pub fn with_column(&self, columns: &[Column], key: &str) -> Self {
        let column_type = column_type_of(columns, key);
        Self {
            id: self.id.clone(),
            column: key.to_string(),
            operator: operator::default_operator(column_type),
            value: None,
            value2: None,
        }
    }

    pub fn with_operator(&self, operator: Operator) -> Self {
        let mut next = self.clone();
        next.operator = operator;
        next.normalized()
    }

    pub fn with_value(&self, value: Option<FilterValue>) -> Self {
        Self {
            value,
            ..self.clone()
        }
    }

    pub fn with_value2(&self, value2: Option<FilterValue>) -> Self {
        Self {
            value2,
            ..self.clone()
        }
    }

    /// Assign raw text typed into the value field
    ///
    /// Numeric columns parse the input (empty clears the value, garbage is
    /// rejected and the condition is left untouched by the caller). Multi-value
    /// operators without options split the input on commas.
    pub fn with_value_input(&self, columns: &[Column], raw: &str) -> Result<Self, FilterError> {
        let value = self.coerce_input(columns, raw)?;
        Ok(self.with_value(value))
    }

    pub fn with_value2_input(&self, columns: &[Column], raw: &str) -> Result<Self, FilterError> {
        let value2 = self.coerce_scalar(columns, raw)?;
        Ok(self.with_value2(value2))
    }

    fn coerce_input(&self, columns: &[Column], raw: &str) -> Result<Option<FilterValue>, FilterError> {
        if self.operator.is_multi_value() {
            let numeric = self.column_type(columns) == ColumnType::Number;
            let mut items = Vec::new();
            for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                if numeric {
                    if let Some(v) = FilterValue::parse_number_input(part)? {
                        items.push(v);
                    }
                } else {
                    items.push(FilterValue::from(part));
                }
            }
            return Ok(Some(FilterValue::List(items)));
        }
        self.coerce_scalar(columns, raw)
    }

    fn coerce_scalar(&self, columns: &[Column], raw: &str) -> Result<Option<FilterValue>, FilterError> {
        match self.column_type(columns) {
            ColumnType::Number => FilterValue::parse_number_input(raw),
            // empty text renders as an empty segment, which reads back as null
            _ if raw.is_empty() => Ok(None),
            _ => Ok(Some(FilterValue::from(raw))),
        }
    }

    /// Add `option` to the list value, or remove it when already present
    pub fn toggle_option(&self, option: &str) -> Self {
        let mut items = match &self.value {
            Some(v) => v.to_list(),
            None => Vec::new(),
        };
        let wanted = FilterValue::from(option);
        if let Some(pos) = items.iter().position(|v| *v == wanted) {
            items.remove(pos);
        } else {
            items.push(wanted);
        }
        self.with_value(Some(FilterValue::List(items)))
    }

    /// Copy with a fresh id
    pub fn duplicated(&self) -> Self {
        Self {
            id: NodeId::new(),
            ..self.clone()
        }
    }

    /// Bring `value`/`value2` in line with the operator's arity
    pub fn normalized(mut self) -> Self {
        match self.operator.arity() {
            ValueArity::None => {
                self.value = None;
                self.value2 = None;
            }
            ValueArity::Range => {
                self.value = self.value.filter(|v| !v.is_empty_text());
                self.value2 = self.value2.filter(|v| !v.is_empty_text());
            }
            ValueArity::Multi => {
                self.value2 = None;
                self.value = Some(match self.value.take() {
                    Some(v) => FilterValue::List(v.to_list()),
                    None => FilterValue::List(Vec::new()),
                });
            }
            ValueArity::Single => {
                self.value2 = None;
                // flexible operators keep lists (multi-select over options)
                if !self.operator.is_flexible() {
                    if let Some(FilterValue::List(items)) = &self.value {
                        self.value = items.first().cloned();
                    }
                }
                self.value = self.value.filter(|v| !v.is_empty_text());
            }
        }
        self
    }

    pub fn is_legal(&self, columns: &[Column]) -> bool {
        operator::is_legal(self.column_type(columns), self.operator)
    }

    /// One-line description for lists and logs
    pub fn summary(&self, columns: &[Column]) -> String {
        let label = find_column(columns, &self.column)
            .map(|c| c.label.as_str())
            .unwrap_or("Select field...");
        let value = self.value.as_ref().map(|v| v.to_string()).unwrap_or_default();
        match self.operator.arity() {
            ValueArity::None => format!("{} {}", label, self.operator.label()),
            ValueArity::Range => {
                let value2 = self.value2.as_ref().map(|v| v.to_string()).unwrap_or_default();
                format!("{} {} {} and {}", label, self.operator.label(), value, value2)
            }
            ValueArity::Multi => format!("{} {} [{}]", label, self.operator.label(), value),
            ValueArity::Single => format!("{} {} \"{}\"", label, self.operator.label(), value),
        }
    }
}
