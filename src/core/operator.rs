//! Column/operator registry
//!
//! Static table from a column type to its ordered list of legal comparison
//! operators. The first operator of each list is the default used when a
//! condition is created or its column changes.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::types::ColumnType;

/// Comparison operator of a single condition
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[cfg_attr(feature = "json_schema", derive(schemars::JsonSchema))]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Between,
    Before,
    After,
    In,
    NotIn,
    IsEmpty,
    IsNotEmpty,
    IsTrue,
    IsFalse,
}

/// Shape of the value an operator expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueArity {
    /// `value` and `value2` stay null
    None,
    Single,
    /// `value` is the lower bound, `value2` the upper bound
    Range,
    /// `value` is a list
    Multi,
}

/// Input affordance the editor needs for a (column, operator) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    None,
    Text,
    Number,
    Date,
    TextRange,
    NumberRange,
    DateRange,
    /// Pick one or many of the column's enumerated options
    MultiSelect,
    /// Free-form comma separated list
    TagList,
}

impl Operator {
    /// Human readable label shown in operator pickers
    pub fn label(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "does not equal",
            Operator::Contains => "contains",
            Operator::NotContains => "does not contain",
            Operator::StartsWith => "starts with",
            Operator::EndsWith => "ends with",
            Operator::GreaterThan => "greater than",
            Operator::LessThan => "less than",
            Operator::GreaterOrEqual => "greater or equal",
            Operator::LessOrEqual => "less or equal",
            Operator::Between => "is between",
            Operator::Before => "is before",
            Operator::After => "is after",
            Operator::In => "is any of",
            Operator::NotIn => "is none of",
            Operator::IsEmpty => "is empty",
            Operator::IsNotEmpty => "is not empty",
            Operator::IsTrue => "is true",
            Operator::IsFalse => "is false",
        }
    }

    pub fn arity(&self) -> ValueArity {
        match self {
            Operator::IsEmpty | Operator::IsNotEmpty | Operator::IsTrue | Operator::IsFalse => {
                ValueArity::None
            }
            Operator::Between => ValueArity::Range,
            Operator::In | Operator::NotIn => ValueArity::Multi,
            _ => ValueArity::Single,
        }
    }

    pub fn is_no_value(&self) -> bool {
        self.arity() == ValueArity::None
    }

    pub fn is_range(&self) -> bool {
        self.arity() == ValueArity::Range
    }

    pub fn is_multi_value(&self) -> bool {
        self.arity() == ValueArity::Multi
    }

    /// Operators that take one or many values when the column has options
    pub fn is_flexible(&self) -> bool {
        matches!(
            self,
            Operator::Equals | Operator::NotEquals | Operator::In | Operator::NotIn
        )
    }

    /// Operators for which free-text value suggestions are offered
    pub fn supports_suggestions(&self) -> bool {
        matches!(
            self,
            Operator::Contains | Operator::Equals | Operator::StartsWith | Operator::EndsWith
        )
    }
}

const TEXT_OPERATORS: [Operator; 8] = [
    Operator::Equals,
    Operator::NotEquals,
    Operator::Contains,
    Operator::NotContains,
    Operator::StartsWith,
    Operator::EndsWith,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
];

const NUMBER_OPERATORS: [Operator; 9] = [
    Operator::Equals,
    Operator::NotEquals,
    Operator::GreaterThan,
    Operator::LessThan,
    Operator::GreaterOrEqual,
    Operator::LessOrEqual,
    Operator::Between,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
];

const BOOLEAN_OPERATORS: [Operator; 2] = [Operator::IsTrue, Operator::IsFalse];

const DATE_OPERATORS: [Operator; 6] = [
    Operator::Equals,
    Operator::Before,
    Operator::After,
    Operator::Between,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
];

const SELECT_OPERATORS: [Operator; 6] = [
    Operator::Equals,
    Operator::NotEquals,
    Operator::In,
    Operator::NotIn,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
];

const ARRAY_OPERATORS: [Operator; 6] = [
    Operator::Contains,
    Operator::NotContains,
    Operator::In,
    Operator::NotIn,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
];

/// Ordered legal operators for a column type
pub fn operators_for(column_type: ColumnType) -> &'static [Operator] {
    match column_type {
        ColumnType::Text | ColumnType::Email => &TEXT_OPERATORS,
        ColumnType::Number => &NUMBER_OPERATORS,
        ColumnType::Boolean => &BOOLEAN_OPERATORS,
        ColumnType::Date => &DATE_OPERATORS,
        ColumnType::Select => &SELECT_OPERATORS,
        ColumnType::Array => &ARRAY_OPERATORS,
    }
}

/// `(operator, label)` pairs for an operator picker
pub fn operator_options(column_type: ColumnType) -> Vec<(Operator, &'static str)> {
    operators_for(column_type)
        .iter()
        .map(|op| (*op, op.label()))
        .collect()
}

pub fn default_operator(column_type: ColumnType) -> Operator {
    operators_for(column_type)[0]
}

pub fn is_legal(column_type: ColumnType, operator: Operator) -> bool {
    operators_for(column_type).contains(&operator)
}

/// Which input the editor renders for a column of `column_type` using `operator`
pub fn input_kind(column_type: ColumnType, has_options: bool, operator: Operator) -> InputKind {
    if operator.is_no_value() {
        return InputKind::None;
    }
    if column_type == ColumnType::Select || (operator.is_flexible() && has_options) {
        return InputKind::MultiSelect;
    }
    if operator.is_multi_value() {
        return InputKind::TagList;
    }
    match (column_type, operator.is_range()) {
        (ColumnType::Number, true) => InputKind::NumberRange,
        (ColumnType::Date, true) => InputKind::DateRange,
        (_, true) => InputKind::TextRange,
        (ColumnType::Number, false) => InputKind::Number,
        (ColumnType::Date, false) => InputKind::Date,
        _ => InputKind::Text,
    }
}
