//! Error type for filter model and query-string operations

use thiserror::Error;

use super::types::ColumnType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("`{0}` is not a number")]
    InvalidNumber(String),

    #[error("unknown operator `{0}`")]
    UnknownOperator(String),

    #[error("unknown column type `{0}`")]
    UnknownColumnType(String),

    #[error("operator `{operator}` is not allowed for {column_type} columns")]
    IllegalOperator {
        operator: String,
        column_type: ColumnType,
    },

    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("AND and OR cannot be mixed in one group (offset {offset}); use parentheses")]
    MixedLogic { offset: usize },
}

impl FilterError {
    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            message: message.into(),
        }
    }
}
