pub mod column;
pub mod condition;
pub mod error;
pub mod evaluate;
pub mod group;
pub mod operator;
pub mod query_string;
pub mod relative_date;
pub mod types;
pub mod value;

pub use column::{Column, ColumnOption};
pub use condition::FilterCondition;
pub use error::FilterError;
pub use group::{FilterGroup, FilterNode};
pub use operator::{InputKind, Operator, ValueArity};
pub use query_string::{filters_to_query_string, query_string_to_filters};
pub use relative_date::RelativeDate;
pub use types::*;
pub use value::FilterValue;
