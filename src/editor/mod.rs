pub mod builder;
pub mod row;

pub use builder::{BuilderOptions, FilterBuilder};
pub use row::{ConditionRow, RowState};
