#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_match)]
#![allow(clippy::collapsible_else_if)]

pub mod config;
pub mod core;
pub mod editor;
pub mod errors;
pub mod logging;
pub mod services;
pub mod tui;

// Re-export commonly used types
pub use core::{
    filters_to_query_string, query_string_to_filters, Column, ColumnOption, ColumnType,
    FilterCondition, FilterError, FilterGroup, FilterNode, FilterValue, Logic, NodeId, Operator,
};
pub use editor::{BuilderOptions, FilterBuilder};
pub use services::{DashboardClient, ServiceError, SuggestionService};
pub use tui::Action;
