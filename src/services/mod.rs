//! Asynchronous services: value suggestions and dashboard REST access

pub mod dashboard_service;
pub mod error;
pub mod suggestion_service;

pub use dashboard_service::{
    radius_user_columns, AggregatePoint, AggregationType, ApiConfig, ChartType, DashboardClient,
    HttpSuggestionSource, RadiusDataRequest, WidgetConfig,
};
pub use error::ServiceError;
pub use suggestion_service::{
    merge_suggestions, Suggestion, SuggestionService, SuggestionSettings, SuggestionSource,
};
