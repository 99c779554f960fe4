//! Editor state for one condition row
//!
//! The row keeps its own copy of the condition. Every edit returns the updated
//! condition so the owner can push it into the tree with `update_condition`.
//!
//! Suggestion popup lifecycle:
//!
//! ```text
//! Idle --focus--> SuggestionsOpen --blur--> Closing --(close delay)--> Idle
//!                       ^                      |
//!                       +-------focus----------+
//! ```
//! Selecting a suggestion closes the popup at once.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::core::column::{find_column, Column};
use crate::core::condition::FilterCondition;
use crate::core::error::FilterError;
use crate::core::operator::{self, InputKind, Operator};
use crate::core::relative_date::RelativeDate;
use crate::core::types::ColumnType;
use crate::core::value::FilterValue;
use crate::services::suggestion_service::{
    Suggestion, SuggestionService, SuggestionSettings, SuggestionSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Idle,
    SuggestionsOpen,
    /// Blurred; the popup closes once `deadline` passes unless focus returns
    Closing { deadline: Instant },
}

#[derive(Debug)]
pub struct ConditionRow {
    condition: FilterCondition,
    state: RowState,
    input: String,
    suggestions: Vec<Suggestion>,
    fetcher: SuggestionService,
    close_delay: Duration,
    last_error: Option<FilterError>,
}

impl ConditionRow {
    pub fn new(
        condition: FilterCondition,
        source: Option<Arc<dyn SuggestionSource>>,
        settings: SuggestionSettings,
        close_delay: Duration,
    ) -> Self {
        let input = seed_input(&condition);
        Self {
            condition,
            state: RowState::Idle,
            input,
            suggestions: Vec::new(),
            fetcher: SuggestionService::new(source, settings),
            close_delay,
            last_error: None,
        }
    }

    pub fn condition(&self) -> &FilterCondition {
        &self.condition
    }

    pub fn state(&self) -> RowState {
        self.state
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    pub fn last_error(&self) -> Option<&FilterError> {
        self.last_error.as_ref()
    }

    pub fn is_popup_open(&self) -> bool {
        !matches!(self.state, RowState::Idle)
    }

    pub fn input_kind(&self, columns: &[Column]) -> InputKind {
        let column = find_column(columns, &self.condition.column);
        operator::input_kind(
            self.condition.column_type(columns),
            column.is_some_and(Column::has_options),
            self.condition.operator,
        )
    }

    /// Free-text suggestions only apply to text-like columns with a matching operator
    pub fn supports_suggestions(&self, columns: &[Column]) -> bool {
        matches!(
            self.condition.column_type(columns),
            ColumnType::Text | ColumnType::Email
        ) && self.condition.operator.supports_suggestions()
    }

    /// Relative date tokens offered for date columns
    pub fn relative_date_options(&self, columns: &[Column]) -> Vec<RelativeDate> {
        if self.condition.column_type(columns) == ColumnType::Date {
            RelativeDate::all()
        } else {
            Vec::new()
        }
    }

    pub fn on_column_change(&mut self, columns: &[Column], key: &str) -> FilterCondition {
        self.condition = self.condition.with_column(columns, key);
        self.reset_input();
        self.condition.clone()
    }

    pub fn on_operator_change(&mut self, operator: Operator) -> FilterCondition {
        self.condition = self.condition.with_operator(operator);
        if self.condition.operator.is_no_value() {
            self.reset_input();
        }
        self.condition.clone()
    }

    /// Typed input for the primary value
    ///
    /// Rejected numeric input keeps the previous value; the error is kept for
    /// display until the next successful edit.
    pub fn on_value_change(
        &mut self,
        columns: &[Column],
        raw: &str,
    ) -> Result<FilterCondition, FilterError> {
        self.input = raw.to_string();
        match self.condition.with_value_input(columns, raw) {
            Ok(next) => {
                self.condition = next;
                self.last_error = None;
            }
            Err(e) => {
                debug!("Rejected value input for '{}': {}", self.condition.column, e);
                self.last_error = Some(e.clone());
                return Err(e);
            }
        }
        if matches!(self.state, RowState::SuggestionsOpen) {
            self.schedule_fetch(columns);
        }
        Ok(self.condition.clone())
    }

    pub fn on_value2_change(
        &mut self,
        columns: &[Column],
        raw: &str,
    ) -> Result<FilterCondition, FilterError> {
        match self.condition.with_value2_input(columns, raw) {
            Ok(next) => {
                self.condition = next;
                self.last_error = None;
                Ok(self.condition.clone())
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    pub fn toggle_option(&mut self, option: &str) -> FilterCondition {
        self.condition = self.condition.toggle_option(option);
        self.condition.clone()
    }

    /// Insert a relative date token as the literal value
    pub fn insert_relative_date(&mut self, token: RelativeDate) -> FilterCondition {
        self.input = token.to_string();
        self.condition = self
            .condition
            .with_value(Some(FilterValue::from(token.to_string())));
        self.condition.clone()
    }

    pub fn focus(&mut self, columns: &[Column]) {
        match self.state {
            RowState::Closing { .. } => {
                debug!("Focus returned before close delay elapsed");
                self.state = RowState::SuggestionsOpen;
            }
            RowState::Idle if self.supports_suggestions(columns) => {
                self.state = RowState::SuggestionsOpen;
                self.schedule_fetch(columns);
            }
            RowState::Idle | RowState::SuggestionsOpen => {}
        }
    }

    pub fn blur(&mut self, now: Instant) {
        if matches!(self.state, RowState::SuggestionsOpen) {
            self.state = RowState::Closing {
                deadline: now + self.close_delay,
            };
        }
    }

    /// Advance timers and collect suggestion results; returns true when the view changed
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if let RowState::Closing { deadline } = self.state {
            if now >= deadline {
                self.close_popup();
                return true;
            }
        }
        if self.is_popup_open() {
            if let Some(items) = self.fetcher.try_latest() {
                self.suggestions = items;
                changed = true;
            }
        }
        changed
    }

    /// Accept a suggestion; the popup closes immediately
    pub fn select_suggestion(&mut self, index: usize) -> Option<FilterCondition> {
        let chosen = self.suggestions.get(index)?.value.clone();
        self.input = chosen.clone();
        self.condition = self.condition.with_value(Some(FilterValue::from(chosen)));
        self.close_popup();
        Some(self.condition.clone())
    }

    /// Await the current fetch and install its results
    pub async fn wait_for_suggestions(&mut self) -> Option<&[Suggestion]> {
        let items = self.fetcher.next_update().await?;
        self.suggestions = items;
        Some(&self.suggestions)
    }

    /// Replace the row's condition from the tree without touching popup state
    pub fn sync(&mut self, condition: FilterCondition) {
        if condition.column != self.condition.column {
            self.reset_input();
        }
        self.condition = condition;
    }

    fn close_popup(&mut self) {
        self.fetcher.cancel();
        self.suggestions.clear();
        self.state = RowState::Idle;
    }

    fn reset_input(&mut self) {
        self.input.clear();
        self.suggestions.clear();
        self.last_error = None;
    }

    fn schedule_fetch(&mut self, columns: &[Column]) {
        let statics = find_column(columns, &self.condition.column)
            .map(|c| c.suggestions.clone())
            .unwrap_or_default();
        self.fetcher
            .schedule(&self.condition.column, &self.input, &statics);
    }
}

/// Text shown in the value field for an existing condition
///
/// Lists are joined with a trailing comma so further typing starts a new item.
fn seed_input(condition: &FilterCondition) -> String {
    match &condition.value {
        None => String::new(),
        Some(FilterValue::List(items)) if items.is_empty() => String::new(),
        Some(list @ FilterValue::List(_)) => format!("{list},"),
        Some(v) => v.to_string(),
    }
}
