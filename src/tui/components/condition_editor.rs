//! Condition editor popup
//!
//! Edits one condition through a `ConditionRow`: pick the field, pick the
//! operator, then type or pick the value. Changes are handed back on Confirm.

use std::sync::Arc;
use std::time::{Duration, Instant};

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};
use tracing::debug;

use crate::core::column::{find_column, Column};
use crate::core::condition::FilterCondition;
use crate::core::operator::{operators_for, InputKind};
use crate::core::relative_date::RelativeDate;
use crate::core::value::FilterValue;
use crate::editor::ConditionRow;
use crate::services::{SuggestionSettings, SuggestionSource};
use crate::tui::{Action, Component, Theme};

/// Active field of the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Column,
    Operator,
    Value,
    Value2,
}

/// What the user decided when the editor closed
#[derive(Debug, Clone, PartialEq)]
pub enum EditorOutcome {
    Saved(FilterCondition),
    Cancelled,
}

const EDITOR_ACTIONS: [Action; 6] = [
    Action::NextField,
    Action::PrevField,
    Action::MoveUp,
    Action::MoveDown,
    Action::Confirm,
    Action::Cancel,
];

pub struct ConditionEditor {
    row: ConditionRow,
    columns: Vec<Column>,
    active_field: EditorField,
    /// Text of the upper bound; the row only tracks the primary input
    value2_input: String,
    /// Highlight in the option list or the suggestion popup
    cursor: usize,
    outcome: Option<EditorOutcome>,
    theme: Theme,
}

impl ConditionEditor {
    pub fn new(
        condition: FilterCondition,
        columns: Vec<Column>,
        source: Option<Arc<dyn SuggestionSource>>,
        settings: SuggestionSettings,
        close_delay: Duration,
    ) -> Self {
        let value2_input = condition
            .value2
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default();
        Self {
            row: ConditionRow::new(condition, source, settings, close_delay),
            columns,
            active_field: EditorField::Column,
            value2_input,
            cursor: 0,
            outcome: None,
            theme: Theme::default(),
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn condition(&self) -> &FilterCondition {
        self.row.condition()
    }

    pub fn row(&self) -> &ConditionRow {
        &self.row
    }

    pub fn active_field(&self) -> EditorField {
        self.active_field
    }

    /// Take the outcome once the editor is done
    pub fn take_outcome(&mut self) -> Option<EditorOutcome> {
        self.outcome.take()
    }

    fn input_kind(&self) -> InputKind {
        self.row.input_kind(&self.columns)
    }

    fn fields(&self) -> Vec<EditorField> {
        let mut fields = vec![EditorField::Column, EditorField::Operator];
        match self.input_kind() {
            InputKind::None => {}
            InputKind::TextRange | InputKind::NumberRange | InputKind::DateRange => {
                fields.push(EditorField::Value);
                fields.push(EditorField::Value2);
            }
            _ => fields.push(EditorField::Value),
        }
        fields
    }

    fn set_field(&mut self, field: EditorField) {
        if field == self.active_field {
            return;
        }
        if self.active_field == EditorField::Value {
            self.row.blur(Instant::now());
        }
        self.active_field = field;
        self.cursor = 0;
        if field == EditorField::Value {
            self.row.focus(&self.columns);
        }
    }

    fn step_field(&mut self, forward: bool) {
        let fields = self.fields();
        let pos = fields
            .iter()
            .position(|f| *f == self.active_field)
            .unwrap_or(0);
        let next = if forward {
            (pos + 1) % fields.len()
        } else {
            (pos + fields.len() - 1) % fields.len()
        };
        self.set_field(fields[next]);
    }

    fn cycle_column(&mut self, forward: bool) {
        if self.columns.is_empty() {
            return;
        }
        let pos = self
            .columns
            .iter()
            .position(|c| c.key == self.row.condition().column);
        let next = match (pos, forward) {
            (None, _) => 0,
            (Some(p), true) => (p + 1) % self.columns.len(),
            (Some(p), false) => (p + self.columns.len() - 1) % self.columns.len(),
        };
        let key = self.columns[next].key.clone();
        self.row.on_column_change(&self.columns, &key);
        self.value2_input.clear();
    }

    fn cycle_operator(&mut self, forward: bool) {
        let ops = operators_for(self.row.condition().column_type(&self.columns));
        let pos = ops
            .iter()
            .position(|op| *op == self.row.condition().operator)
            .unwrap_or(0);
        let next = if forward {
            (pos + 1) % ops.len()
        } else {
            (pos + ops.len() - 1) % ops.len()
        };
        self.row.on_operator_change(ops[next]);
        if !ops[next].is_range() {
            self.value2_input.clear();
        }
    }

    /// Number of entries the cursor can move over in the value field
    fn list_len(&self) -> usize {
        match self.input_kind() {
            InputKind::MultiSelect => find_column(&self.columns, &self.row.condition().column)
                .map(|c| c.options.len())
                .unwrap_or(0),
            InputKind::Date => self.row.relative_date_options(&self.columns).len(),
            _ => self.row.suggestions().len(),
        }
    }

    fn move_cursor(&mut self, down: bool) {
        let len = self.list_len();
        if len == 0 {
            return;
        }
        self.cursor = if down {
            (self.cursor + 1) % len
        } else {
            (self.cursor + len - 1) % len
        };
        if self.input_kind() == InputKind::Date {
            if let Some(token) = self.row.relative_date_options(&self.columns).get(self.cursor) {
                self.row.insert_relative_date(*token);
            }
        }
    }

    fn toggle_option_at_cursor(&mut self) {
        let option = find_column(&self.columns, &self.row.condition().column)
            .and_then(|c| c.options.get(self.cursor))
            .map(|o| o.value.clone());
        if let Some(option) = option {
            self.row.toggle_option(&option);
        }
    }

    fn edit_text(&mut self, key: KeyEvent) -> bool {
        let value2 = self.active_field == EditorField::Value2;
        let mut text = if value2 {
            self.value2_input.clone()
        } else {
            self.row.input().to_string()
        };
        match key.code {
            KeyCode::Char(c) => text.push(c),
            KeyCode::Backspace => {
                text.pop();
            }
            _ => return false,
        }
        let result = if value2 {
            self.value2_input = text.clone();
            self.row.on_value2_change(&self.columns, &text)
        } else {
            self.row.on_value_change(&self.columns, &text)
        };
        if let Err(e) = result {
            debug!("Value input rejected: {e}");
        }
        true
    }

    fn confirm(&mut self) {
        if self.active_field == EditorField::Value && self.row.is_popup_open() {
            if !self.row.suggestions().is_empty() {
                self.row.select_suggestion(self.cursor);
                self.cursor = 0;
                return;
            }
        }
        self.outcome = Some(EditorOutcome::Saved(self.row.condition().clone()));
    }

    fn value_line(&self) -> Vec<Span<'static>> {
        let condition = self.row.condition();
        match self.input_kind() {
            InputKind::None => vec![Span::styled("(no value)", self.theme.muted_style())],
            InputKind::MultiSelect => {
                let selected = condition
                    .value
                    .as_ref()
                    .map(FilterValue::to_list)
                    .unwrap_or_default();
                let Some(column) = find_column(&self.columns, &condition.column) else {
                    return Vec::new();
                };
                column
                    .options
                    .iter()
                    .enumerate()
                    .flat_map(|(i, option)| {
                        let checked = selected.contains(&FilterValue::from(option.value.as_str()));
                        let mark = if checked { "[x] " } else { "[ ] " };
                        let mut style = self.theme.option_style(option.color.as_deref());
                        if self.active_field == EditorField::Value && i == self.cursor {
                            style = style.add_modifier(Modifier::REVERSED);
                        }
                        [
                            Span::styled(format!("{mark}{}", option.label), style),
                            Span::raw("  "),
                        ]
                    })
                    .collect()
            }
            _ => {
                let mut spans = vec![Span::raw(self.row.input().to_string())];
                if self.active_field == EditorField::Value {
                    spans.push(Span::styled("_", self.theme.muted_style()));
                }
                spans
            }
        }
    }

    fn field_style(&self, field: EditorField) -> Style {
        if self.active_field == field {
            self.theme.focused_border_style().add_modifier(Modifier::BOLD)
        } else {
            self.theme.normal_style()
        }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let condition = self.row.condition();
        let column_label = find_column(&self.columns, &condition.column)
            .map(|c| c.label.clone())
            .unwrap_or_else(|| "Select field...".to_string());

        let mut lines = vec![
            Line::from(vec![
                Span::styled("Field:    ", self.field_style(EditorField::Column)),
                Span::raw(format!("< {column_label} >")),
            ]),
            Line::from(vec![
                Span::styled("Operator: ", self.field_style(EditorField::Operator)),
                Span::raw(format!("< {} >", condition.operator.label())),
            ]),
        ];

        let mut value = vec![Span::styled("Value:    ", self.field_style(EditorField::Value))];
        value.extend(self.value_line());
        lines.push(Line::from(value));

        if self.fields().contains(&EditorField::Value2) {
            let mut spans = vec![
                Span::styled("And:      ", self.field_style(EditorField::Value2)),
                Span::raw(self.value2_input.clone()),
            ];
            if self.active_field == EditorField::Value2 {
                spans.push(Span::styled("_", self.theme.muted_style()));
            }
            lines.push(Line::from(spans));
        }

        if self.active_field == EditorField::Value && self.input_kind() == InputKind::Date {
            let tokens = self.row.relative_date_options(&self.columns);
            let hint = tokens
                .get(self.cursor)
                .map(RelativeDate::label)
                .unwrap_or("");
            lines.push(Line::from(Span::styled(
                format!("Up/Down: relative date ({hint})"),
                self.theme.muted_style(),
            )));
        }

        if let Some(err) = self.row.last_error() {
            lines.push(Line::from(Span::styled(err.to_string(), self.theme.error_style())));
        }

        if self.active_field == EditorField::Value && self.row.is_popup_open() {
            for (i, suggestion) in self.row.suggestions().iter().enumerate() {
                let style = if i == self.cursor {
                    self.theme.selected_style()
                } else {
                    self.theme.option_style(suggestion.color.as_deref())
                };
                lines.push(Line::from(Span::styled(format!("  {}", suggestion.label), style)));
            }
        }
        lines
    }
}

impl Component for ConditionEditor {
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::NextField => self.step_field(true),
            Action::PrevField => self.step_field(false),
            Action::MoveUp | Action::MoveDown => {
                let down = action == Action::MoveDown;
                match self.active_field {
                    EditorField::Column => self.cycle_column(down),
                    EditorField::Operator => self.cycle_operator(down),
                    EditorField::Value => self.move_cursor(down),
                    EditorField::Value2 => {}
                }
            }
            Action::Confirm => self.confirm(),
            Action::Cancel => {
                self.row.blur(Instant::now());
                self.outcome = Some(EditorOutcome::Cancelled);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<bool> {
        if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return Ok(false);
        }
        match (self.active_field, self.input_kind()) {
            (EditorField::Value, InputKind::MultiSelect) => {
                if key.code == KeyCode::Char(' ') {
                    self.toggle_option_at_cursor();
                    return Ok(true);
                }
                Ok(false)
            }
            (EditorField::Value, InputKind::None) => Ok(false),
            (EditorField::Value | EditorField::Value2, _) => Ok(self.edit_text(key)),
            _ => Ok(false),
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Edit condition ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(self.theme.focused_border_style());
        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(self.lines()).block(block);
        frame.render_widget(paragraph, area);
    }

    fn supported_actions(&self) -> &[Action] {
        &EDITOR_ACTIONS
    }

    fn name(&self) -> &str {
        "condition_editor"
    }

    fn update(&mut self) -> Result<()> {
        if self.row.tick(Instant::now()) && self.cursor >= self.list_len().max(1) {
            self.cursor = 0;
        }
        Ok(())
    }
}
