//! Filter tree pane
//!
//! Shows the nested AND/OR tree as an indented list, drives the `FilterBuilder`
//! operations from bound actions and hosts the condition editor popup.

use std::path::PathBuf;
use std::sync::Arc;

use arboard::Clipboard;
use color_eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::{
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};
use tracing::{error, info};

use crate::config::{Config, Mode};
use crate::core::condition::FilterCondition;
use crate::core::group::{FilterGroup, FilterNode};
use crate::core::types::{Logic, MoveDirection, NodeId};
use crate::editor::FilterBuilder;
use crate::services::SuggestionSource;
use crate::tui::components::condition_editor::{ConditionEditor, EditorOutcome};
use crate::tui::components::layout::{centered_rect, split_dialog_area};
use crate::tui::{Action, Component, Theme};

/// One visible line of the flattened tree
#[derive(Debug, Clone, PartialEq)]
pub enum TreeRow {
    Group {
        id: NodeId,
        logic: Logic,
        depth: usize,
        /// Logic of the enclosing group when this is not its first child
        joiner: Option<Logic>,
    },
    Condition {
        id: NodeId,
        parent: NodeId,
        depth: usize,
        joiner: Option<Logic>,
    },
}

impl TreeRow {
    pub fn id(&self) -> &NodeId {
        match self {
            TreeRow::Group { id, .. } | TreeRow::Condition { id, .. } => id,
        }
    }
}

/// Flatten the tree depth-first; the root is row 0 at depth 0
pub fn flatten(root: &FilterGroup) -> Vec<TreeRow> {
    let mut rows = vec![TreeRow::Group {
        id: root.id.clone(),
        logic: root.logic,
        depth: 0,
        joiner: None,
    }];
    push_children(root, 1, &mut rows);
    rows
}

fn push_children(group: &FilterGroup, depth: usize, rows: &mut Vec<TreeRow>) {
    for (i, node) in group.conditions.iter().enumerate() {
        let joiner = (i > 0).then_some(group.logic);
        match node {
            FilterNode::Condition(c) => rows.push(TreeRow::Condition {
                id: c.id.clone(),
                parent: group.id.clone(),
                depth,
                joiner,
            }),
            FilterNode::Group(g) => {
                rows.push(TreeRow::Group {
                    id: g.id.clone(),
                    logic: g.logic,
                    depth,
                    joiner,
                });
                push_children(g, depth + 1, rows);
            }
        }
    }
}

const TREE_ACTIONS: [Action; 15] = [
    Action::AddCondition,
    Action::AddGroup,
    Action::EditCondition,
    Action::DeleteNode,
    Action::DuplicateCondition,
    Action::MoveConditionUp,
    Action::MoveConditionDown,
    Action::ToggleLogic,
    Action::NestCondition,
    Action::ClearAll,
    Action::Copy,
    Action::Save,
    Action::Apply,
    Action::MoveUp,
    Action::MoveDown,
];

pub struct FilterBuilderDialog {
    builder: FilterBuilder,
    config: Config,
    theme: Theme,
    selected: usize,
    editor: Option<ConditionEditor>,
    source: Option<Arc<dyn SuggestionSource>>,
    save_path: Option<PathBuf>,
    status: Option<(String, bool)>,
    pub show_instructions: bool,
}

impl FilterBuilderDialog {
    pub fn new(builder: FilterBuilder, config: Config) -> Self {
        Self {
            builder,
            config,
            theme: Theme::default(),
            selected: 0,
            editor: None,
            source: None,
            save_path: None,
            status: None,
            show_instructions: true,
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_suggestion_source(mut self, source: Arc<dyn SuggestionSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_save_path(mut self, path: PathBuf) -> Self {
        self.save_path = Some(path);
        self
    }

    pub fn builder(&self) -> &FilterBuilder {
        &self.builder
    }

    pub fn into_builder(self) -> FilterBuilder {
        self.builder
    }

    pub fn is_editing(&self) -> bool {
        self.editor.is_some()
    }

    /// Keybinding mode for the pane currently on top
    pub fn mode(&self) -> Mode {
        if self.is_editing() {
            Mode::ConditionEditor
        } else {
            Mode::FilterBuilder
        }
    }

    pub fn rows(&self) -> Vec<TreeRow> {
        flatten(self.builder.root())
    }

    pub fn selected_row(&self) -> Option<TreeRow> {
        self.rows().get(self.selected).cloned()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_ref().map(|(msg, _)| msg.as_str())
    }

    fn set_status(&mut self, message: impl Into<String>, is_error: bool) {
        self.status = Some((message.into(), is_error));
    }

    fn select_id(&mut self, id: &NodeId) {
        if let Some(pos) = self.rows().iter().position(|r| r.id() == id) {
            self.selected = pos;
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.rows().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    /// Group that new conditions go into for the current selection
    fn target_group(&self) -> NodeId {
        match self.selected_row() {
            Some(TreeRow::Group { id, .. }) => id,
            Some(TreeRow::Condition { parent, .. }) => parent,
            None => self.builder.root().id.clone(),
        }
    }

    fn selected_condition(&self) -> Option<FilterCondition> {
        match self.selected_row()? {
            TreeRow::Condition { id, .. } => self.builder.root().find_condition(&id).cloned(),
            TreeRow::Group { .. } => None,
        }
    }

    fn add_condition(&mut self) {
        if self.builder.columns().is_empty() {
            self.set_status("No fields available to filter on", true);
            return;
        }
        let target = self.target_group();
        if target == self.builder.root().id {
            self.builder.add_condition();
        } else {
            self.builder.add_condition_to(&target);
        }
        let new_id = self
            .builder
            .root()
            .find_group(&target)
            .and_then(|g| g.conditions.last())
            .map(|n| n.id().clone());
        if let Some(id) = new_id {
            self.select_id(&id);
        }
    }

    fn add_group(&mut self) {
        if !self.builder.options().show_grouping {
            self.set_status("Grouping is disabled", true);
            return;
        }
        if let Some(id) = self.builder.add_group() {
            // an empty group matches everything, seed it with one condition
            self.builder.add_condition_to(&id);
            self.select_id(&id);
        }
    }

    fn delete_selected(&mut self) {
        match self.selected_row() {
            Some(TreeRow::Condition { id, .. }) => self.builder.remove_condition(&id),
            Some(TreeRow::Group { id, depth, .. }) if depth > 0 => self.builder.remove_group(&id),
            _ => return,
        }
        self.clamp_selection();
    }

    fn toggle_logic(&mut self) {
        let group_id = self.target_group();
        let Some(current) = self.builder.root().find_group(&group_id).map(|g| g.logic) else {
            return;
        };
        if group_id == self.builder.root().id {
            self.builder.change_root_logic(current.toggled());
        } else {
            self.builder.change_group_logic(&group_id, current.toggled());
        }
    }

    fn move_selected(&mut self, direction: MoveDirection) {
        if let Some(TreeRow::Condition { id, .. }) = self.selected_row() {
            self.builder.move_condition(&id, direction);
            self.select_id(&id);
        }
    }

    fn open_editor(&mut self) {
        let Some(condition) = self.selected_condition() else {
            return;
        };
        let editor = ConditionEditor::new(
            condition,
            self.builder.columns().to_vec(),
            self.source.clone(),
            self.config.suggestions.settings(),
            self.config.suggestions.close_delay(),
        )
        .with_theme(self.theme.clone());
        self.editor = Some(editor);
    }

    fn finish_editing(&mut self) {
        let outcome = self.editor.as_mut().and_then(ConditionEditor::take_outcome);
        match outcome {
            Some(EditorOutcome::Saved(condition)) => {
                let id = condition.id.clone();
                self.builder.update_condition(&id, condition);
                self.editor = None;
            }
            Some(EditorOutcome::Cancelled) => self.editor = None,
            None => {}
        }
    }

    fn copy_query_string(&mut self) {
        let query = self.builder.query_string();
        match Clipboard::new().and_then(|mut c| c.set_text(query.clone())) {
            Ok(()) => self.set_status(format!("Copied: {query}"), false),
            Err(e) => {
                error!("Clipboard unavailable: {e}");
                self.set_status(format!("Clipboard unavailable: {e}"), true);
            }
        }
    }

    fn save(&mut self) {
        let Some(path) = self.save_path.clone() else {
            self.set_status("No output file configured (use --output)", true);
            return;
        };
        match self.builder.root().save_to_file(&path) {
            Ok(()) => {
                info!("Saved filter to {}", path.display());
                self.set_status(format!("Saved to {}", path.display()), false);
            }
            Err(e) => self.set_status(format!("Save failed: {e}"), true),
        }
    }

    fn instructions(&self) -> String {
        let actions: Vec<(Mode, Action)> = match &self.editor {
            Some(editor) => editor
                .supported_actions()
                .iter()
                .map(|a| (Mode::ConditionEditor, *a))
                .collect(),
            None => TREE_ACTIONS
                .iter()
                .filter(|a| !matches!(a, Action::MoveUp | Action::MoveDown))
                .map(|a| (Mode::FilterBuilder, *a))
                .chain([(Mode::FilterBuilder, Action::Quit)])
                .collect(),
        };
        self.config.actions_to_instructions(&actions)
    }

    fn row_line(&self, row: &TreeRow, selected: bool) -> Line<'static> {
        let columns = self.builder.columns();
        let (depth, joiner) = match row {
            TreeRow::Group { depth, joiner, .. } | TreeRow::Condition { depth, joiner, .. } => {
                (*depth, *joiner)
            }
        };
        let mut spans = Vec::new();
        for level in 1..depth {
            spans.push(Span::styled("│ ", self.theme.group_border_style(level)));
        }
        if depth > 0 {
            let keyword = joiner.map(|l| l.keyword()).unwrap_or("");
            let style = joiner
                .map(|l| self.theme.logic_style(l))
                .unwrap_or_default();
            spans.push(Span::styled(format!("{keyword:>4} "), style));
        }
        let body = match row {
            TreeRow::Group { id, logic, depth, .. } => {
                let count = self
                    .builder
                    .root()
                    .find_group(id)
                    .map(FilterGroup::active_filter_count)
                    .unwrap_or(0);
                let label = if *depth == 0 {
                    format!("Match {} of ({count})", if *logic == Logic::And { "ALL" } else { "ANY" })
                } else {
                    format!("Group [{}] ({count})", logic.keyword())
                };
                Span::styled(label, self.theme.group_border_style(*depth).add_modifier(Modifier::BOLD))
            }
            TreeRow::Condition { id, .. } => {
                let summary = self
                    .builder
                    .root()
                    .find_condition(id)
                    .map(|c| c.summary(columns))
                    .unwrap_or_default();
                Span::styled(summary, self.theme.normal_style())
            }
        };
        spans.push(body);
        let line = Line::from(spans);
        if selected {
            line.style(self.theme.selected_style())
        } else {
            line
        }
    }

    fn title(&self) -> String {
        if self.builder.options().show_label {
            format!(" Filters ({}) ", self.builder.active_filter_count())
        } else {
            " Filters ".to_string()
        }
    }
}

impl Component for FilterBuilderDialog {
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        if let Some(editor) = self.editor.as_mut() {
            let handled = editor.handle_action(action)?;
            self.finish_editing();
            return Ok(handled);
        }

        let rows = self.rows().len();
        match action {
            Action::MoveUp => self.selected = self.selected.saturating_sub(1),
            Action::MoveDown => self.selected = (self.selected + 1).min(rows.saturating_sub(1)),
            Action::AddCondition => self.add_condition(),
            Action::AddGroup => self.add_group(),
            Action::DeleteNode => self.delete_selected(),
            Action::DuplicateCondition => {
                if let Some(condition) = self.selected_condition() {
                    self.builder.duplicate_condition(&condition);
                }
            }
            Action::MoveConditionUp => self.move_selected(MoveDirection::Up),
            Action::MoveConditionDown => self.move_selected(MoveDirection::Down),
            Action::ToggleLogic => self.toggle_logic(),
            Action::NestCondition => {
                if let Some(TreeRow::Condition { id, .. }) = self.selected_row() {
                    self.builder.wrap_in_group(&id);
                    self.select_id(&id);
                }
            }
            Action::EditCondition | Action::Confirm => self.open_editor(),
            Action::ClearAll => {
                self.builder.clear_all();
                self.selected = 0;
            }
            Action::Copy => self.copy_query_string(),
            Action::Save => self.save(),
            Action::Apply => self.builder.apply(),
            Action::ToggleInstructions => self.show_instructions = !self.show_instructions,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<bool> {
        match self.editor.as_mut() {
            Some(editor) => editor.handle_key_event(key),
            None => Ok(false),
        }
    }

    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let instructions = self.instructions();
        let layout = split_dialog_area(area, self.show_instructions, &instructions);

        let block = Block::default()
            .title(self.title())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.is_editing() {
                self.theme.border_style()
            } else {
                self.theme.focused_border_style()
            });

        let rows = self.rows();
        let mut lines: Vec<Line> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| self.row_line(row, i == self.selected))
            .collect();
        if self.builder.root().is_empty() {
            lines.push(Line::from(Span::styled(
                format!("  {}", self.builder.options().placeholder),
                self.theme.muted_style(),
            )));
        }
        lines.push(Line::default());
        lines.push(Line::from(vec![
            Span::styled("Query: ", self.theme.muted_style()),
            Span::raw(self.builder.query_string()),
        ]));
        if let Some((message, is_error)) = &self.status {
            let style = if *is_error {
                self.theme.error_style()
            } else {
                self.theme.success_style()
            };
            lines.push(Line::from(Span::styled(message.clone(), style)));
        }

        frame.render_widget(Paragraph::new(lines).block(block), layout.content_area);

        if let Some(footer) = layout.instructions_area {
            let hints = Paragraph::new(instructions)
                .style(self.theme.muted_style())
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).border_style(self.theme.border_style()));
            frame.render_widget(hints, footer);
        }

        if let Some(editor) = self.editor.as_mut() {
            let popup = centered_rect(70, 40, 8, layout.content_area);
            editor.render(frame, popup);
        }
    }

    fn supported_actions(&self) -> &[Action] {
        match &self.editor {
            Some(editor) => editor.supported_actions(),
            None => &TREE_ACTIONS,
        }
    }

    fn name(&self) -> &str {
        "filter_builder"
    }

    fn update(&mut self) -> Result<()> {
        if let Some(editor) = self.editor.as_mut() {
            editor.update()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::column::Column;
    use crate::core::types::ColumnType;
    use crate::editor::BuilderOptions;
    use crossterm::event::{KeyCode, KeyModifiers};
    use pretty_assertions::assert_eq;
    use ratatui::{backend::TestBackend, Terminal};

    fn dialog() -> FilterBuilderDialog {
        let columns = vec![
            Column::new("username", "Username", ColumnType::Text),
            Column::new("balance", "Balance", ColumnType::Number),
        ];
        let builder = FilterBuilder::new(columns, None, BuilderOptions::default());
        FilterBuilderDialog::new(builder, Config::defaults().unwrap())
    }

    #[test]
    fn test_add_condition_and_group() {
        let mut d = dialog();
        d.handle_action(Action::AddCondition).unwrap();
        d.handle_action(Action::AddGroup).unwrap();
        assert_eq!(d.builder().active_filter_count(), 2);
        assert!(matches!(d.selected_row(), Some(TreeRow::Group { depth: 1, .. })));

        // adds into the selected group
        d.handle_action(Action::AddCondition).unwrap();
        let rows = d.rows();
        assert_eq!(rows.len(), 5);
        assert!(matches!(rows[4], TreeRow::Condition { depth: 2, joiner: Some(Logic::And), .. }));
        assert_eq!(d.selected, 4);
    }

    #[test]
    fn test_toggle_logic_on_condition_targets_parent_group() {
        let mut d = dialog();
        d.handle_action(Action::AddCondition).unwrap();
        d.handle_action(Action::ToggleLogic).unwrap();
        assert_eq!(d.builder().root().logic, Logic::Or);
    }

    #[test]
    fn test_delete_prunes_and_clamps_selection() {
        let mut d = dialog();
        d.handle_action(Action::AddGroup).unwrap();
        d.handle_action(Action::MoveDown).unwrap();
        assert!(matches!(d.selected_row(), Some(TreeRow::Condition { .. })));
        d.handle_action(Action::DeleteNode).unwrap();
        assert!(d.builder().root().is_empty());
        assert_eq!(d.selected, 0);

        // the root itself cannot be removed
        d.handle_action(Action::DeleteNode).unwrap();
        assert_eq!(d.rows().len(), 1);
    }

    #[test]
    fn test_nest_and_move() {
        let mut d = dialog();
        d.handle_action(Action::AddCondition).unwrap();
        d.handle_action(Action::AddCondition).unwrap();
        let second = d.selected_row().unwrap().id().clone();
        d.handle_action(Action::MoveConditionUp).unwrap();
        assert_eq!(d.rows()[1].id(), &second);
        assert_eq!(d.selected, 1);

        d.handle_action(Action::NestCondition).unwrap();
        assert_eq!(d.builder().root().depth(), 2);
        assert!(matches!(d.selected_row(), Some(TreeRow::Condition { depth: 2, .. })));
    }

    #[test]
    fn test_editor_round_trip_updates_tree() {
        let mut d = dialog();
        d.handle_action(Action::AddCondition).unwrap();
        d.handle_action(Action::EditCondition).unwrap();
        assert_eq!(d.mode(), Mode::ConditionEditor);

        d.handle_action(Action::NextField).unwrap();
        d.handle_action(Action::NextField).unwrap();
        for c in "bob".chars() {
            let key = KeyEvent::new(KeyCode::Char(c), KeyModifiers::empty());
            assert!(d.handle_key_event(key).unwrap());
        }
        // no suggestions arrived yet, so Confirm saves right away
        d.handle_action(Action::Confirm).unwrap();
        assert!(!d.is_editing());
        assert_eq!(d.builder().query_string(), "username:equals:bob");
    }

    #[test]
    fn test_cancelled_edit_leaves_tree_alone() {
        let mut d = dialog();
        d.handle_action(Action::AddCondition).unwrap();
        let before = d.builder().root().clone();
        d.handle_action(Action::EditCondition).unwrap();
        d.handle_action(Action::MoveDown).unwrap();
        d.handle_action(Action::Cancel).unwrap();
        assert!(!d.is_editing());
        assert_eq!(d.builder().root(), &before);
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("filter.json");
        let mut d = dialog().with_save_path(path.clone());
        d.handle_action(Action::AddCondition).unwrap();
        d.handle_action(Action::Save).unwrap();
        let restored = FilterGroup::load_from_file(&path).unwrap();
        assert_eq!(&restored, d.builder().root());
        assert!(d.status().unwrap().starts_with("Saved to"));
    }

    #[test]
    fn test_apply_closes_builder() {
        let mut d = dialog();
        let mut builder = d.into_builder();
        builder.open();
        d = FilterBuilderDialog::new(builder, Config::defaults().unwrap());
        d.handle_action(Action::Apply).unwrap();
        assert!(!d.builder().is_open());
    }

    #[test]
    fn test_render_tree() {
        let mut d = dialog();
        d.handle_action(Action::AddCondition).unwrap();
        d.handle_action(Action::AddGroup).unwrap();
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal
            .draw(|f| {
                let area = f.area();
                d.render(f, area);
            })
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Filters (2)"));
        assert!(text.contains("Match ALL of (2)"));
        assert!(text.contains("Group [AND] (1)"));
        assert!(text.contains("Add condition"));
    }
}
