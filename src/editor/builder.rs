//! Tree editor that owns the current filter value
//!
//! Every operation rebuilds the tree through the pure group algebra, swaps it in
//! and reports the new value through `on_change`. `set_value` is the host sync
//! path and stays silent.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::core::column::Column;
use crate::core::condition::FilterCondition;
use crate::core::group::FilterGroup;
use crate::core::query_string::filters_to_query_string;
use crate::core::types::{Logic, MoveDirection, NodeId};

pub type FilterCallback = Box<dyn FnMut(&FilterGroup) + Send>;

/// Presentation hints supplied by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderOptions {
    /// Advisory nesting limit; deeper trees are accepted and logged
    pub max_depth: usize,
    pub show_grouping: bool,
    pub placeholder: String,
    pub show_label: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            max_depth: 3,
            show_grouping: true,
            placeholder: "Add filter".to_string(),
            show_label: true,
        }
    }
}

pub struct FilterBuilder {
    columns: Vec<Column>,
    root: FilterGroup,
    options: BuilderOptions,
    on_change: Option<FilterCallback>,
    on_apply: Option<FilterCallback>,
    open: bool,
}

impl fmt::Debug for FilterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterBuilder")
            .field("columns", &self.columns.len())
            .field("root", &self.root)
            .field("options", &self.options)
            .field("open", &self.open)
            .finish()
    }
}

impl FilterBuilder {
    pub fn new(columns: Vec<Column>, value: Option<FilterGroup>, options: BuilderOptions) -> Self {
        let mut builder = Self {
            columns,
            root: FilterGroup::root(),
            options,
            on_change: None,
            on_apply: None,
            open: false,
        };
        if let Some(value) = value {
            builder.set_value(value);
        }
        builder
    }

    pub fn with_on_change(mut self, callback: impl FnMut(&FilterGroup) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn with_on_apply(mut self, callback: impl FnMut(&FilterGroup) + Send + 'static) -> Self {
        self.on_apply = Some(Box::new(callback));
        self
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn root(&self) -> &FilterGroup {
        &self.root
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Badge count: number of condition leaves
    pub fn active_filter_count(&self) -> usize {
        self.root.active_filter_count()
    }

    pub fn query_string(&self) -> String {
        filters_to_query_string(&self.root)
    }

    /// Replace the tree from the host without emitting `on_change`
    pub fn set_value(&mut self, value: FilterGroup) {
        let depth = value.depth();
        if depth > self.options.max_depth {
            warn!(
                "Filter tree depth {} exceeds the configured max_depth {}",
                depth, self.options.max_depth
            );
        }
        self.root = value;
    }

    /// Replace the column schema without emitting `on_change`
    ///
    /// Conditions on keys the new schema lacks stay in the tree and fall back to
    /// text operators.
    pub fn set_columns(&mut self, columns: Vec<Column>) {
        let missing = self
            .root
            .leaves()
            .iter()
            .filter(|c| !columns.iter().any(|col| col.key == c.column))
            .count();
        if missing > 0 {
            debug!("{} conditions reference columns missing from the new schema", missing);
        }
        self.columns = columns;
    }

    fn commit(&mut self, next: FilterGroup) {
        if next == self.root {
            debug!("Filter edit produced no change");
        }
        self.root = next;
        if let Some(callback) = self.on_change.as_mut() {
            callback(&self.root);
        }
    }

    pub fn add_condition(&mut self) {
        let next = self.root.add_condition(&self.columns);
        self.commit(next);
    }

    pub fn add_condition_to(&mut self, group_id: &NodeId) {
        let next = self.root.add_condition_to(group_id, &self.columns);
        self.commit(next);
    }

    /// Append an empty group and return its id
    pub fn add_group(&mut self) -> Option<NodeId> {
        let next = self.root.add_group();
        let id = next.conditions.last().map(|n| n.id().clone());
        self.commit(next);
        id
    }

    pub fn update_condition(&mut self, id: &NodeId, condition: FilterCondition) {
        let next = self.root.update_condition(id, condition);
        self.commit(next);
    }

    pub fn remove_condition(&mut self, id: &NodeId) {
        let next = self.root.remove_condition(id);
        self.commit(next);
    }

    pub fn remove_group(&mut self, id: &NodeId) {
        let next = self.root.remove_group(id);
        self.commit(next);
    }

    pub fn duplicate_condition(&mut self, condition: &FilterCondition) {
        let next = self.root.duplicate_condition(condition);
        self.commit(next);
    }

    pub fn move_condition(&mut self, id: &NodeId, direction: MoveDirection) {
        let next = self.root.move_condition(id, direction);
        self.commit(next);
    }

    pub fn change_group_logic(&mut self, group_id: &NodeId, logic: Logic) {
        let next = self.root.change_group_logic(group_id, logic);
        self.commit(next);
    }

    pub fn change_root_logic(&mut self, logic: Logic) {
        let next = self.root.change_root_logic(logic);
        self.commit(next);
    }

    pub fn wrap_in_group(&mut self, condition_id: &NodeId) {
        let next = self.root.wrap_in_group(condition_id);
        if next.depth() > self.options.max_depth {
            warn!("Nesting beyond max_depth {}", self.options.max_depth);
        }
        self.commit(next);
    }

    pub fn clear_all(&mut self) {
        let next = self.root.cleared();
        self.commit(next);
    }

    /// Hand the current tree to `on_apply` and close the editor
    pub fn apply(&mut self) {
        info!(
            "Applying filter with {} active conditions",
            self.active_filter_count()
        );
        if let Some(callback) = self.on_apply.as_mut() {
            callback(&self.root);
        }
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::operator::Operator;
    use crate::core::types::ColumnType;
    use crate::core::value::FilterValue;
    use std::sync::{Arc, Mutex};

    fn columns() -> Vec<Column> {
        vec![
            Column::new("username", "Username", ColumnType::Text),
            Column::new("data_limit", "Data limit", ColumnType::Number),
        ]
    }

    fn recording_builder() -> (FilterBuilder, Arc<Mutex<Vec<FilterGroup>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let builder = FilterBuilder::new(columns(), None, BuilderOptions::default())
            .with_on_change(move |g| sink.lock().unwrap().push(g.clone()));
        (builder, seen)
    }

    #[test]
    fn every_edit_emits_new_tree() {
        let (mut builder, seen) = recording_builder();
        builder.add_condition();
        builder.add_condition();
        builder.change_root_logic(Logic::Or);
        let changes = seen.lock().unwrap();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[2].logic, Logic::Or);
        assert_eq!(changes[2].active_filter_count(), 2);
        assert_eq!(builder.active_filter_count(), 2);
    }

    #[test]
    fn set_value_is_silent() {
        let (mut builder, seen) = recording_builder();
        let host = FilterGroup::with_id(NodeId::from("widget-1"))
            .add_condition(&columns());
        builder.set_value(host.clone());
        assert_eq!(builder.root(), &host);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn clear_keeps_root_id_and_apply_closes() {
        let applied = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&applied);
        let mut builder = FilterBuilder::new(columns(), None, BuilderOptions::default())
            .with_on_apply(move |g| *sink.lock().unwrap() = Some(g.clone()));
        builder.open();
        builder.add_condition();
        builder.clear_all();
        assert_eq!(builder.root().id, NodeId::from("root"));
        assert_eq!(builder.active_filter_count(), 0);

        builder.apply();
        assert!(!builder.is_open());
        let applied = applied.lock().unwrap();
        assert_eq!(applied.as_ref().map(|g| g.id.clone()), Some(NodeId::from("root")));
    }

    #[test]
    fn group_workflow() {
        let (mut builder, _) = recording_builder();
        let group_id = builder.add_group().unwrap();
        builder.add_condition_to(&group_id);
        builder.change_group_logic(&group_id, Logic::Or);
        let leaf = builder.root().leaves()[0].clone();
        let edited = leaf
            .with_operator(Operator::Contains)
            .with_value(Some(FilterValue::from("ali")));
        builder.update_condition(&leaf.id, edited);
        assert_eq!(builder.query_string(), "(username:contains:ali)");

        builder.remove_condition(&leaf.id);
        assert!(builder.root().is_empty());
    }

    #[test]
    fn set_columns_is_silent_and_feeds_new_conditions() {
        let (mut builder, seen) = recording_builder();
        builder.set_columns(vec![Column::new("balance", "Balance", ColumnType::Number)]);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(builder.columns()[0].key, "balance");

        builder.add_condition();
        assert_eq!(builder.query_string(), "balance:equals:");
    }

    #[test]
    fn deep_host_values_are_accepted() {
        let options = BuilderOptions {
            max_depth: 1,
            ..BuilderOptions::default()
        };
        let deep = FilterGroup::root().with_node(FilterGroup::new(Logic::Or).add_condition(&columns()));
        let builder = FilterBuilder::new(columns(), Some(deep.clone()), options);
        assert_eq!(builder.root(), &deep);
    }
}
