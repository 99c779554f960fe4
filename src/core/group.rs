//! Recursive filter tree and its mutation algebra
//!
//! Mutations never touch `self`: each one clones the tree, edits the clone and
//! returns it, so the owner can swap the whole value atomically and hand it to
//! the host.

use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::debug;

use super::column::Column;
use super::condition::FilterCondition;
use super::types::{Logic, MoveDirection, NodeId};

/// Element of a group: a leaf condition or a nested group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "json_schema", derive(schemars::JsonSchema))]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FilterNode {
    Condition(FilterCondition),
    Group(FilterGroup),
}

impl FilterNode {
    pub fn id(&self) -> &NodeId {
        match self {
            FilterNode::Condition(c) => &c.id,
            FilterNode::Group(g) => &g.id,
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            FilterNode::Condition(_) => 1,
            FilterNode::Group(g) => g.active_filter_count(),
        }
    }
}

impl From<FilterCondition> for FilterNode {
    fn from(c: FilterCondition) -> Self {
        FilterNode::Condition(c)
    }
}

impl From<FilterGroup> for FilterNode {
    fn from(g: FilterGroup) -> Self {
        FilterNode::Group(g)
    }
}

/// AND/OR combination of conditions and nested groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "json_schema", derive(schemars::JsonSchema))]
pub struct FilterGroup {
    pub id: NodeId,
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub conditions: Vec<FilterNode>,
}

impl Default for FilterGroup {
    fn default() -> Self {
        Self::root()
    }
}

impl FilterGroup {
    /// Empty group with a fresh id
    pub fn new(logic: Logic) -> Self {
        Self {
            id: NodeId::new(),
            logic,
            conditions: Vec::new(),
        }
    }

    /// Empty root group (`id: "root"`, `logic: and`)
    pub fn root() -> Self {
        Self::with_id(NodeId::from_raw("root"))
    }

    pub fn with_id(id: NodeId) -> Self {
        Self {
            id,
            logic: Logic::And,
            conditions: Vec::new(),
        }
    }

    pub fn with_logic(mut self, logic: Logic) -> Self {
        self.logic = logic;
        self
    }

    pub fn with_node(mut self, node: impl Into<FilterNode>) -> Self {
        self.conditions.push(node.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Number of condition leaves in the tree (the "active filters" badge)
    pub fn active_filter_count(&self) -> usize {
        self.conditions.iter().map(FilterNode::leaf_count).sum()
    }

    /// Nesting depth; a group holding only conditions has depth 1
    pub fn depth(&self) -> usize {
        1 + self
            .conditions
            .iter()
            .map(|n| match n {
                FilterNode::Group(g) => g.depth(),
                FilterNode::Condition(_) => 0,
            })
            .max()
            .unwrap_or(0)
    }

    /// All condition leaves in document order
    pub fn leaves(&self) -> Vec<&FilterCondition> {
        let mut out = Vec::new();
        collect_leaves(&self.conditions, &mut out);
        out
    }

    pub fn find_condition(&self, id: &NodeId) -> Option<&FilterCondition> {
        self.leaves().into_iter().find(|c| &c.id == id)
    }

    pub fn find_group(&self, id: &NodeId) -> Option<&FilterGroup> {
        if &self.id == id {
            return Some(self);
        }
        self.conditions.iter().find_map(|n| match n {
            FilterNode::Group(g) => g.find_group(id),
            FilterNode::Condition(_) => None,
        })
    }

    /// Append a default condition (first column, its default operator) to the root
    pub fn add_condition(&self, columns: &[Column]) -> Self {
        let Some(first) = columns.first() else {
            debug!("add_condition ignored: no columns available");
            return self.clone();
        };
        let mut next = self.clone();
        next.conditions.push(FilterCondition::new(first).into());
        next
    }

    /// Append a default condition inside the nested group `group_id`
    pub fn add_condition_to(&self, group_id: &NodeId, columns: &[Column]) -> Self {
        let Some(first) = columns.first() else {
            return self.clone();
        };
        let mut next = self.clone();
        if let Some(group) = find_group_mut(&mut next, group_id) {
            group.conditions.push(FilterCondition::new(first).into());
        }
        next
    }

    /// Append an empty AND group to the root
    pub fn add_group(&self) -> Self {
        let mut next = self.clone();
        next.conditions.push(FilterGroup::new(Logic::And).into());
        next
    }

    /// Replace the condition with the same id, wherever it lives
    pub fn update_condition(&self, id: &NodeId, condition: FilterCondition) -> Self {
        let mut next = self.clone();
        let condition = condition.normalized();
        if let Some(slot) = find_condition_mut(&mut next.conditions, id) {
            *slot = condition;
        }
        next
    }

    /// Remove a condition and prune every nested group left empty
    pub fn remove_condition(&self, id: &NodeId) -> Self {
        let mut next = self.clone();
        next.conditions = remove_and_prune(&self.conditions, &|n| {
            matches!(n, FilterNode::Condition(c) if &c.id == id)
        });
        next
    }

    /// Remove a nested group with its whole subtree
    pub fn remove_group(&self, id: &NodeId) -> Self {
        let mut next = self.clone();
        next.conditions = remove_and_prune(&self.conditions, &|n| {
            matches!(n, FilterNode::Group(g) if &g.id == id)
        });
        next
    }

    /// Append a copy (fresh id) of `condition` to the root
    pub fn duplicate_condition(&self, condition: &FilterCondition) -> Self {
        let mut next = self.clone();
        next.conditions.push(condition.duplicated().into());
        next
    }

    /// Swap a condition with its neighbour inside its direct group
    pub fn move_condition(&self, id: &NodeId, direction: MoveDirection) -> Self {
        let mut next = self.clone();
        move_within(&mut next.conditions, id, direction);
        next
    }

    pub fn change_group_logic(&self, group_id: &NodeId, logic: Logic) -> Self {
        let mut next = self.clone();
        if let Some(group) = find_group_mut(&mut next, group_id) {
            group.logic = logic;
        }
        next
    }

    pub fn change_root_logic(&self, logic: Logic) -> Self {
        Self {
            logic,
            ..self.clone()
        }
    }

    /// Replace a condition by a one-child AND group holding it
    pub fn wrap_in_group(&self, condition_id: &NodeId) -> Self {
        let mut next = self.clone();
        wrap_within(&mut next.conditions, condition_id);
        next
    }

    /// Drop every condition, keeping the root id
    pub fn cleared(&self) -> Self {
        Self {
            id: self.id.clone(),
            logic: self.logic,
            conditions: Vec::new(),
        }
    }

    /// Save the filter tree to a file as JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load a filter tree from a JSON or YAML file (by extension)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        let group = if is_yaml {
            serde_yaml::from_reader(file)?
        } else {
            serde_json::from_reader(file)?
        };
        Ok(group)
    }
}

fn collect_leaves<'a>(nodes: &'a [FilterNode], out: &mut Vec<&'a FilterCondition>) {
    for node in nodes {
        match node {
            FilterNode::Condition(c) => out.push(c),
            FilterNode::Group(g) => collect_leaves(&g.conditions, out),
        }
    }
}

fn find_group_mut<'a>(group: &'a mut FilterGroup, id: &NodeId) -> Option<&'a mut FilterGroup> {
    if &group.id == id {
        return Some(group);
    }
    group.conditions.iter_mut().find_map(|n| match n {
        FilterNode::Group(g) => find_group_mut(g, id),
        FilterNode::Condition(_) => None,
    })
}

fn find_condition_mut<'a>(
    nodes: &'a mut [FilterNode],
    id: &NodeId,
) -> Option<&'a mut FilterCondition> {
    nodes.iter_mut().find_map(|n| match n {
        FilterNode::Condition(c) if &c.id == id => Some(c),
        FilterNode::Condition(_) => None,
        FilterNode::Group(g) => find_condition_mut(&mut g.conditions, id),
    })
}

// Post-order: children are pruned before the emptiness of their parent is checked.
fn remove_and_prune(nodes: &[FilterNode], doomed: &dyn Fn(&FilterNode) -> bool) -> Vec<FilterNode> {
    nodes
        .iter()
        .filter(|n| !doomed(n))
        .filter_map(|n| match n {
            FilterNode::Condition(_) => Some(n.clone()),
            FilterNode::Group(g) => {
                let children = remove_and_prune(&g.conditions, doomed);
                if children.is_empty() {
                    None
                } else {
                    Some(FilterNode::Group(FilterGroup {
                        id: g.id.clone(),
                        logic: g.logic,
                        conditions: children,
                    }))
                }
            }
        })
        .collect()
}

fn move_within(nodes: &mut [FilterNode], id: &NodeId, direction: MoveDirection) -> bool {
    let position = nodes
        .iter()
        .position(|n| matches!(n, FilterNode::Condition(c) if &c.id == id));
    if let Some(idx) = position {
        let target = match direction {
            MoveDirection::Up => idx.checked_sub(1),
            MoveDirection::Down => Some(idx + 1).filter(|t| *t < nodes.len()),
        };
        if let Some(target) = target {
            nodes.swap(idx, target);
        }
        return true;
    }
    nodes.iter_mut().any(|n| match n {
        FilterNode::Group(g) => move_within(&mut g.conditions, id, direction),
        FilterNode::Condition(_) => false,
    })
}

fn wrap_within(nodes: &mut [FilterNode], id: &NodeId) -> bool {
    for node in nodes.iter_mut() {
        match node {
            FilterNode::Condition(c) if &c.id == id => {
                let wrapped = FilterGroup::new(Logic::And).with_node(c.clone());
                *node = FilterNode::Group(wrapped);
                return true;
            }
            FilterNode::Group(g) => {
                if wrap_within(&mut g.conditions, id) {
                    return true;
                }
            }
            FilterNode::Condition(_) => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::operator::Operator;
    use crate::core::types::ColumnType;
    use crate::core::value::FilterValue;
    use pretty_assertions::assert_eq;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("name", "Name", ColumnType::Text),
            Column::new("age", "Age", ColumnType::Number),
        ]
    }

    fn cond(column: &str, value: &str) -> FilterCondition {
        FilterCondition::with_parts(column, Operator::Equals, Some(value.into()), None)
    }

    fn ids(group: &FilterGroup) -> Vec<NodeId> {
        group.conditions.iter().map(|n| n.id().clone()).collect()
    }

    #[test]
    fn add_condition_lands_at_root_with_defaults() {
        let cols = columns();
        let g = FilterGroup::root().add_condition(&cols).add_condition(&cols);
        assert_eq!(g.id, NodeId::from("root"));
        assert_eq!(g.active_filter_count(), 2);
        for leaf in g.leaves() {
            assert_eq!(leaf.column, "name");
            assert_eq!(leaf.operator, Operator::Equals);
            assert_eq!(leaf.value, None);
        }
        assert_ne!(g.leaves()[0].id, g.leaves()[1].id);
    }

    #[test]
    fn add_condition_without_columns_is_noop() {
        let g = FilterGroup::root().add_condition(&[]);
        assert!(g.is_empty());
    }

    #[test]
    fn update_reaches_nested_conditions() {
        let inner = cond("name", "bob");
        let inner_id = inner.id.clone();
        let g = FilterGroup::root().with_node(FilterGroup::new(Logic::Or).with_node(inner));

        let replacement = FilterCondition {
            id: inner_id.clone(),
            ..cond("age", "")
        }
        .with_operator(Operator::GreaterThan)
        .with_value(Some(FilterValue::Number(18.0)));
        let updated = g.update_condition(&inner_id, replacement);

        let leaf = updated.find_condition(&inner_id).unwrap();
        assert_eq!(leaf.column, "age");
        assert_eq!(leaf.value, Some(FilterValue::Number(18.0)));
        // the original value is untouched
        assert_eq!(g.find_condition(&inner_id).unwrap().column, "name");
    }

    #[test]
    fn update_normalizes_no_value_operators() {
        let c = cond("name", "bob");
        let id = c.id.clone();
        let g = FilterGroup::root().with_node(c.clone());
        let broken = FilterCondition {
            operator: Operator::IsEmpty,
            ..c
        };
        let updated = g.update_condition(&id, broken);
        let leaf = updated.find_condition(&id).unwrap();
        assert_eq!(leaf.value, None);
        assert_eq!(leaf.value2, None);
    }

    #[test]
    fn removing_last_condition_prunes_nested_groups() {
        let deep = cond("name", "x");
        let deep_id = deep.id.clone();
        let sibling = cond("name", "y");
        let inner = FilterGroup::new(Logic::Or).with_node(deep);
        let outer = FilterGroup::new(Logic::And).with_node(inner);
        let g = FilterGroup::root().with_node(outer).with_node(sibling.clone());

        let pruned = g.remove_condition(&deep_id);
        assert_eq!(pruned.conditions, vec![FilterNode::Condition(sibling)]);
        assert_eq!(pruned.id, g.id);
    }

    #[test]
    fn removing_from_root_never_prunes_root() {
        let c = cond("name", "x");
        let id = c.id.clone();
        let g = FilterGroup::root().with_node(c);
        let removed = g.remove_condition(&id);
        assert!(removed.is_empty());
        assert_eq!(removed.id, NodeId::from("root"));
    }

    #[test]
    fn remove_group_drops_subtree() {
        let group = FilterGroup::new(Logic::Or)
            .with_node(cond("name", "a"))
            .with_node(cond("name", "b"));
        let group_id = group.id.clone();
        let keep = cond("age", "1");
        let g = FilterGroup::root().with_node(group).with_node(keep.clone());
        let removed = g.remove_group(&group_id);
        assert_eq!(removed.conditions, vec![FilterNode::Condition(keep)]);
    }

    #[test]
    fn duplicate_is_flattened_to_root() {
        let nested = cond("name", "bob");
        let g = FilterGroup::root().with_node(FilterGroup::new(Logic::Or).with_node(nested.clone()));
        let dup = g.duplicate_condition(&nested);
        assert_eq!(dup.conditions.len(), 2);
        match &dup.conditions[1] {
            FilterNode::Condition(c) => {
                assert_ne!(c.id, nested.id);
                assert_eq!(c.value, nested.value);
            }
            FilterNode::Group(_) => panic!("duplicate should be a root-level condition"),
        }
    }

    #[test]
    fn move_swaps_within_direct_group_and_stops_at_bounds() {
        let a = cond("name", "a");
        let b = cond("name", "b");
        let c = cond("name", "c");
        let g = FilterGroup::root()
            .with_node(a.clone())
            .with_node(b.clone())
            .with_node(c.clone());

        let moved = g.move_condition(&b.id, MoveDirection::Up);
        assert_eq!(ids(&moved), vec![b.id.clone(), a.id.clone(), c.id.clone()]);

        let top = moved.move_condition(&b.id, MoveDirection::Up);
        assert_eq!(top, moved);

        let bottom = g.move_condition(&c.id, MoveDirection::Down);
        assert_eq!(bottom, g);
    }

    #[test]
    fn move_inside_nested_group() {
        let a = cond("name", "a");
        let b = cond("name", "b");
        let inner = FilterGroup::new(Logic::Or).with_node(a.clone()).with_node(b.clone());
        let inner_id = inner.id.clone();
        let g = FilterGroup::root().with_node(cond("age", "1")).with_node(inner);

        let moved = g.move_condition(&a.id, MoveDirection::Down);
        let inner = moved.find_group(&inner_id).unwrap();
        assert_eq!(ids(inner), vec![b.id, a.id]);
        assert_eq!(moved.active_filter_count(), g.active_filter_count());
    }

    #[test]
    fn logic_changes() {
        let inner = FilterGroup::new(Logic::And).with_node(cond("name", "a"));
        let inner_id = inner.id.clone();
        let g = FilterGroup::root().with_node(inner);

        let changed = g.change_group_logic(&inner_id, Logic::Or);
        assert_eq!(changed.find_group(&inner_id).unwrap().logic, Logic::Or);
        assert_eq!(changed.logic, Logic::And);

        let root_or = g.change_root_logic(Logic::Or);
        assert_eq!(root_or.logic, Logic::Or);
        assert_eq!(root_or.id, g.id);
    }

    #[test]
    fn wrapping_keeps_leaf_count() {
        let a = cond("name", "a");
        let g = FilterGroup::root().with_node(a.clone()).with_node(cond("name", "b"));
        let wrapped = g.wrap_in_group(&a.id);
        assert_eq!(wrapped.active_filter_count(), 2);
        assert_eq!(wrapped.depth(), 2);
        match &wrapped.conditions[0] {
            FilterNode::Group(inner) => assert_eq!(inner.conditions, vec![FilterNode::Condition(a)]),
            FilterNode::Condition(_) => panic!("expected wrapper group"),
        }
    }

    #[test]
    fn add_condition_to_nested_group() {
        let cols = columns();
        let g = FilterGroup::root().add_group();
        let group_id = g.conditions[0].id().clone();
        let filled = g.add_condition_to(&group_id, &cols);
        assert_eq!(filled.find_group(&group_id).unwrap().conditions.len(), 1);
        assert_eq!(filled.active_filter_count(), 1);
    }

    #[test]
    fn clear_keeps_root_id() {
        let cols = columns();
        let g = FilterGroup::with_id(NodeId::from("widget-7")).add_condition(&cols);
        let cleared = g.cleared();
        assert!(cleared.is_empty());
        assert_eq!(cleared.id, NodeId::from("widget-7"));
    }

    #[test]
    fn json_nodes_carry_kind_tags() {
        let g = FilterGroup::root()
            .with_node(cond("name", "bob"))
            .with_node(FilterGroup::new(Logic::Or).with_node(cond("name", "x")));
        let json = serde_json::to_value(&g).unwrap();
        assert_eq!(json["conditions"][0]["kind"], "condition");
        assert_eq!(json["conditions"][1]["kind"], "group");
        assert_eq!(json["conditions"][1]["logic"], "or");

        let restored: FilterGroup = serde_json::from_value(json).unwrap();
        assert_eq!(restored, g);
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("filter.json");
        let g = FilterGroup::root().with_node(cond("name", "bob"));
        g.save_to_file(&path).unwrap();
        let loaded = FilterGroup::load_from_file(&path).unwrap();
        assert_eq!(loaded, g);
    }
}
