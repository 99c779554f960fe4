//! A dashboard editing session end to end: build a tree, preview it, send it

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use radfilter::core::{
    query_string_to_filters, Column, ColumnType, FilterCondition, FilterGroup, FilterNode, FilterValue, Logic,
    MoveDirection, NodeId, Operator,
};
use radfilter::editor::{BuilderOptions, FilterBuilder};
use radfilter::services::{radius_user_columns, AggregationType, ChartType, WidgetConfig};
use serde_json::json;

fn leaf_ids(group: &FilterGroup) -> Vec<NodeId> {
    group.leaves().iter().map(|c| c.id.clone()).collect()
}

fn edit(builder: &mut FilterBuilder, id: &NodeId, f: impl FnOnce(&FilterCondition) -> FilterCondition) {
    let current = builder.root().find_condition(id).unwrap().clone();
    builder.update_condition(id, f(&current));
}

fn rows() -> Vec<serde_json::Value> {
    vec![
        json!({"username": "alice", "status": "active", "balance": 12.5, "is_online": true,
               "expiration": "2024-07-01", "groups": ["vip"]}),
        json!({"username": "bob", "status": "expired", "balance": 0, "is_online": false,
               "expiration": "2024-01-10", "groups": []}),
        json!({"username": "carol", "status": "active", "balance": "3", "is_online": false,
               "expiration": "2024-03-20", "groups": ["staff", "vip"]}),
        json!({"username": "dave", "status": "suspended", "balance": -4, "is_online": true}),
    ]
}

fn build_session() -> (FilterBuilder, Arc<Mutex<Vec<String>>>, Arc<Mutex<Option<FilterGroup>>>) {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let applied = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&changes);
    let done = Arc::clone(&applied);

    let mut builder = FilterBuilder::new(radius_user_columns(), None, BuilderOptions::default())
        .with_on_change(move |g| {
            seen.lock()
                .unwrap()
                .push(radfilter::filters_to_query_string(g))
        })
        .with_on_apply(move |g| *done.lock().unwrap() = Some(g.clone()));
    builder.open();

    // status in (active) AND balance > 0
    builder.add_condition();
    builder.add_condition();
    let ids = leaf_ids(builder.root());
    let columns = radius_user_columns();
    edit(&mut builder, &ids[0], |c| {
        c.with_column(&columns, "status")
            .with_operator(Operator::In)
            .toggle_option("active")
    });
    edit(&mut builder, &ids[1], |c| {
        c.with_column(&columns, "balance")
            .with_operator(Operator::GreaterThan)
            .with_value_input(&columns, "0")
            .unwrap()
    });

    // AND (is_online OR groups contains vip)
    let group_id = builder.add_group().unwrap();
    builder.add_condition_to(&group_id);
    builder.add_condition_to(&group_id);
    builder.change_group_logic(&group_id, Logic::Or);
    let ids = leaf_ids(builder.root());
    edit(&mut builder, &ids[2], |c| {
        c.with_column(&columns, "is_online").with_operator(Operator::IsTrue)
    });
    edit(&mut builder, &ids[3], |c| {
        c.with_column(&columns, "groups")
            .with_operator(Operator::Contains)
            .with_value(Some("vip".into()))
    });
    (builder, changes, applied)
}

#[test]
fn test_session_builds_expected_query() {
    let (builder, changes, _) = build_session();
    assert_eq!(
        builder.query_string(),
        "status:in:active AND balance:greater_than:0 AND (is_online:is_true OR groups:contains:vip)"
    );
    assert_eq!(builder.active_filter_count(), 4);
    assert_eq!(builder.root().depth(), 2);

    let changes = changes.lock().unwrap();
    assert_eq!(changes.len(), 10);
    assert_eq!(changes.last().unwrap(), &builder.query_string());
}

#[test]
fn test_preview_matches_rows() {
    let (builder, _, _) = build_session();
    let columns = radius_user_columns();
    let now = NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let matching: Vec<String> = rows()
        .iter()
        .filter(|row| builder.root().matches(row, &columns, now))
        .map(|row| row["username"].as_str().unwrap().to_string())
        .collect();
    // bob is expired, dave is suspended; carol's balance is a numeric string
    assert_eq!(matching, vec!["alice", "carol"]);
}

#[test]
fn test_reorder_nest_and_prune() {
    let (mut builder, _, _) = build_session();
    let first = leaf_ids(builder.root())[0].clone();
    builder.move_condition(&first, MoveDirection::Down);
    assert!(builder.query_string().starts_with("balance:greater_than:0 AND status:in:active"));

    // moving past the end of its group does nothing
    let before = builder.root().clone();
    builder.move_condition(&first, MoveDirection::Down);
    builder.move_condition(&first, MoveDirection::Down);
    assert_ne!(builder.root(), &before);
    let after_second = builder.query_string();
    builder.move_condition(&first, MoveDirection::Down);
    assert_eq!(builder.query_string(), after_second);

    builder.wrap_in_group(&first);
    assert_eq!(builder.root().depth(), 2);
    builder.remove_condition(&first);
    // the wrapper group disappears with its only child
    assert!(builder.root().conditions.iter().all(|n| match n {
        FilterNode::Group(g) => !g.is_empty(),
        FilterNode::Condition(_) => true,
    }));
    assert_eq!(builder.active_filter_count(), 3);
}

#[test]
fn test_apply_hands_tree_to_widget() {
    let (mut builder, _, applied) = build_session();
    builder.apply();
    assert!(!builder.is_open());

    let filter = applied.lock().unwrap().clone().unwrap();
    let widget = WidgetConfig {
        title: "Balance by profile".to_string(),
        chart_type: ChartType::Bar,
        disaggregation_field: "profile".to_string(),
        aggregation_type: AggregationType::Sum,
        value_field: Some("balance".to_string()),
        filter_group: Some(filter.clone()),
    };
    let body = serde_json::to_value(widget.request()).unwrap();
    assert_eq!(body["aggregationType"], "sum");
    assert_eq!(body["valueField"], "balance");
    assert_eq!(body["filterGroup"]["conditions"][2]["kind"], "group");
    assert_eq!(body["filterGroup"]["conditions"][2]["logic"], "or");

    // the host can rebuild the same tree from the query string it shows
    let again = query_string_to_filters(&builder.query_string(), &radius_user_columns())
        .unwrap()
        .unwrap();
    assert_eq!(
        radfilter::filters_to_query_string(&again),
        radfilter::filters_to_query_string(&filter)
    );
    assert_eq!(
        again.leaves()[0].value,
        Some(FilterValue::from(vec!["active"]))
    );
}

#[test]
fn test_clear_all_keeps_root() {
    let (mut builder, changes, _) = build_session();
    let root_id = builder.root().id.clone();
    builder.clear_all();
    assert!(builder.root().is_empty());
    assert_eq!(builder.root().id, root_id);
    assert_eq!(changes.lock().unwrap().last().unwrap(), "");

    // host sync is silent
    let count = changes.lock().unwrap().len();
    builder.set_value(FilterGroup::root().with_node(FilterCondition::with_parts(
        "username",
        Operator::Equals,
        Some("alice".into()),
        None,
    )));
    assert_eq!(changes.lock().unwrap().len(), count);
    assert_eq!(builder.query_string(), "username:equals:alice");
}

#[test]
fn test_two_default_conditions_then_edit_second() {
    let columns = vec![
        Column::new("name", "Name", ColumnType::Text),
        Column::new("age", "Age", ColumnType::Number),
    ];
    let mut builder = FilterBuilder::new(columns.clone(), Some(FilterGroup::root()), BuilderOptions::default());
    assert_eq!(builder.root().id, NodeId::from("root"));
    assert_eq!(builder.root().logic, Logic::And);

    builder.add_condition();
    builder.add_condition();
    let leaves: Vec<FilterCondition> = builder.root().leaves().into_iter().cloned().collect();
    assert_eq!(leaves.len(), 2);
    for leaf in &leaves {
        assert_eq!(leaf.column, "name");
        assert_eq!(leaf.operator, Operator::Equals);
        assert_eq!(leaf.value, None);
    }

    let second = leaves[1]
        .with_column(&columns, "age")
        .with_operator(Operator::GreaterThan)
        .with_value(Some(FilterValue::Number(18.0)));
    builder.update_condition(&leaves[1].id, second);
    // the unset first condition keeps an empty value segment
    assert_eq!(builder.query_string(), "name:equals: AND age:greater_than:18");
}
