//! Client-side evaluation of a filter tree against a JSON row
//!
//! Used for previews only; the backend stays authoritative. A condition that
//! still lacks the value its operator needs does not restrict anything.

use chrono::NaiveDateTime;
use serde_json::Value;

use super::column::{column_type_of, Column};
use super::condition::FilterCondition;
use super::group::{FilterGroup, FilterNode};
use super::operator::Operator;
use super::relative_date::resolve_date_value;
use super::types::{ColumnType, Logic};
use super::value::FilterValue;

impl FilterGroup {
    /// Empty AND groups match every row, empty OR groups match none
    pub fn matches(&self, row: &Value, columns: &[Column], now: NaiveDateTime) -> bool {
        let mut results = self.conditions.iter().map(|node| match node {
            FilterNode::Condition(c) => c.matches(row, columns, now),
            FilterNode::Group(g) => g.matches(row, columns, now),
        });
        match self.logic {
            Logic::And => results.all(|r| r),
            Logic::Or => results.any(|r| r),
        }
    }
}

impl FilterCondition {
    pub fn matches(&self, row: &Value, columns: &[Column], now: NaiveDateTime) -> bool {
        let field = row.get(self.column.as_str()).unwrap_or(&Value::Null);
        let column_type = column_type_of(columns, &self.column);

        match self.operator {
            Operator::IsEmpty => return is_empty(field),
            Operator::IsNotEmpty => return !is_empty(field),
            Operator::IsTrue => return is_truthy(field),
            Operator::IsFalse => return !is_truthy(field),
            _ => {}
        }

        let Some(value) = self.value.as_ref().filter(|v| !is_blank_value(v)) else {
            return true;
        };
        let cmp = Comparator { column_type, now };

        match self.operator {
            Operator::Equals => any_item(value, |v| cmp.equals(field, v)),
            Operator::NotEquals => !any_item(value, |v| cmp.equals(field, v)),
            Operator::In => any_item(value, |v| cmp.equals(field, v)),
            Operator::NotIn => !any_item(value, |v| cmp.equals(field, v)),
            Operator::Contains => cmp.contains(field, value),
            Operator::NotContains => !cmp.contains(field, value),
            Operator::StartsWith => text_test(field, value, |f, v| f.starts_with(v)),
            Operator::EndsWith => text_test(field, value, |f, v| f.ends_with(v)),
            Operator::GreaterThan => cmp.order(field, value).is_some_and(|o| o.is_gt()),
            Operator::LessThan => cmp.order(field, value).is_some_and(|o| o.is_lt()),
            Operator::GreaterOrEqual => cmp.order(field, value).is_some_and(|o| o.is_ge()),
            Operator::LessOrEqual => cmp.order(field, value).is_some_and(|o| o.is_le()),
            Operator::Before => cmp.order(field, value).is_some_and(|o| o.is_lt()),
            Operator::After => cmp.order(field, value).is_some_and(|o| o.is_gt()),
            Operator::Between => {
                let above = cmp.order(field, value).is_some_and(|o| o.is_ge());
                let below = match self.value2.as_ref().filter(|v| !is_blank_value(v)) {
                    Some(upper) => cmp.order(field, upper).is_some_and(|o| o.is_le()),
                    None => true,
                };
                above && below
            }
            Operator::IsEmpty | Operator::IsNotEmpty | Operator::IsTrue | Operator::IsFalse => true,
        }
    }
}

struct Comparator {
    column_type: ColumnType,
    now: NaiveDateTime,
}

impl Comparator {
    fn equals(&self, field: &Value, value: &FilterValue) -> bool {
        if let Value::Array(items) = field {
            return items.iter().any(|item| self.equals(item, value));
        }
        match self.column_type {
            ColumnType::Number => match (field_number(field), value.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            ColumnType::Date => match (self.field_date(field), self.value_date(value)) {
                (Some(a), Some(b)) => a.date() == b.date(),
                _ => false,
            },
            _ => match field_text(field) {
                Some(text) => text.to_lowercase() == value.to_string().to_lowercase(),
                None => false,
            },
        }
    }

    fn contains(&self, field: &Value, value: &FilterValue) -> bool {
        match field {
            Value::Array(_) => any_item(value, |v| self.equals(field, v)),
            _ => text_test(field, value, |f, v| f.contains(v)),
        }
    }

    fn order(&self, field: &Value, value: &FilterValue) -> Option<std::cmp::Ordering> {
        match self.column_type {
            ColumnType::Date => {
                let (a, b) = (self.field_date(field)?, self.value_date(value)?);
                Some(a.cmp(&b))
            }
            _ => {
                let (a, b) = (field_number(field)?, value.as_f64()?);
                a.partial_cmp(&b)
            }
        }
    }

    fn field_date(&self, field: &Value) -> Option<NaiveDateTime> {
        resolve_date_value(field.as_str()?, self.now)
    }

    fn value_date(&self, value: &FilterValue) -> Option<NaiveDateTime> {
        resolve_date_value(value.as_str()?, self.now)
    }
}

fn any_item(value: &FilterValue, mut test: impl FnMut(&FilterValue) -> bool) -> bool {
    match value {
        FilterValue::List(items) => items.iter().any(&mut test),
        scalar => test(scalar),
    }
}

fn text_test(field: &Value, value: &FilterValue, test: impl Fn(&str, &str) -> bool) -> bool {
    let Some(text) = field_text(field) else {
        return false;
    };
    let haystack = text.to_lowercase();
    any_item(value, |v| test(&haystack, &v.to_string().to_lowercase()))
}

fn field_text(field: &Value) -> Option<String> {
    match field {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn field_number(field: &Value) -> Option<f64> {
    match field {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_empty(field: &Value) -> bool {
    match field {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn is_truthy(field: &Value) -> bool {
    match field {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

fn is_blank_value(value: &FilterValue) -> bool {
    match value {
        FilterValue::Text(s) => s.is_empty(),
        FilterValue::List(items) => items.is_empty(),
        FilterValue::Bool(_) | FilterValue::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("username", "Username", ColumnType::Text),
            Column::new("data_limit", "Data limit", ColumnType::Number),
            Column::new("is_online", "Online", ColumnType::Boolean),
            Column::new("expiration", "Expiration", ColumnType::Date),
            Column::new("status", "Status", ColumnType::Select),
            Column::new("groups", "Groups", ColumnType::Array),
        ]
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn row() -> Value {
        json!({
            "username": "Alice.Smith",
            "data_limit": "500",
            "is_online": true,
            "expiration": "2024-06-10",
            "status": "active",
            "groups": ["gold", "wifi"],
            "notes": ""
        })
    }

    fn cond(column: &str, operator: Operator, value: Option<FilterValue>) -> FilterCondition {
        FilterCondition::with_parts(column, operator, value, None)
    }

    fn check(c: FilterCondition) -> bool {
        c.matches(&row(), &columns(), now())
    }

    #[test]
    fn empty_groups() {
        let r = row();
        assert!(FilterGroup::root().matches(&r, &columns(), now()));
        assert!(!FilterGroup::root().with_logic(Logic::Or).matches(&r, &columns(), now()));
    }

    #[test]
    fn text_is_case_insensitive() {
        assert!(check(cond("username", Operator::Contains, Some("smith".into()))));
        assert!(check(cond("username", Operator::StartsWith, Some("ALICE".into()))));
        assert!(check(cond("username", Operator::Equals, Some("alice.smith".into()))));
        assert!(!check(cond("username", Operator::EndsWith, Some("bob".into()))));
    }

    #[test]
    fn numbers_coerce_strings() {
        assert!(check(cond("data_limit", Operator::GreaterThan, Some(FilterValue::Number(100.0)))));
        assert!(check(cond("data_limit", Operator::Equals, Some(FilterValue::Number(500.0)))));
        let between = FilterCondition::with_parts(
            "data_limit",
            Operator::Between,
            Some(FilterValue::Number(600.0)),
            Some(FilterValue::Number(900.0)),
        );
        assert!(!check(between));
    }

    #[test]
    fn dates_resolve_relative_tokens() {
        assert!(check(cond("expiration", Operator::Before, Some("today".into()))));
        assert!(check(cond("expiration", Operator::After, Some("7_days_ago".into()))));
        assert!(check(cond("expiration", Operator::Equals, Some("2024-06-10".into()))));
        assert!(!check(cond("expiration", Operator::After, Some("tomorrow".into()))));
    }

    #[test]
    fn lists_and_arrays() {
        assert!(check(cond("status", Operator::In, Some(vec!["active", "expired"].into()))));
        assert!(!check(cond("status", Operator::NotIn, Some(vec!["active"].into()))));
        assert!(check(cond("groups", Operator::Contains, Some("GOLD".into()))));
        assert!(check(cond("groups", Operator::NotContains, Some("silver".into()))));
    }

    #[test]
    fn no_value_operators() {
        assert!(check(cond("notes", Operator::IsEmpty, None)));
        assert!(check(cond("missing", Operator::IsEmpty, None)));
        assert!(check(cond("username", Operator::IsNotEmpty, None)));
        assert!(check(cond("is_online", Operator::IsTrue, None)));
        assert!(!check(cond("is_online", Operator::IsFalse, None)));
    }

    #[test]
    fn incomplete_conditions_do_not_restrict() {
        assert!(check(cond("username", Operator::Equals, None)));
        assert!(check(cond("status", Operator::In, None)));
    }

    #[test]
    fn nested_logic() {
        let g = FilterGroup::root()
            .with_node(cond("is_online", Operator::IsTrue, None))
            .with_node(
                FilterGroup::new(Logic::Or)
                    .with_node(cond("status", Operator::Equals, Some("expired".into())))
                    .with_node(cond("groups", Operator::Contains, Some("wifi".into()))),
            );
        assert!(g.matches(&row(), &columns(), now()));
        let strict = g.with_node(cond("username", Operator::Equals, Some("bob".into())));
        assert!(!strict.matches(&row(), &columns(), now()));
    }
}
