//! Compact textual form of a filter tree
//!
//! ```text
//! expr      := term ( (" AND " | " OR ") term )*
//! term      := "(" expr ")" | condition
//! condition := key ":" operator [ ":" value [ ":" value2 ] ]
//! ```
//!
//! Inside keys and values the characters `\ : , ( )` and any whitespace are
//! escaped with a backslash. List values are comma separated.

use std::str::FromStr;

use super::column::{column_type_of, find_column, Column};
use super::condition::FilterCondition;
use super::error::FilterError;
use super::group::{FilterGroup, FilterNode};
use super::operator::{Operator, ValueArity};
use super::types::{ColumnType, Logic};
use super::value::FilterValue;

const SPECIAL: [char; 5] = ['\\', ':', ',', '(', ')'];

/// Characters that end or split an unescaped segment
fn is_special(ch: char) -> bool {
    SPECIAL.contains(&ch) || ch.is_whitespace()
}

/// Render a filter tree; an empty root renders as the empty string
pub fn filters_to_query_string(group: &FilterGroup) -> String {
    render_nodes(&group.conditions, group.logic)
}

fn render_nodes(nodes: &[FilterNode], logic: Logic) -> String {
    let joiner = format!(" {} ", logic.keyword());
    nodes
        .iter()
        .map(|node| match node {
            FilterNode::Condition(c) => render_condition(c),
            FilterNode::Group(g) => format!("({})", render_nodes(&g.conditions, g.logic)),
        })
        .collect::<Vec<_>>()
        .join(&joiner)
}

fn render_condition(c: &FilterCondition) -> String {
    let head = format!("{}:{}", escape(&c.column), c.operator);
    match c.operator.arity() {
        ValueArity::None => head,
        ValueArity::Range => format!(
            "{}:{}:{}",
            head,
            render_value(c.value.as_ref()),
            render_value(c.value2.as_ref())
        ),
        ValueArity::Single | ValueArity::Multi => {
            format!("{}:{}", head, render_value(c.value.as_ref()))
        }
    }
}

fn render_value(value: Option<&FilterValue>) -> String {
    match value {
        None => String::new(),
        Some(FilterValue::List(items)) => items
            .iter()
            .map(|v| escape(&v.to_string()))
            .collect::<Vec<_>>()
            .join(","),
        Some(v) => escape(&v.to_string()),
    }
}

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if is_special(ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Parse the textual form back into a tree with fresh ids
///
/// Blank input yields `Ok(None)`. `columns` types the values: number columns
/// parse numbers, options-backed flexible operators and multi-value operators
/// produce lists, anything else stays text.
pub fn query_string_to_filters(
    query: &str,
    columns: &[Column],
) -> Result<Option<FilterGroup>, FilterError> {
    if query.trim().is_empty() {
        return Ok(None);
    }
    let mut parser = Parser {
        input: query,
        pos: 0,
        columns,
    };
    let group = parser.parse_expr()?;
    parser.skip_ws();
    if let Some(ch) = parser.peek() {
        return Err(FilterError::parse(parser.pos, format!("unexpected '{ch}'")));
    }
    Ok(Some(group))
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    columns: &'a [Column],
}

/// One `:`-separated part of a condition, split on unescaped commas
#[derive(Debug, Default)]
struct Segment {
    pieces: Vec<String>,
}

impl Segment {
    fn joined(&self) -> String {
        self.pieces.join(",")
    }

    fn is_blank(&self) -> bool {
        self.pieces.iter().all(|p| p.is_empty())
    }
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn parse_expr(&mut self) -> Result<FilterGroup, FilterError> {
        let mut group = FilterGroup::new(Logic::And);
        let mut logic: Option<Logic> = None;
        loop {
            self.skip_ws();
            if self.peek().is_none_or(|c| c == ')') {
                if logic.is_some() {
                    return Err(FilterError::parse(
                        self.pos,
                        "expected a condition after the logic keyword",
                    ));
                }
                break;
            }
            group.conditions.push(self.parse_term()?);

            self.skip_ws();
            if self.peek().is_none_or(|c| c == ')') {
                break;
            }
            let offset = self.pos;
            let next = self.parse_keyword()?;
            match logic {
                Some(current) if current != next => return Err(FilterError::MixedLogic { offset }),
                _ => logic = Some(next),
            }
        }
        group.logic = logic.unwrap_or_default();
        Ok(group)
    }

    fn parse_keyword(&mut self) -> Result<Logic, FilterError> {
        let rest = &self.input[self.pos..];
        let (logic, len) = if rest.starts_with("AND") {
            (Logic::And, 3)
        } else if rest.starts_with("OR") {
            (Logic::Or, 2)
        } else {
            return Err(FilterError::parse(self.pos, "expected AND or OR"));
        };
        self.pos += len;
        if !self.peek().is_some_and(char::is_whitespace) {
            return Err(FilterError::parse(self.pos, "expected whitespace after logic keyword"));
        }
        Ok(logic)
    }

    fn parse_term(&mut self) -> Result<FilterNode, FilterError> {
        if self.peek() == Some('(') {
            let open = self.pos;
            self.bump();
            let inner = self.parse_expr()?;
            self.skip_ws();
            if self.bump() != Some(')') {
                return Err(FilterError::parse(open, "unclosed '('"));
            }
            return Ok(FilterNode::Group(inner));
        }
        self.parse_condition().map(FilterNode::Condition)
    }

    fn scan_segments(&mut self) -> Result<Vec<Segment>, FilterError> {
        let mut segments = vec![Segment::default()];
        let mut piece = String::new();
        while let Some(ch) = self.peek() {
            match ch {
                c if c.is_whitespace() || c == '(' || c == ')' => break,
                '\\' => {
                    let at = self.pos;
                    self.bump();
                    match self.bump() {
                        Some(escaped) => piece.push(escaped),
                        None => return Err(FilterError::parse(at, "dangling escape")),
                    }
                    continue;
                }
                ':' | ',' => {
                    if let Some(current) = segments.last_mut() {
                        current.pieces.push(std::mem::take(&mut piece));
                    }
                    if ch == ':' {
                        segments.push(Segment::default());
                    }
                }
                other => piece.push(other),
            }
            self.bump();
        }
        if let Some(current) = segments.last_mut() {
            current.pieces.push(piece);
        }
        Ok(segments)
    }

    fn parse_condition(&mut self) -> Result<FilterCondition, FilterError> {
        let start = self.pos;
        let segments = self.scan_segments()?;
        if segments.len() < 2 || segments[0].is_blank() || segments[1].is_blank() {
            return Err(FilterError::parse(start, "expected column:operator"));
        }
        if segments.len() > 4 {
            return Err(FilterError::parse(start, "too many ':' separated parts"));
        }
        let key = segments[0].joined();
        let op_name = segments[1].joined();
        let operator =
            Operator::from_str(&op_name).map_err(|_| FilterError::UnknownOperator(op_name.clone()))?;

        let column_type = column_type_of(self.columns, &key);
        let has_options = find_column(self.columns, &key).is_some_and(Column::has_options);
        let wants_list = operator.is_multi_value() || (operator.is_flexible() && has_options);

        let (value, value2) = match operator.arity() {
            ValueArity::None => (None, None),
            ValueArity::Range => (
                decode_scalar(segments.get(2), column_type)?,
                decode_scalar(segments.get(3), column_type)?,
            ),
            ValueArity::Single | ValueArity::Multi if wants_list => {
                (decode_list(segments.get(2), column_type)?, None)
            }
            ValueArity::Single | ValueArity::Multi => {
                (decode_scalar(segments.get(2), column_type)?, None)
            }
        };

        Ok(FilterCondition::with_parts(key, operator, value, value2))
    }
}

fn decode_piece(raw: &str, column_type: ColumnType) -> Result<Option<FilterValue>, FilterError> {
    if raw.is_empty() {
        return Ok(None);
    }
    match column_type {
        ColumnType::Number => FilterValue::parse_number_input(raw),
        _ => Ok(Some(FilterValue::from(raw))),
    }
}

fn decode_scalar(
    segment: Option<&Segment>,
    column_type: ColumnType,
) -> Result<Option<FilterValue>, FilterError> {
    match segment {
        None => Ok(None),
        Some(s) => decode_piece(&s.joined(), column_type),
    }
}

fn decode_list(
    segment: Option<&Segment>,
    column_type: ColumnType,
) -> Result<Option<FilterValue>, FilterError> {
    let Some(segment) = segment.filter(|s| !s.is_blank()) else {
        return Ok(Some(FilterValue::List(Vec::new())));
    };
    let mut items = Vec::with_capacity(segment.pieces.len());
    for piece in &segment.pieces {
        if let Some(v) = decode_piece(piece, column_type)? {
            items.push(v);
        }
    }
    Ok(Some(FilterValue::List(items)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::column::ColumnOption;
    use crate::core::types::NodeId;
    use pretty_assertions::assert_eq;

    fn columns() -> Vec<Column> {
        vec![
            Column::new("name", "Name", ColumnType::Text),
            Column::new("age", "Age", ColumnType::Number),
            Column::new("active", "Active", ColumnType::Boolean),
            Column::new("status", "Status", ColumnType::Select).with_options(vec![
                ColumnOption::new("active", "Active"),
                ColumnOption::new("expired", "Expired"),
            ]),
        ]
    }

    fn cond(column: &str, operator: Operator, value: Option<FilterValue>) -> FilterCondition {
        FilterCondition::with_parts(column, operator, value, None)
    }

    #[test]
    fn renders_single_condition() {
        let g = FilterGroup::root().with_node(cond("name", Operator::Contains, Some("bob".into())));
        assert_eq!(filters_to_query_string(&g), "name:contains:bob");
    }

    #[test]
    fn renders_mixed_tree() {
        let inner = FilterGroup::new(Logic::Or)
            .with_node(cond("status", Operator::In, Some(vec!["active", "expired"].into())))
            .with_node(cond("active", Operator::IsTrue, None));
        let range = FilterCondition::with_parts(
            "age",
            Operator::Between,
            Some(FilterValue::Number(18.0)),
            Some(FilterValue::Number(65.0)),
        );
        let g = FilterGroup::root().with_node(range).with_node(inner);
        assert_eq!(
            filters_to_query_string(&g),
            "age:between:18:65 AND (status:in:active,expired OR active:is_true)"
        );
    }

    #[test]
    fn root_logic_joins_top_level() {
        let g = FilterGroup::root()
            .with_node(cond("name", Operator::Equals, Some("bob".into())))
            .with_node(cond("status", Operator::Equals, Some("active".into())));
        let rendered = filters_to_query_string(&g);
        assert_eq!(rendered, "name:equals:bob AND status:equals:active");
        assert_eq!(filters_to_query_string(&g), rendered);
        assert_eq!(
            filters_to_query_string(&g.with_logic(Logic::Or)),
            "name:equals:bob OR status:equals:active"
        );
    }

    #[test]
    fn range_and_list_shapes() {
        let range = FilterCondition::with_parts(
            "age",
            Operator::Between,
            Some(FilterValue::Number(5.0)),
            Some(FilterValue::Number(10.0)),
        );
        let g = FilterGroup::root().with_node(range);
        assert_eq!(filters_to_query_string(&g), "age:between:5:10");

        let tags = FilterGroup::root().with_node(cond("tags", Operator::In, Some(vec!["a", "b"].into())));
        assert_eq!(filters_to_query_string(&tags), "tags:in:a,b");
    }

    #[test]
    fn unset_value_renders_empty_segment() {
        let g = FilterGroup::root()
            .with_node(cond("name", Operator::Equals, None))
            .with_node(cond("age", Operator::GreaterThan, Some(FilterValue::Number(18.0))));
        assert_eq!(filters_to_query_string(&g), "name:equals: AND age:greater_than:18");
    }

    #[test]
    fn empty_root_renders_empty_string() {
        assert_eq!(filters_to_query_string(&FilterGroup::root()), "");
    }

    #[test]
    fn escapes_special_characters() {
        let g = FilterGroup::root().with_node(cond("name", Operator::Equals, Some("a:b, (c)".into())));
        let rendered = filters_to_query_string(&g);
        assert_eq!(rendered, r"name:equals:a\:b\,\ \(c\)");

        let parsed = query_string_to_filters(&rendered, &columns()).unwrap().unwrap();
        assert_eq!(parsed.leaves()[0].value, Some(FilterValue::from("a:b, (c)")));
    }

    #[test]
    fn whitespace_inside_values_survives() {
        for raw in ["a\tb", "line1\nline2", "crlf\r\nend", "two  spaces"] {
            let g = FilterGroup::root().with_node(cond("name", Operator::Equals, Some(raw.into())));
            let rendered = filters_to_query_string(&g);
            let parsed = query_string_to_filters(&rendered, &columns()).unwrap().unwrap();
            assert_eq!(parsed.leaves()[0].value, Some(FilterValue::from(raw)));
        }
    }

    #[test]
    fn blank_input_parses_to_none() {
        assert_eq!(query_string_to_filters("", &columns()).unwrap(), None);
        assert_eq!(query_string_to_filters("   ", &columns()).unwrap(), None);
    }

    #[test]
    fn values_are_typed_from_columns() {
        let g = query_string_to_filters("age:greater_than:18 AND name:equals:18", &columns())
            .unwrap()
            .unwrap();
        let leaves = g.leaves();
        assert_eq!(leaves[0].value, Some(FilterValue::Number(18.0)));
        assert_eq!(leaves[1].value, Some(FilterValue::from("18")));
        assert_ne!(g.id, NodeId::from("root"));
    }

    #[test]
    fn empty_value_segment_is_null() {
        let g = query_string_to_filters("name:equals:", &columns()).unwrap().unwrap();
        assert_eq!(g.leaves()[0].value, None);
    }

    #[test]
    fn select_values_decode_to_lists() {
        let g = query_string_to_filters("status:equals:active", &columns())
            .unwrap()
            .unwrap();
        assert_eq!(g.leaves()[0].value, Some(FilterValue::from(vec!["active"])));
    }

    #[test]
    fn nested_groups_and_or_logic() {
        let g = query_string_to_filters("(name:is_empty OR name:contains:x) AND active:is_false", &columns())
            .unwrap()
            .unwrap();
        assert_eq!(g.logic, Logic::And);
        assert_eq!(g.depth(), 2);
        match &g.conditions[0] {
            FilterNode::Group(inner) => {
                assert_eq!(inner.logic, Logic::Or);
                assert_eq!(inner.conditions.len(), 2);
            }
            FilterNode::Condition(_) => panic!("expected nested group"),
        }
    }

    #[test]
    fn rejects_mixed_logic_at_one_level() {
        let err = query_string_to_filters("name:is_empty AND age:is_empty OR active:is_true", &columns())
            .unwrap_err();
        assert_eq!(err, FilterError::MixedLogic { offset: 31 });
    }

    #[test]
    fn reports_malformed_input() {
        let cols = columns();
        assert_eq!(
            query_string_to_filters("name:sounds_like:bob", &cols).unwrap_err(),
            FilterError::UnknownOperator("sounds_like".to_string())
        );
        assert!(matches!(
            query_string_to_filters("(name:is_empty", &cols).unwrap_err(),
            FilterError::Parse { offset: 0, .. }
        ));
        assert!(matches!(
            query_string_to_filters("name", &cols).unwrap_err(),
            FilterError::Parse { .. }
        ));
        assert!(matches!(
            query_string_to_filters("name:is_empty AND", &cols).unwrap_err(),
            FilterError::Parse { .. }
        ));
        assert!(matches!(
            query_string_to_filters("name:is_empty)", &cols).unwrap_err(),
            FilterError::Parse { offset: 13, .. }
        ));
        assert_eq!(
            query_string_to_filters("age:equals:abc", &cols).unwrap_err(),
            FilterError::InvalidNumber("abc".to_string())
        );
    }
}
