use serde::{Deserialize, Serialize};

use super::types::ColumnType;

/// Enumerated value of a `select` column (or any column offering options)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "json_schema", derive(schemars::JsonSchema))]
pub struct ColumnOption {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl ColumnOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            color: None,
            icon: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// A field the host makes available for filtering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "json_schema", derive(schemars::JsonSchema))]
pub struct Column {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ColumnOption>,
    /// Static value hints for free-text fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl Column {
    pub fn new(key: impl Into<String>, label: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            column_type,
            options: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<ColumnOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_suggestions<S: Into<String>>(mut self, suggestions: impl IntoIterator<Item = S>) -> Self {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_options(&self) -> bool {
        !self.options.is_empty()
    }

    /// Label of an option value, falling back to the raw value
    pub fn option_label<'a>(&'a self, value: &'a str) -> &'a str {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
            .unwrap_or(value)
    }
}

pub fn find_column<'a>(columns: &'a [Column], key: &str) -> Option<&'a Column> {
    columns.iter().find(|c| c.key == key)
}

/// Column type for `key`; unknown keys degrade to `text`
pub fn column_type_of(columns: &[Column], key: &str) -> ColumnType {
    find_column(columns, key)
        .map(|c| c.column_type)
        .unwrap_or(ColumnType::Text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_deserializes_from_host_json() {
        let json = r#"{
            "key": "status",
            "label": "Status",
            "type": "select",
            "options": [
                {"value": "active", "label": "Active", "color": "green"},
                {"value": "expired", "label": "Expired"}
            ]
        }"#;
        let column: Column = serde_json::from_str(json).unwrap();
        assert_eq!(column.column_type, ColumnType::Select);
        assert_eq!(column.options.len(), 2);
        assert_eq!(column.options[0].color.as_deref(), Some("green"));
        assert!(column.suggestions.is_empty());
        assert_eq!(column.option_label("expired"), "Expired");
        assert_eq!(column.option_label("unknown"), "unknown");
    }

    #[test]
    fn unknown_column_falls_back_to_text() {
        let columns = vec![Column::new("age", "Age", ColumnType::Number)];
        assert_eq!(column_type_of(&columns, "age"), ColumnType::Number);
        assert_eq!(column_type_of(&columns, "gone"), ColumnType::Text);
        assert!(find_column(&columns, "gone").is_none());
    }
}
