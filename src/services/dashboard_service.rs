//! Dashboard widget configuration and the REST endpoints the filter feeds

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use futures::future::BoxFuture;
use tracing::{debug, info};

use super::error::ServiceError;
use super::suggestion_service::{Suggestion, SuggestionSource};
use crate::core::column::{Column, ColumnOption};
use crate::core::group::FilterGroup;
use crate::core::types::ColumnType;

/// Endpoint settings (`api` section of the config file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub radius_data_path: String,
    pub suggestions_path: String,
    pub timeout_secs: u64,
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            radius_data_path: "/api/dashboard/radius-data".to_string(),
            suggestions_path: "/api/dashboard/radius-suggestions".to_string(),
            timeout_secs: 15,
            token: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    #[default]
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregationType {
    /// Aggregations other than `count` need a numeric value field
    pub fn needs_value_field(&self) -> bool {
        !matches!(self, AggregationType::Count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
    Table,
}

/// Persisted configuration of one dashboard widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    pub title: String,
    #[serde(default)]
    pub chart_type: ChartType,
    pub disaggregation_field: String,
    #[serde(default)]
    pub aggregation_type: AggregationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_group: Option<FilterGroup>,
}

impl WidgetConfig {
    pub fn request(&self) -> RadiusDataRequest {
        RadiusDataRequest {
            disaggregation_field: self.disaggregation_field.clone(),
            aggregation_type: self.aggregation_type,
            value_field: self
                .value_field
                .clone()
                .filter(|_| self.aggregation_type.needs_value_field()),
            filter_group: self.filter_group.clone().filter(|g| !g.is_empty()),
        }
    }
}

/// Body of `POST /api/dashboard/radius-data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadiusDataRequest {
    pub disaggregation_field: String,
    pub aggregation_type: AggregationType,
    pub value_field: Option<String>,
    pub filter_group: Option<FilterGroup>,
}

/// One bucket of an aggregate response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatePoint {
    #[serde(alias = "name", alias = "key", deserialize_with = "label_from_any")]
    pub label: String,
    #[serde(alias = "count", alias = "total", default)]
    pub value: f64,
}

fn label_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => "(none)".to_string(),
        other => other.to_string(),
    })
}

// Endpoints answer either with a bare list or with `{ "data": [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    List(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> Envelope<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Envelope::List(items) | Envelope::Wrapped { data: items } => items,
        }
    }
}

pub(crate) fn decode_list<T: serde::de::DeserializeOwned>(body: &str) -> Result<Vec<T>, ServiceError> {
    serde_json::from_str::<Envelope<T>>(body)
        .map(Envelope::into_items)
        .map_err(|e| ServiceError::Decode(e.to_string()))
}

#[derive(Debug, Clone)]
pub struct DashboardClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl DashboardClient {
    pub fn new(config: ApiConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("radfilter/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) if !token.is_empty() => request.bearer_auth(token),
            _ => request,
        }
    }

    async fn read_body(response: reqwest::Response) -> Result<String, ServiceError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Aggregate RADIUS user data for a widget
    pub async fn radius_data(
        &self,
        request: &RadiusDataRequest,
    ) -> Result<Vec<AggregatePoint>, ServiceError> {
        let url = self.url(&self.config.radius_data_path);
        info!("POST {} (group by {})", url, request.disaggregation_field);
        let response = self
            .authorize(self.http.post(&url))
            .json(request)
            .send()
            .await?;
        let body = Self::read_body(response).await?;
        decode_list(&body)
    }

    /// Value suggestions for `field` matching `search`
    pub async fn suggestions(&self, field: &str, search: &str) -> Result<Vec<Suggestion>, ServiceError> {
        let url = self.url(&self.config.suggestions_path);
        debug!("GET {} field={} search={}", url, field, search);
        let response = self
            .authorize(self.http.get(&url))
            .query(&[("field", field), ("search", search)])
            .send()
            .await?;
        let body = Self::read_body(response).await?;
        decode_list(&body)
    }
}

/// Suggestion source backed by the dashboard API
#[derive(Debug, Clone)]
pub struct HttpSuggestionSource {
    client: Arc<DashboardClient>,
}

impl HttpSuggestionSource {
    pub fn new(client: Arc<DashboardClient>) -> Self {
        Self { client }
    }
}

impl SuggestionSource for HttpSuggestionSource {
    fn fetch(&self, field: &str, search: &str) -> BoxFuture<'static, Result<Vec<Suggestion>, ServiceError>> {
        let client = Arc::clone(&self.client);
        let field = field.to_string();
        let search = search.to_string();
        Box::pin(async move { client.suggestions(&field, &search).await })
    }
}

/// Filterable fields of a RADIUS user record
pub fn radius_user_columns() -> Vec<Column> {
    vec![
        Column::new("username", "Username", ColumnType::Text),
        Column::new("email", "Email", ColumnType::Email),
        Column::new("full_name", "Full name", ColumnType::Text),
        Column::new("status", "Status", ColumnType::Select).with_options(vec![
            ColumnOption::new("active", "Active").with_color("green"),
            ColumnOption::new("expired", "Expired").with_color("red"),
            ColumnOption::new("suspended", "Suspended").with_color("yellow"),
            ColumnOption::new("disabled", "Disabled").with_color("gray"),
        ]),
        Column::new("profile", "Profile", ColumnType::Text)
            .with_suggestions(["default", "fiber-100m", "fiber-1g", "dsl-20m"]),
        Column::new("connection_type", "Connection type", ColumnType::Select).with_options(vec![
            ColumnOption::new("pppoe", "PPPoE"),
            ColumnOption::new("hotspot", "Hotspot"),
            ColumnOption::new("static", "Static IP"),
        ]),
        Column::new("is_online", "Online", ColumnType::Boolean),
        Column::new("balance", "Balance", ColumnType::Number),
        Column::new("data_used_mb", "Data used (MB)", ColumnType::Number),
        Column::new("expiration", "Expiration", ColumnType::Date),
        Column::new("created_at", "Created", ColumnType::Date),
        Column::new("last_seen", "Last seen", ColumnType::Date),
        Column::new("nas_ip", "NAS IP", ColumnType::Text),
        Column::new("mac_address", "MAC address", ColumnType::Text),
        Column::new("groups", "Groups", ColumnType::Array),
    ]
}
