//! Notion database adapter.

use std::collections::HashMap;
use std::time::Duration;

use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{PropertyNames, SourceConfig, SourceCredentials};
use crate::error::{Error, Result};
use crate::source::{Page, PropertyValue, QueryFilter, RawRecord, SortKey, TaskSource};

/// Client for `POST /databases/{id}/query`.
pub struct NotionClient {
    api_base: String,
    notion_version: String,
    token: String,
    database_id: String,
    page_size: u32,
    properties: PropertyNames,
    http: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl NotionClient {
    pub fn new(credentials: &SourceCredentials, config: &SourceConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            notion_version: config.notion_version.clone(),
            token: credentials.token.clone(),
            database_id: credentials.database_id.clone(),
            page_size: config.page_size,
            properties: config.properties.clone(),
            http,
        })
    }

    /// Body of a database query.
    pub fn request_body(&self, filter: &QueryFilter, sorts: &[SortKey], cursor: Option<&str>) -> Value {
        let due = &self.properties.due;
        let mut conditions = vec![json!({
            "property": due,
            "date": {
                "on_or_before": filter
                    .due_on_or_before
                    .to_rfc3339_opts(SecondsFormat::Secs, false)
            }
        })];
        if filter.require_due {
            conditions.push(json!({ "property": due, "date": { "is_not_empty": true } }));
        }
        if !filter.statuses.is_empty() {
            let any_status: Vec<Value> = filter
                .statuses
                .iter()
                .map(|status| {
                    json!({
                        "property": self.properties.schedule_status,
                        "status": { "equals": status }
                    })
                })
                .collect();
            conditions.push(json!({ "or": any_status }));
        }

        let sorts: Vec<Value> = sorts
            .iter()
            .map(|key| {
                let property = match key {
                    SortKey::DueAscending => &self.properties.due,
                    SortKey::PriorityAscending => &self.properties.priority,
                };
                json!({ "property": property, "direction": "ascending" })
            })
            .collect();

        let mut body = json!({
            "filter": { "and": conditions },
            "sorts": sorts,
            "page_size": self.page_size,
        });
        if let (Some(cursor), Some(object)) = (cursor, body.as_object_mut()) {
            object.insert("start_cursor".to_string(), Value::String(cursor.to_string()));
        }
        body
    }
}

impl TaskSource for NotionClient {
    fn query(&self, filter: &QueryFilter, sorts: &[SortKey], cursor: Option<&str>) -> Result<Page> {
        let url = format!("{}/databases/{}/query", self.api_base, self.database_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.notion_version)
            .json(&self.request_body(filter, sorts, cursor))
            .send()
            .map_err(|err| Error::SourceFetch(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let reason = match serde_json::from_str::<ApiError>(&body) {
                Ok(ApiError {
                    code: Some(code),
                    message,
                }) => format!("{code}: {}", message.unwrap_or_default()),
                _ => body,
            };
            return Err(Error::SourceFetch(format!("status {status}: {reason}")));
        }

        let body: QueryResponse = response
            .json()
            .map_err(|err| Error::SourceFetch(format!("unreadable response: {err}")))?;
        tracing::debug!(
            results = body.results.len(),
            has_more = body.has_more,
            "database page received"
        );

        Ok(Page {
            records: body.results.iter().map(parse_page).collect(),
            next_cursor: body.next_cursor,
            has_more: body.has_more,
        })
    }
}

/// Convert one page object into a raw record.
pub fn parse_page(page: &Value) -> RawRecord {
    let properties = page
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, value)| (name.clone(), parse_property(value)))
                .collect()
        })
        .unwrap_or_else(HashMap::new);

    RawRecord {
        id: string_field(page, "id"),
        url: string_field(page, "url"),
        properties,
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn parse_property(value: &Value) -> PropertyValue {
    let Some(object) = value.as_object() else {
        return PropertyValue::Unsupported;
    };
    let kind = object.get("type").and_then(Value::as_str).unwrap_or_default();
    let body = object.get(kind).unwrap_or(&Value::Null);

    match kind {
        "title" => PropertyValue::Title(rich_text(body, "")),
        "rich_text" => PropertyValue::Text(rich_text(body, "\n")),
        "select" => PropertyValue::Select(option_name(body)),
        "status" => PropertyValue::Status(option_name(body)),
        "number" => PropertyValue::Number(body.as_f64()),
        "date" => PropertyValue::Date {
            start: body.get("start").and_then(Value::as_str).map(str::to_string),
            end: body.get("end").and_then(Value::as_str).map(str::to_string),
        },
        _ => PropertyValue::Unsupported,
    }
}

fn rich_text(body: &Value, separator: &str) -> String {
    body.as_array()
        .map(|segments| {
            segments
                .iter()
                .filter_map(segment_text)
                .collect::<Vec<_>>()
                .join(separator)
        })
        .unwrap_or_default()
}

fn segment_text(segment: &Value) -> Option<&str> {
    segment
        .get("plain_text")
        .and_then(Value::as_str)
        .or_else(|| segment.pointer("/text/content").and_then(Value::as_str))
}

fn option_name(body: &Value) -> Option<String> {
    body.get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
