//! Task source port and record mapping.
//!
//! A `TaskSource` returns pages of loosely typed records. `fetch_all` walks
//! every page and maps each record onto a validated `TaskRecord`; records
//! that fail validation are skipped with a warning and never reach the
//! rest of the pipeline.

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};

use crate::config::{PropertyNames, SourceConfig};
use crate::error::{Error, Result};
use crate::task::{DuePoint, DueRange, Priority, RecordError, TaskRecord};

/// Server-side filter for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilter {
    /// Only tasks due on or before this instant
    pub due_on_or_before: DateTime<FixedOffset>,
    /// Only tasks that have a due date at all
    pub require_due: bool,
    /// Only tasks whose schedule status is one of these
    pub statuses: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    DueAscending,
    PriorityAscending,
}

/// Sorts requested from the source; display order is decided locally anyway.
pub const DEFAULT_SORTS: [SortKey; 2] = [SortKey::DueAscending, SortKey::PriorityAscending];

/// A property value as delivered by the source, before validation.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Title(String),
    Text(String),
    Select(Option<String>),
    Status(Option<String>),
    Date {
        start: Option<String>,
        end: Option<String>,
    },
    Number(Option<f64>),
    Unsupported,
}

/// One record from the source, keyed by property name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub id: String,
    pub url: String,
    pub properties: HashMap<String, PropertyValue>,
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<RawRecord>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

/// Capability to query a task database page by page.
pub trait TaskSource {
    fn query(&self, filter: &QueryFilter, sorts: &[SortKey], cursor: Option<&str>) -> Result<Page>;
}

/// Field validation rules applied while mapping records.
#[derive(Debug, Clone)]
pub struct MappingRules {
    pub properties: PropertyNames,
    pub default_notify_days: u32,
    pub allowed_notify_days: Vec<u32>,
    /// Offset into which timestamps are converted before dropping the zone
    pub offset: FixedOffset,
}

impl MappingRules {
    pub fn from_config(config: &SourceConfig, offset: FixedOffset) -> Self {
        Self {
            properties: config.properties.clone(),
            default_notify_days: config.default_notify_days,
            allowed_notify_days: config.allowed_notify_days.clone(),
            offset,
        }
    }
}

/// End of the query window: `now` plus the requested days, clamped to `max_days`.
pub fn window_end(now: DateTime<FixedOffset>, days: u32, max_days: u32) -> DateTime<FixedOffset> {
    if days > max_days {
        tracing::debug!(requested = days, max_days, "lookahead clamped to maximum");
    }
    now + Duration::days(i64::from(days.min(max_days)))
}

/// Last second of `now`'s local day.
pub fn end_of_day(now: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    let last = now.date_naive().and_time(NaiveTime::MIN) + Duration::days(1) - Duration::seconds(1);
    last.and_local_timezone(*now.offset()).single().unwrap_or(now)
}

impl QueryFilter {
    /// Filter for a run at `now`. The window never ends before the current
    /// local day does, so tasks due later today are always fetched.
    pub fn for_run(
        now: DateTime<FixedOffset>,
        days: u32,
        config: &SourceConfig,
    ) -> Self {
        Self {
            due_on_or_before: window_end(now, days, config.max_lookahead_days).max(end_of_day(now)),
            require_due: true,
            statuses: config.statuses.clone(),
        }
    }
}

/// Parse a due value: `YYYY-MM-DD` is local midnight, RFC 3339 is converted
/// into `offset`.
pub fn parse_due_point(raw: &str, offset: FixedOffset) -> Option<DuePoint> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(DuePoint::on(date));
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|at| DuePoint::new(at.with_timezone(&offset).naive_local()))
}

/// Map one raw record onto a `TaskRecord`.
pub fn map_record(raw: &RawRecord, rules: &MappingRules) -> std::result::Result<TaskRecord, RecordError> {
    let names = &rules.properties;

    let title = match raw.properties.get(&names.title) {
        Some(PropertyValue::Title(text)) | Some(PropertyValue::Text(text)) => text.clone(),
        _ => String::new(),
    };

    let due = match raw.properties.get(&names.due) {
        Some(PropertyValue::Date { start, end }) => DueRange::from_parts(
            parse_due_field(raw, start.as_deref(), rules.offset),
            parse_due_field(raw, end.as_deref(), rules.offset),
        ),
        _ => DueRange::Neither,
    };

    let mut task = TaskRecord::new(raw.id.clone(), title, due)?;
    if task.due().is_neither() {
        return Err(RecordError::MissingDue);
    }

    if let Some(name) = choice(raw, &names.priority) {
        match Priority::parse(&name) {
            Some(priority) => task = task.with_priority(Some(priority)),
            None => tracing::warn!(
                task_id = %raw.id,
                value = %name,
                "unknown priority; treating as unset"
            ),
        }
    }
    if let Some(task_type) = choice(raw, &names.task_type) {
        task = task.with_type(task_type);
    }
    if let Some(status) = choice(raw, &names.schedule_status) {
        task = task.with_schedule_status(status);
    }
    match raw.properties.get(&names.workload) {
        Some(PropertyValue::Number(Some(value))) => task = task.with_workload(*value),
        Some(PropertyValue::Select(Some(name))) | Some(PropertyValue::Text(name)) => {
            match name.trim().parse::<f64>() {
                Ok(value) => task = task.with_workload(value),
                Err(err) => tracing::warn!(
                    task_id = %raw.id,
                    value = %name,
                    error = %err,
                    "unable to parse workload"
                ),
            }
        }
        _ => {}
    }
    if let Some(PropertyValue::Text(memo)) = raw.properties.get(&names.memo) {
        task = task.with_memo(memo.clone());
    }

    task = task.with_url(raw.url.clone());
    Ok(task.with_notify_window_days(notify_days(raw, rules)))
}

fn parse_due_field(raw: &RawRecord, value: Option<&str>, offset: FixedOffset) -> Option<DuePoint> {
    let value = value?;
    let parsed = parse_due_point(value, offset);
    if parsed.is_none() {
        tracing::warn!(task_id = %raw.id, value, "unparseable due date ignored");
    }
    parsed
}

fn choice(raw: &RawRecord, name: &str) -> Option<String> {
    match raw.properties.get(name) {
        Some(PropertyValue::Select(Some(value)))
        | Some(PropertyValue::Status(Some(value)))
        | Some(PropertyValue::Text(value))
            if !value.trim().is_empty() =>
        {
            Some(value.clone())
        }
        _ => None,
    }
}

fn notify_days(raw: &RawRecord, rules: &MappingRules) -> u32 {
    let requested = match raw.properties.get(&rules.properties.notify_days) {
        Some(PropertyValue::Number(Some(value))) => Some(value.to_string()),
        Some(PropertyValue::Select(Some(name))) | Some(PropertyValue::Text(name)) => {
            Some(name.clone())
        }
        _ => None,
    };
    let Some(requested) = requested else {
        return rules.default_notify_days;
    };
    match requested.trim().parse::<u32>() {
        Ok(days) if rules.allowed_notify_days.contains(&days) => days,
        _ => {
            tracing::warn!(
                task_id = %raw.id,
                value = %requested,
                default = rules.default_notify_days,
                "invalid notification window; using default"
            );
            rules.default_notify_days
        }
    }
}

/// Mapped tasks from every page, plus the number of records that failed validation.
#[derive(Debug, Clone, Default)]
pub struct Fetched {
    pub tasks: Vec<TaskRecord>,
    pub skipped: usize,
}

/// Query every page and map the results.
///
/// Records whose effective due date falls after the window end are dropped:
/// the remote filter only looks at the start of a range.
pub fn fetch_all(
    source: &dyn TaskSource,
    filter: &QueryFilter,
    rules: &MappingRules,
) -> Result<Fetched> {
    let window_end = DuePoint::new(filter.due_on_or_before.with_timezone(&rules.offset).naive_local());
    let mut tasks = Vec::new();
    let mut skipped = 0usize;
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = source.query(filter, &DEFAULT_SORTS, cursor.as_deref())?;
        pages += 1;

        for raw in &page.records {
            match map_record(raw, rules) {
                Ok(task) => {
                    if task.effective_due().is_some_and(|due| due > window_end) {
                        tracing::debug!(task_id = task.id(), "due after query window; skipped");
                        continue;
                    }
                    tasks.push(task);
                }
                Err(reason) => {
                    tracing::warn!(task_id = %raw.id, %reason, "skipping malformed record");
                    skipped += 1;
                }
            }
        }

        if !page.has_more {
            break;
        }
        match page.next_cursor {
            Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
            Some(_) => {
                return Err(Error::SourceFetch(
                    "source returned the same cursor twice".to_string(),
                ))
            }
            None => {
                return Err(Error::SourceFetch(
                    "source reported more results without a cursor".to_string(),
                ))
            }
        }
    }

    tracing::info!(pages, fetched = tasks.len(), skipped, "fetched tasks");
    Ok(Fetched { tasks, skipped })
}
