//! Task records as the digest pipeline sees them.
//!
//! A `TaskRecord` is built once by the source adapter and never mutated
//! afterwards. All dates are already expressed in the run's local time frame,
//! so the rest of the pipeline can reason purely in calendar terms.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use thiserror::Error;

/// Priority levels understood by the digest, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Display order, also the basis of the sort rank.
    pub const ORDER: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ORDER
            .iter()
            .copied()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(trimmed))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Visual marker shown in front of the priority name.
    pub fn marker(&self) -> &'static str {
        match self {
            Priority::High => "🔴",
            Priority::Medium => "🔵",
            Priority::Low => "⚫",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end of a due range, in local time.
///
/// Date-only values from the source are stored at local midnight; a point
/// is considered to carry a time-of-day only when it is not midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DuePoint(NaiveDateTime);

impl DuePoint {
    pub fn new(at: NaiveDateTime) -> Self {
        Self(at)
    }

    pub fn on(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::MIN))
    }

    pub fn at(&self) -> NaiveDateTime {
        self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    pub fn has_time(&self) -> bool {
        self.0.hour() != 0 || self.0.minute() != 0
    }
}

impl From<NaiveDateTime> for DuePoint {
    fn from(at: NaiveDateTime) -> Self {
        Self(at)
    }
}

impl From<NaiveDate> for DuePoint {
    fn from(date: NaiveDate) -> Self {
        Self::on(date)
    }
}

/// The due date of a task, which may be a single point or a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DueRange {
    Both { start: DuePoint, end: DuePoint },
    StartOnly { start: DuePoint },
    EndOnly { end: DuePoint },
    Neither,
}

impl DueRange {
    pub fn from_parts(start: Option<DuePoint>, end: Option<DuePoint>) -> Self {
        match (start, end) {
            (Some(start), Some(end)) => DueRange::Both { start, end },
            (Some(start), None) => DueRange::StartOnly { start },
            (None, Some(end)) => DueRange::EndOnly { end },
            (None, None) => DueRange::Neither,
        }
    }

    pub fn start(&self) -> Option<DuePoint> {
        match self {
            DueRange::Both { start, .. } | DueRange::StartOnly { start } => Some(*start),
            DueRange::EndOnly { .. } | DueRange::Neither => None,
        }
    }

    pub fn end(&self) -> Option<DuePoint> {
        match self {
            DueRange::Both { end, .. } | DueRange::EndOnly { end } => Some(*end),
            DueRange::StartOnly { .. } | DueRange::Neither => None,
        }
    }

    /// The instant that drives urgency decisions: the end if present, else the start.
    pub fn effective(&self) -> Option<DuePoint> {
        self.end().or_else(|| self.start())
    }

    pub fn is_neither(&self) -> bool {
        matches!(self, DueRange::Neither)
    }
}

/// Reasons a record cannot become a `TaskRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("title is empty")]
    EmptyTitle,
    #[error("no due date")]
    MissingDue,
}

/// A normalized task, independent of the source it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    id: String,
    title: String,
    due: DueRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schedule_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workload: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memo: Option<String>,
    url: String,
    notify_window_days: u32,
}

impl TaskRecord {
    pub const DEFAULT_NOTIFY_WINDOW_DAYS: u32 = 3;

    /// Create a record. A blank title is rejected; an absent due range is
    /// allowed here so downstream stages can handle it explicitly.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        due: DueRange,
    ) -> Result<Self, RecordError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(RecordError::EmptyTitle);
        }
        Ok(Self {
            id: id.into(),
            title,
            due,
            priority: None,
            task_type: None,
            schedule_status: None,
            workload: None,
            memo: None,
            url: String::new(),
            notify_window_days: Self::DEFAULT_NOTIFY_WINDOW_DAYS,
        })
    }

    pub fn with_priority(mut self, priority: Option<Priority>) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = non_empty(task_type.into());
        self
    }

    pub fn with_schedule_status(mut self, status: impl Into<String>) -> Self {
        self.schedule_status = non_empty(status.into());
        self
    }

    pub fn with_workload(mut self, workload: f64) -> Self {
        self.workload = Some(workload);
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = non_empty(memo.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_notify_window_days(mut self, days: u32) -> Self {
        self.notify_window_days = days;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn due(&self) -> &DueRange {
        &self.due
    }

    pub fn effective_due(&self) -> Option<DuePoint> {
        self.due.effective()
    }

    pub fn priority(&self) -> Option<Priority> {
        self.priority
    }

    pub fn task_type(&self) -> Option<&str> {
        self.task_type.as_deref()
    }

    pub fn schedule_status(&self) -> Option<&str> {
        self.schedule_status.as_deref()
    }

    pub fn workload(&self) -> Option<f64> {
        self.workload
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn notify_window_days(&self) -> u32 {
        self.notify_window_days
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
