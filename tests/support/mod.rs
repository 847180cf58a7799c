#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use serde_json::{json, Value};
use task_digest::digest::Digest;
use task_digest::task::{DuePoint, DueRange, Priority, TaskRecord};
use tempfile::TempDir;

pub fn jst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("offset")
}

pub fn jst_now(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    jst()
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid instant")
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DuePoint {
    DuePoint::new(
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid datetime"),
    )
}

/// A task due on a date (no time of day).
pub fn date_task(id: &str, (year, month, day): (i32, u32, u32), priority: Option<Priority>) -> TaskRecord {
    TaskRecord::new(
        id,
        format!("Task {id}"),
        DueRange::EndOnly {
            end: DuePoint::on(NaiveDate::from_ymd_opt(year, month, day).expect("date")),
        },
    )
    .expect("task")
    .with_priority(priority)
    .with_url(format!("https://www.notion.so/{id}"))
}

/// Task ids per rendered section, recovered from the task links.
pub fn section_ids(digest: &Digest) -> Vec<Vec<String>> {
    digest
        .sections
        .iter()
        .map(|section| {
            section
                .tasks
                .iter()
                .map(|task| {
                    task.url
                        .rsplit('/')
                        .next()
                        .unwrap_or_default()
                        .to_string()
                })
                .collect()
        })
        .collect()
}

/// A database page object as returned by the query endpoint.
pub fn notion_page(id: &str, title: &str, start: &str, end: Option<&str>, priority: Option<&str>) -> Value {
    json!({
        "object": "page",
        "id": id,
        "url": format!("https://www.notion.so/{id}"),
        "properties": {
            "Name": { "type": "title", "title": [{ "plain_text": title }] },
            "Due": { "type": "date", "date": { "start": start, "end": end } },
            "Priority": {
                "type": "select",
                "select": priority.map(|name| json!({ "name": name }))
            },
            "Schedule Status": { "type": "status", "status": { "name": "ToDo" } }
        }
    })
}

pub fn query_response(pages: Vec<Value>, next_cursor: Option<&str>) -> String {
    json!({
        "object": "list",
        "results": pages,
        "next_cursor": next_cursor,
        "has_more": next_cursor.is_some()
    })
    .to_string()
}

pub struct ConfigDir {
    dir: TempDir,
}

impl ConfigDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents.trim()).expect("write config");
        path
    }
}
