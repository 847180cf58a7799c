//! Presentation of the digest: due-date text, per-task detail lines, and the
//! ordered segments of the final message.
//!
//! Output here is plain content. Turning segments into a chat platform's
//! markup is left to the sink.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::config::FormatConfig;
use crate::error::{Error, Result};
use crate::task::{DuePoint, DueRange, TaskRecord};
use crate::urgency::{Bucket, UrgencyTier};

const DATE_FORMAT: &str = "%m/%d";
const TIME_FORMAT: &str = "%H:%M";
const MARKDOWN_SPECIALS: [char; 4] = ['*', '_', '~', '`'];

/// One task, ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedTask {
    pub title: String,
    pub url: String,
    pub due: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Due date and every present optional field, joined and truncated
    pub details: String,
}

/// A tier heading plus its rendered tasks, already ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub tier: UrgencyTier,
    pub title: String,
    pub tasks: Vec<RenderedTask>,
}

/// Ordered building blocks of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Segment {
    Header(String),
    Divider,
    SectionTitle(String),
    Task(RenderedTask),
    Footer(String),
}

/// Everything a sink needs to deliver one digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub segments: Vec<Segment>,
    /// Single-string rendition for clients that cannot show segments
    pub fallback_text: String,
}

/// Format one due point as `MM/DD`, adding `HH:MM` when it is not midnight.
pub fn format_point(point: DuePoint) -> String {
    if point.has_time() {
        format!(
            "{} {}",
            point.at().format(DATE_FORMAT),
            point.at().format(TIME_FORMAT)
        )
    } else {
        point.at().format(DATE_FORMAT).to_string()
    }
}

/// Format a task's due range for display.
pub fn format_due(task: &TaskRecord) -> Result<String> {
    match *task.due() {
        DueRange::StartOnly { start: point } | DueRange::EndOnly { end: point } => {
            Ok(format_point(point))
        }
        DueRange::Both { start, end } if start == end => Ok(format_point(end)),
        DueRange::Both { start, end } if start.date() == end.date() => {
            let date = end.at().format(DATE_FORMAT);
            let start_time = start.has_time().then(|| start.at().format(TIME_FORMAT));
            let end_time = end.has_time().then(|| end.at().format(TIME_FORMAT));
            Ok(match (start_time, end_time) {
                (Some(s), Some(e)) => format!("{date} ({s}~{e})"),
                (None, Some(e)) => format!("{date} (~{e})"),
                (Some(s), None) => format!("{date} ({s}~)"),
                (None, None) => date.to_string(),
            })
        }
        DueRange::Both { start, end } => {
            Ok(format!("{} ~ {}", format_point(start), format_point(end)))
        }
        DueRange::Neither => Err(Error::MissingDueDate {
            task_id: task.id().to_string(),
        }),
    }
}

/// Keep the first `max` characters and append `ellipsis` when text is longer.
pub fn truncate_chars(text: &str, max: usize, ellipsis: &str) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut kept: String = text.chars().take(max).collect();
    kept.push_str(ellipsis);
    kept
}

/// Shorten text so that it is at most `max` characters, ellipsis included.
pub fn truncate_to_fit(text: &str, max: usize, ellipsis: &str) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let room = max.saturating_sub(ellipsis.chars().count());
    truncate_chars(text, room, ellipsis)
}

/// Backslash-escape characters that markdown renderers treat as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if MARKDOWN_SPECIALS.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Render a task's detail line from the fields that are present.
pub fn render_task(task: &TaskRecord, config: &FormatConfig) -> Result<RenderedTask> {
    let due = format_due(task)?;

    let mut fields = vec![format!("*Due:* {due}")];
    if let Some(priority) = task.priority() {
        if config.priority_markers {
            fields.push(format!("*Priority:* {} {priority}", priority.marker()));
        } else {
            fields.push(format!("*Priority:* {priority}"));
        }
    }
    if let Some(task_type) = task.task_type() {
        fields.push(format!("*Type:* {task_type}"));
    }
    if let Some(status) = task.schedule_status() {
        fields.push(format!("*Status:* {status}"));
    }
    if let Some(workload) = task.workload().filter(|w| *w != 0.0) {
        fields.push(format!("*Workload:* {workload:.2}"));
    }
    if let Some(memo) = task.memo() {
        let mut memo = truncate_chars(memo, config.memo_max_chars, &config.ellipsis);
        if config.escape_markdown {
            memo = escape_markdown(&memo);
        }
        fields.push(format!("*Memo:* {memo}"));
    }

    let details = truncate_to_fit(
        &fields.join(&config.separator),
        config.detail_max_chars,
        &config.ellipsis,
    );

    Ok(RenderedTask {
        title: task.title().to_string(),
        url: task.url().to_string(),
        due,
        priority: task.priority().map(|priority| priority.as_str().to_string()),
        details,
    })
}

/// Render each ordered bucket; empty buckets produce no section.
///
/// A task without any due date aborts the whole build.
pub fn build_sections(buckets: &[Bucket], config: &FormatConfig) -> Result<Vec<Section>> {
    let mut sections = Vec::new();
    for bucket in buckets.iter().filter(|bucket| !bucket.tasks.is_empty()) {
        let tasks = bucket
            .tasks
            .iter()
            .map(|task| render_task(task, config))
            .collect::<Result<Vec<_>>>()?;
        sections.push(Section {
            tier: bucket.tier,
            title: format!("{} {}", bucket.tier.marker(), bucket.tier.label()),
            tasks,
        });
    }
    Ok(sections)
}

/// Lay sections out as message segments, most urgent first.
pub fn compose(
    sections: &[Section],
    generated_at: DateTime<FixedOffset>,
    config: &FormatConfig,
) -> Message {
    let mut ordered: Vec<&Section> = sections.iter().filter(|s| !s.tasks.is_empty()).collect();
    ordered.sort_by_key(|section| section.tier);

    let mut segments = vec![Segment::Header(config.header.clone())];
    for section in &ordered {
        segments.push(Segment::Divider);
        segments.push(Segment::SectionTitle(section.title.clone()));
        segments.extend(section.tasks.iter().cloned().map(Segment::Task));
    }
    segments.push(Segment::Divider);
    segments.push(Segment::Footer(footer_text(generated_at)));

    Message {
        segments,
        fallback_text: fallback_text(&ordered, generated_at, config),
    }
}

pub fn footer_text(generated_at: DateTime<FixedOffset>) -> String {
    format!("Generated at {}", generated_at.to_rfc2822())
}

/// Plain-text rendering for clients that cannot show rich blocks.
pub fn fallback_text(
    sections: &[&Section],
    generated_at: DateTime<FixedOffset>,
    config: &FormatConfig,
) -> String {
    let mut text = format!(
        "{} ({})\n",
        config.header,
        generated_at.format("%Y-%m-%d")
    );
    for section in sections {
        text.push_str(&format!("\n*{}*\n", section.tier.label()));
        for task in &section.tasks {
            text.push_str(&format!("- *{}* (Due: {}", task.title, task.due));
            if let Some(priority) = &task.priority {
                text.push_str(&format!(", Priority: {priority}"));
            }
            text.push_str(&format!(") <{}>\n", task.url));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;
    use chrono::{NaiveDate, NaiveDateTime, TimeZone};

    fn at(month: u32, day: u32, hour: u32, minute: u32) -> DuePoint {
        let naive: NaiveDateTime = NaiveDate::from_ymd_opt(2024, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("datetime");
        DuePoint::new(naive)
    }

    fn task_with(due: DueRange) -> TaskRecord {
        TaskRecord::new("t1", "Write report", due)
            .expect("task")
            .with_url("https://example.com/t1")
    }

    fn due_text(start: Option<DuePoint>, end: Option<DuePoint>) -> String {
        format_due(&task_with(DueRange::from_parts(start, end))).expect("due text")
    }

    #[test]
    fn single_point_dates() {
        assert_eq!(due_text(Some(at(1, 1, 0, 0)), None), "01/01");
        assert_eq!(due_text(None, Some(at(6, 10, 14, 30))), "06/10 14:30");
    }

    #[test]
    fn multi_day_range() {
        assert_eq!(due_text(Some(at(1, 1, 0, 0)), Some(at(1, 5, 0, 0))), "01/01 ~ 01/05");
        assert_eq!(
            due_text(Some(at(1, 1, 9, 0)), Some(at(1, 5, 0, 0))),
            "01/01 09:00 ~ 01/05"
        );
    }

    #[test]
    fn same_day_ranges() {
        assert_eq!(
            due_text(Some(at(6, 10, 9, 0)), Some(at(6, 10, 18, 15))),
            "06/10 (09:00~18:15)"
        );
        assert_eq!(
            due_text(Some(at(6, 10, 0, 0)), Some(at(6, 10, 18, 0))),
            "06/10 (~18:00)"
        );
        assert_eq!(
            due_text(Some(at(6, 10, 9, 0)), Some(at(6, 10, 0, 0))),
            "06/10 (09:00~)"
        );
        assert_eq!(due_text(Some(at(6, 10, 9, 0)), Some(at(6, 10, 9, 0))), "06/10 09:00");
    }

    #[test]
    fn neither_is_an_error() {
        let err = format_due(&task_with(DueRange::Neither)).expect_err("no due");
        match err {
            Error::MissingDueDate { task_id } => assert_eq!(task_id, "t1"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn section_build_aborts_on_missing_due() {
        let buckets = vec![
            Bucket {
                tier: UrgencyTier::DueToday,
                tasks: vec![task_with(DueRange::from_parts(Some(at(6, 10, 0, 0)), None))],
            },
            Bucket {
                tier: UrgencyTier::DueWithin(3),
                tasks: vec![
                    task_with(DueRange::from_parts(Some(at(6, 12, 0, 0)), None)),
                    TaskRecord::new("t9", "Orphan", DueRange::Neither).expect("task"),
                ],
            },
        ];
        let result = build_sections(&buckets, &FormatConfig::default());
        match result {
            Err(Error::MissingDueDate { task_id }) => assert_eq!(task_id, "t9"),
            other => panic!("expected missing due date, got {other:?}"),
        }
    }

    #[test]
    fn escapes_markdown_specials() {
        assert_eq!(escape_markdown("a*b_c~d`e"), "a\\*b\\_c\\~d\\`e");
        assert_eq!(escape_markdown("plain"), "plain");
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("あいうえお", 3, "..."), "あいう...");
        assert_eq!(truncate_chars("short", 10, "..."), "short");
        assert_eq!(truncate_to_fit("abcdefghij", 8, "..."), "abcde...");
        assert_eq!(truncate_to_fit("abcdefgh", 8, "..."), "abcdefgh");
    }

    #[test]
    fn details_follow_field_order_and_skip_absent() {
        let task = task_with(DueRange::EndOnly { end: at(6, 10, 0, 0) })
            .with_priority(Some(Priority::High))
            .with_schedule_status("Doing")
            .with_workload(0.0)
            .with_memo("check *all* items");
        let config = FormatConfig {
            escape_markdown: true,
            ..FormatConfig::default()
        };
        let rendered = render_task(&task, &config).expect("render");
        assert_eq!(
            rendered.details,
            "*Due:* 06/10 | *Priority:* 🔴 High | *Status:* Doing | *Memo:* check \\*all\\* items"
        );
        assert_eq!(rendered.title, "Write report");
        assert_eq!(rendered.url, "https://example.com/t1");
    }

    #[test]
    fn long_memo_is_cut_then_line_capped() {
        let memo = "m".repeat(2000);
        let task = task_with(DueRange::EndOnly { end: at(6, 10, 0, 0) })
            .with_type("Work")
            .with_memo(memo);
        let config = FormatConfig {
            memo_max_chars: 150,
            ..FormatConfig::default()
        };
        let rendered = render_task(&task, &config).expect("render");
        let expected_memo = format!("*Memo:* {}...", "m".repeat(150));
        assert!(rendered.details.ends_with(&expected_memo));

        let capped = FormatConfig {
            detail_max_chars: 100,
            ..FormatConfig::default()
        };
        let rendered = render_task(&task, &capped).expect("render");
        assert_eq!(rendered.details.chars().count(), 100);
        assert!(rendered.details.ends_with("..."));
    }

    #[test]
    fn compose_orders_sections_and_adds_footer() {
        let config = FormatConfig::default();
        let task = render_task(
            &task_with(DueRange::EndOnly { end: at(6, 10, 0, 0) })
                .with_priority(Some(Priority::Medium)),
            &config,
        )
        .expect("render");
        let sections = vec![
            Section {
                tier: UrgencyTier::DueWithin(3),
                title: "⚠️ Due Within 3 Days".to_string(),
                tasks: vec![task.clone()],
            },
            Section {
                tier: UrgencyTier::DueToday,
                title: "🚨 Due Today".to_string(),
                tasks: vec![task.clone()],
            },
            Section {
                tier: UrgencyTier::DueWithin(7),
                title: "🗓️ Due Within 7 Days".to_string(),
                tasks: Vec::new(),
            },
        ];
        let generated_at = FixedOffset::east_opt(9 * 3600)
            .expect("offset")
            .with_ymd_and_hms(2024, 6, 10, 9, 0, 0)
            .single()
            .expect("time");

        let message = compose(&sections, generated_at, &config);
        let titles: Vec<&str> = message
            .segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::SectionTitle(title) => Some(title.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(titles, vec!["🚨 Due Today", "⚠️ Due Within 3 Days"]);
        assert_eq!(
            message.segments.last(),
            Some(&Segment::Footer(
                "Generated at Mon, 10 Jun 2024 09:00:00 +0900".to_string()
            ))
        );
        assert_eq!(
            message.fallback_text,
            "🔔 Notion Task Reminders (2024-06-10)\n\
             \n*Due Today*\n\
             - *Write report* (Due: 06/10, Priority: Medium) <https://example.com/t1>\n\
             \n*Due Within 3 Days*\n\
             - *Write report* (Due: 06/10, Priority: Medium) <https://example.com/t1>\n"
        );
    }
}
