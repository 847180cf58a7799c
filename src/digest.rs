//! One notification run: fetch, classify, order, format, deliver.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::config::Config;
use crate::error::Result;
use crate::format::{self, Message, Section};
use crate::ordering;
use crate::sink::NotificationSink;
use crate::source::{self, MappingRules, QueryFilter, TaskSource};
use crate::task::TaskRecord;
use crate::urgency::{self, RunMode, TierPolicy};

/// A composed digest ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digest {
    pub mode: RunMode,
    pub retained: usize,
    pub excluded: usize,
    pub sections: Vec<Section>,
    pub message: Message,
}

/// Per-invocation options from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Lookahead for the source query, clamped to the configured maximum
    pub days: u32,
    /// Force urgent mode regardless of the clock
    pub urgent: bool,
}

/// Where a delivered digest goes.
pub struct Delivery<'a> {
    pub sink: &'a dyn NotificationSink,
    pub channel: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub fetched: usize,
    /// Records dropped because they failed validation
    pub skipped: usize,
    pub digest: Option<Digest>,
    /// Message id returned by the sink, when one was posted
    pub delivered: Option<String>,
}

/// Build the digest for `tasks` as of `now`; `None` when nothing is retained.
pub fn build_digest(
    tasks: Vec<TaskRecord>,
    now: DateTime<FixedOffset>,
    config: &Config,
    mode: RunMode,
) -> Result<Option<Digest>> {
    let policy = TierPolicy::from(&config.tiers);
    let mut partition = urgency::partition(tasks, now.naive_local(), &policy, mode);
    if partition.is_empty() {
        tracing::info!(excluded = partition.excluded, "No tasks to notify");
        return Ok(None);
    }

    for bucket in &mut partition.buckets {
        ordering::sort_tasks(&mut bucket.tasks);
    }

    let sections = format::build_sections(&partition.buckets, &config.format)?;
    let message = format::compose(&sections, now, &config.format);
    Ok(Some(Digest {
        mode,
        retained: partition.retained(),
        excluded: partition.excluded,
        sections,
        message,
    }))
}

/// Fetch, build and (when `delivery` is given) post one digest.
pub fn run(
    source: &dyn TaskSource,
    delivery: Option<Delivery<'_>>,
    config: &Config,
    now: DateTime<FixedOffset>,
    options: RunOptions,
) -> Result<RunReport> {
    let mode = RunMode::resolve(now.naive_local(), &config.tiers.urgent_hours, options.urgent);
    tracing::info!(?mode, days = options.days, "starting run");

    let filter = QueryFilter::for_run(now, options.days, &config.source);
    let rules = MappingRules::from_config(&config.source, *now.offset());
    let fetched = source::fetch_all(source, &filter, &rules)?;
    let skipped = fetched.skipped;
    let tasks = fetched.tasks;
    let fetched = tasks.len();

    let digest = build_digest(tasks, now, config, mode)?;
    let delivered = match (&digest, delivery) {
        (Some(digest), Some(delivery)) => {
            tracing::info!(
                retained = digest.retained,
                channel = delivery.channel,
                "sending digest"
            );
            Some(delivery.sink.post(delivery.channel, &digest.message)?)
        }
        _ => None,
    };

    Ok(RunReport {
        mode,
        fetched,
        skipped,
        digest,
        delivered,
    })
}
