//! Urgency classification.
//!
//! Every run anchors its tiers on the local calendar day of `now`:
//!
//! - `Overdue`: effective due date before today's midnight (only when enabled)
//! - `DueToday`: today's midnight <= due < tomorrow's midnight
//! - `DueWithin(n)`: tomorrow's midnight <= due <= today's midnight + n days,
//!   for the smallest configured `n` that fits
//!
//! A task lands in at most one tier. Tasks that fit none are dropped with a
//! debug diagnostic, never an error.

use std::fmt;

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use crate::config::TiersConfig;
use crate::task::{DuePoint, TaskRecord};

/// Urgency tiers; the derived order is the display order, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "tier", content = "days", rename_all = "snake_case")]
pub enum UrgencyTier {
    Overdue,
    DueToday,
    DueWithin(u32),
}

impl UrgencyTier {
    pub fn label(&self) -> String {
        match self {
            UrgencyTier::Overdue => "Overdue".to_string(),
            UrgencyTier::DueToday => "Due Today".to_string(),
            UrgencyTier::DueWithin(days) => format!("Due Within {days} Days"),
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            UrgencyTier::Overdue => "❗️",
            UrgencyTier::DueToday => "🚨",
            UrgencyTier::DueWithin(days) if *days <= 3 => "⚠️",
            UrgencyTier::DueWithin(_) => "🗓️",
        }
    }
}

impl fmt::Display for UrgencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Why a task was left out of every tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusion {
    NoDueDate,
    Overdue,
    BeyondWindows,
    OutsideNotifyWindow,
    NotDueToday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Tier(UrgencyTier),
    Excluded(Exclusion),
}

/// Whether a run reports every tier or only tasks due today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Full,
    Urgent,
}

impl RunMode {
    /// A run is urgent when forced, or when it starts at one of the urgent hours.
    pub fn resolve(now: NaiveDateTime, urgent_hours: &[u32], forced: bool) -> Self {
        if forced || urgent_hours.contains(&now.hour()) {
            RunMode::Urgent
        } else {
            RunMode::Full
        }
    }
}

/// Tier boundaries and optional filters, as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierPolicy {
    pub overdue: bool,
    pub windows: Vec<u32>,
    pub per_task_window: bool,
}

impl Default for TierPolicy {
    fn default() -> Self {
        TierPolicy::from(&TiersConfig::default())
    }
}

impl From<&TiersConfig> for TierPolicy {
    fn from(config: &TiersConfig) -> Self {
        let mut windows = config.windows.clone();
        windows.sort_unstable();
        windows.dedup();
        Self {
            overdue: config.overdue,
            windows,
            per_task_window: config.per_task_window,
        }
    }
}

impl TierPolicy {
    /// Tiers this policy can produce, in display order.
    pub fn tiers(&self) -> Vec<UrgencyTier> {
        let mut tiers = Vec::with_capacity(self.windows.len() + 2);
        if self.overdue {
            tiers.push(UrgencyTier::Overdue);
        }
        tiers.push(UrgencyTier::DueToday);
        tiers.extend(self.windows.iter().map(|&days| UrgencyTier::DueWithin(days)));
        tiers
    }
}

/// Midnight of `now`'s calendar day.
pub fn today_start(now: NaiveDateTime) -> NaiveDateTime {
    now.date().and_time(NaiveTime::MIN)
}

/// Whole calendar days from today until the due date; negative when overdue.
pub fn days_remaining(due: DuePoint, now: NaiveDateTime) -> i64 {
    (due.date() - now.date()).num_days()
}

/// Place one task, ignoring the run mode.
pub fn classify(task: &TaskRecord, now: NaiveDateTime, policy: &TierPolicy) -> Classification {
    let Some(due) = task.effective_due() else {
        return Classification::Excluded(Exclusion::NoDueDate);
    };

    let start = today_start(now);
    let end = start + Duration::days(1);
    let at = due.at();

    let tier = if at < start {
        if !policy.overdue {
            return Classification::Excluded(Exclusion::Overdue);
        }
        UrgencyTier::Overdue
    } else if at < end {
        UrgencyTier::DueToday
    } else {
        match policy
            .windows
            .iter()
            .find(|&&days| at <= start + Duration::days(i64::from(days)))
        {
            Some(&days) => UrgencyTier::DueWithin(days),
            None => return Classification::Excluded(Exclusion::BeyondWindows),
        }
    };

    if policy.per_task_window
        && days_remaining(due, now) > i64::from(task.notify_window_days())
    {
        return Classification::Excluded(Exclusion::OutsideNotifyWindow);
    }

    Classification::Tier(tier)
}

/// Tasks that share a tier, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub tier: UrgencyTier,
    pub tasks: Vec<TaskRecord>,
}

/// Result of splitting one run's tasks into tiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    /// One bucket per tier the policy can produce, in display order
    pub buckets: Vec<Bucket>,
    /// Number of tasks that fit no tier
    pub excluded: usize,
}

impl Partition {
    pub fn retained(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.tasks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.retained() == 0
    }

    pub fn bucket(&self, tier: UrgencyTier) -> Option<&Bucket> {
        self.buckets.iter().find(|bucket| bucket.tier == tier)
    }
}

/// Split tasks into tier buckets for the run at `now`.
pub fn partition(
    tasks: Vec<TaskRecord>,
    now: NaiveDateTime,
    policy: &TierPolicy,
    mode: RunMode,
) -> Partition {
    let mut buckets: Vec<Bucket> = policy
        .tiers()
        .into_iter()
        .map(|tier| Bucket {
            tier,
            tasks: Vec::new(),
        })
        .collect();
    let mut excluded = 0;

    for task in tasks {
        let placement = match classify(&task, now, policy) {
            Classification::Tier(tier)
                if mode == RunMode::Urgent && tier != UrgencyTier::DueToday =>
            {
                Classification::Excluded(Exclusion::NotDueToday)
            }
            other => other,
        };

        match placement {
            Classification::Tier(tier) => {
                if let Some(bucket) = buckets.iter_mut().find(|bucket| bucket.tier == tier) {
                    bucket.tasks.push(task);
                }
            }
            Classification::Excluded(reason) => {
                if reason == Exclusion::NoDueDate {
                    tracing::debug!(task_id = task.id(), "task has no effective due date; skipped");
                } else {
                    tracing::debug!(task_id = task.id(), ?reason, "task outside every tier");
                }
                excluded += 1;
            }
        }
    }

    Partition { buckets, excluded }
}
