//! Display ordering of tasks within a tier.

use std::cmp::Ordering;

use crate::task::{Priority, TaskRecord};

/// Rank of a priority; lower sorts first and unset sorts last.
pub fn priority_rank(priority: Option<Priority>) -> usize {
    match priority {
        Some(priority) => {
            Priority::ORDER
                .iter()
                .position(|entry| *entry == priority)
                .unwrap_or(Priority::ORDER.len())
                + 1
        }
        None => Priority::ORDER.len() + 1,
    }
}

/// Compare by priority, then effective due date; a missing due date sorts last.
pub fn compare_tasks(left: &TaskRecord, right: &TaskRecord) -> Ordering {
    let left_priority = priority_rank(left.priority());
    let right_priority = priority_rank(right.priority());
    left_priority
        .cmp(&right_priority)
        .then_with(|| match (left.effective_due(), right.effective_due()) {
            (Some(left_due), Some(right_due)) => left_due.cmp(&right_due),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Stable sort; ties keep their input order.
pub fn sort_tasks(tasks: &mut [TaskRecord]) {
    tasks.sort_by(compare_tasks);
}
