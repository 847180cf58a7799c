//! task-digest - Deadline Reminder Library
//!
//! This library provides the core of the task-digest CLI: it turns a set of
//! task records into one urgency-grouped digest and delivers it.
//!
//! # Core Concepts
//!
//! - **Urgency tiers**: Overdue, Due Today and Due Within N Days buckets
//! - **Ordering**: priority first, then effective due date, stable on ties
//! - **Digest**: header, one section per non-empty tier, footer
//! - **Ports**: `TaskSource` and `NotificationSink` keep the core free of I/O
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `task-digest.toml` and credentials
//! - `digest`: End-to-end run orchestration
//! - `error`: Error types, exit codes and result aliases
//! - `format`: Due-date rendering, truncation and message composition
//! - `notion`: Notion database implementation of `TaskSource`
//! - `ordering`: In-tier task ordering
//! - `output`: Human and JSON command output
//! - `sink`: Notification sink port
//! - `slack`: Slack implementation of `NotificationSink`
//! - `source`: Task source port and record validation
//! - `task`: Task record model
//! - `urgency`: Tier classification and filtering

pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod format;
pub mod notion;
pub mod ordering;
pub mod output;
pub mod sink;
pub mod slack;
pub mod source;
pub mod task;
pub mod urgency;

pub use error::{Error, Result};
