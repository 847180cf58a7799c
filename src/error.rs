//! Error types for task-digest
//!
//! Exit codes:
//! - 0: Success (including "nothing to notify")
//! - 2: Configuration error (missing credentials, bad config file); clap
//!   usage errors exit with 2 as well
//! - 4: Operation failed (fetch, delivery, broken record invariant)

use thiserror::Error;

/// Exit codes for the task-digest CLI
pub mod exit_codes {
    pub const CONFIG_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for task-digest operations
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (exit code 2)
    #[error("Missing required settings: {}", .0.join(", "))]
    MissingSetting(Vec<&'static str>),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // Operation failures (exit code 4)
    #[error("Task source query failed: {0}")]
    SourceFetch(String),

    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Task {task_id} has neither a start nor an end due date")]
    MissingDueDate { task_id: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::MissingSetting(_)
            | Error::InvalidConfig(_)
            | Error::TomlParse(_) => exit_codes::CONFIG_ERROR,

            Error::SourceFetch(_)
            | Error::Delivery(_)
            | Error::MissingDueDate { .. }
            | Error::Http(_)
            | Error::Io(_)
            | Error::Json(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Short machine-readable classification, used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingSetting(_)
            | Error::InvalidConfig(_)
            | Error::TomlParse(_) => "config_error",
            Error::SourceFetch(_) | Error::Http(_) => "fetch_failed",
            Error::Delivery(_) => "delivery_failed",
            Error::MissingDueDate { .. } => "invariant_violated",
            Error::Io(_) | Error::Json(_) => "operation_failed",
        }
    }

    /// Structured details for JSON output, when the variant carries any.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::MissingSetting(names) => Some(serde_json::json!({ "missing": names })),
            Error::MissingDueDate { task_id } => Some(serde_json::json!({ "task_id": task_id })),
            Error::InvalidConfig(message) => Some(serde_json::json!({ "message": message })),
            _ => None,
        }
    }
}

/// Result type alias for task-digest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            kind: err.kind(),
            details: err.details(),
        }
    }
}
