//! Configuration loading and management
//!
//! Tunables live in an optional `task-digest.toml`; credentials always come
//! from the environment (or the matching CLI flags).

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Local, Offset};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_FILE: &str = "task-digest.toml";

pub const NOTION_TOKEN_ENV: &str = "NOTION_TOKEN";
pub const NOTION_DB_ID_ENV: &str = "NOTION_DB_ID";
pub const SLACK_TOKEN_ENV: &str = "SLACK_BOT_TOKEN";
pub const SLACK_CHANNEL_ENV: &str = "SLACK_CHANNEL_ID";

/// Upper bound for any configured span of days.
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// UTC offset used for calendar-day math (e.g. "+09:00"); local offset when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// Urgency tiers
    #[serde(default)]
    pub tiers: TiersConfig,

    /// Message formatting
    #[serde(default)]
    pub format: FormatConfig,

    /// Task database query
    #[serde(default)]
    pub source: SourceConfig,

    /// Chat delivery
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Urgency tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TiersConfig {
    /// Surface tasks whose due date already passed
    #[serde(default)]
    pub overdue: bool,

    /// Upper bounds, in days from today, of the "due within" tiers
    #[serde(default = "default_windows")]
    pub windows: Vec<u32>,

    /// Honour each task's own notification window
    #[serde(default)]
    pub per_task_window: bool,

    /// Local hours at which a run only reports tasks due today
    #[serde(default)]
    pub urgent_hours: Vec<u32>,
}

fn default_windows() -> Vec<u32> {
    vec![3]
}

impl Default for TiersConfig {
    fn default() -> Self {
        Self {
            overdue: false,
            windows: default_windows(),
            per_task_window: false,
            urgent_hours: Vec::new(),
        }
    }
}

/// Formatting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Memo characters kept before the ellipsis
    #[serde(default = "default_memo_max_chars")]
    pub memo_max_chars: usize,

    /// Maximum characters of a task's detail line, ellipsis included
    #[serde(default = "default_detail_max_chars")]
    pub detail_max_chars: usize,

    /// Backslash-escape markdown characters in memos
    #[serde(default)]
    pub escape_markdown: bool,

    /// Prefix priorities with a colored marker
    #[serde(default = "default_true")]
    pub priority_markers: bool,

    /// Separator between detail fields
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Marker appended to truncated text
    #[serde(default = "default_ellipsis")]
    pub ellipsis: String,

    /// Message header text
    #[serde(default = "default_header")]
    pub header: String,
}

fn default_memo_max_chars() -> usize {
    1000
}

fn default_detail_max_chars() -> usize {
    2900
}

fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    " | ".to_string()
}

fn default_ellipsis() -> String {
    "...".to_string()
}

fn default_header() -> String {
    "🔔 Notion Task Reminders".to_string()
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            memo_max_chars: default_memo_max_chars(),
            detail_max_chars: default_detail_max_chars(),
            escape_markdown: false,
            priority_markers: true,
            separator: default_separator(),
            ellipsis: default_ellipsis(),
            header: default_header(),
        }
    }
}

/// Task database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// API base URL
    #[serde(default = "default_notion_api_base")]
    pub api_base: String,

    /// Value of the `Notion-Version` header
    #[serde(default = "default_notion_version")]
    pub notion_version: String,

    /// Records requested per page (1..=100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Upper clamp for the `--days` lookahead
    #[serde(default = "default_max_lookahead_days")]
    pub max_lookahead_days: u32,

    /// Schedule statuses that count as still open
    #[serde(default = "default_statuses")]
    pub statuses: Vec<String>,

    /// Notification window used when a task does not set one
    #[serde(default = "default_notify_days")]
    pub default_notify_days: u32,

    /// Notification windows a task may choose from
    #[serde(default = "default_allowed_notify_days")]
    pub allowed_notify_days: Vec<u32>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Property names in the database
    #[serde(default)]
    pub properties: PropertyNames,
}

fn default_notion_api_base() -> String {
    "https://api.notion.com/v1".to_string()
}

fn default_notion_version() -> String {
    "2022-06-28".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_max_lookahead_days() -> u32 {
    3
}

fn default_statuses() -> Vec<String> {
    [
        "CannotDo",
        "Next",
        "Want",
        "ToDo",
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
        "Doing",
        "iPhone Task",
    ]
    .iter()
    .map(|status| status.to_string())
    .collect()
}

fn default_notify_days() -> u32 {
    3
}

fn default_allowed_notify_days() -> Vec<u32> {
    vec![1, 3, 7]
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base: default_notion_api_base(),
            notion_version: default_notion_version(),
            page_size: default_page_size(),
            max_lookahead_days: default_max_lookahead_days(),
            statuses: default_statuses(),
            default_notify_days: default_notify_days(),
            allowed_notify_days: default_allowed_notify_days(),
            timeout_secs: default_timeout_secs(),
            properties: PropertyNames::default(),
        }
    }
}

/// Database property names mapped onto task fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyNames {
    #[serde(default = "default_title_prop")]
    pub title: String,
    #[serde(default = "default_due_prop")]
    pub due: String,
    #[serde(default = "default_priority_prop")]
    pub priority: String,
    #[serde(default = "default_type_prop", rename = "type")]
    pub task_type: String,
    #[serde(default = "default_schedule_status_prop")]
    pub schedule_status: String,
    #[serde(default = "default_workload_prop")]
    pub workload: String,
    #[serde(default = "default_memo_prop")]
    pub memo: String,
    #[serde(default = "default_notify_days_prop")]
    pub notify_days: String,
}

fn default_title_prop() -> String {
    "Name".to_string()
}

fn default_due_prop() -> String {
    "Due".to_string()
}

fn default_priority_prop() -> String {
    "Priority".to_string()
}

fn default_type_prop() -> String {
    "Type".to_string()
}

fn default_schedule_status_prop() -> String {
    "Schedule Status".to_string()
}

fn default_workload_prop() -> String {
    "Workload".to_string()
}

fn default_memo_prop() -> String {
    "Memo".to_string()
}

fn default_notify_days_prop() -> String {
    "通知日数".to_string()
}

impl Default for PropertyNames {
    fn default() -> Self {
        Self {
            title: default_title_prop(),
            due: default_due_prop(),
            priority: default_priority_prop(),
            task_type: default_type_prop(),
            schedule_status: default_schedule_status_prop(),
            workload: default_workload_prop(),
            memo: default_memo_prop(),
            notify_days: default_notify_days_prop(),
        }
    }
}

/// Chat delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// API base URL
    #[serde(default = "default_slack_api_base")]
    pub api_base: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_slack_api_base() -> String {
    "https://slack.com/api".to_string()
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            api_base: default_slack_api_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the configuration for a run.
    ///
    /// An explicit path must exist. Without one, `task-digest.toml` in `dir`
    /// is used when present, otherwise defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::InvalidConfig(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            tracing::debug!(path = %path.display(), "loading config");
            return Self::load(path);
        }

        let candidate: PathBuf = dir.join(DEFAULT_CONFIG_FILE);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "loading config");
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// UTC offset used to turn instants into local calendar dates.
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        match self.timezone.as_deref() {
            Some(raw) => parse_utc_offset(raw),
            None => Ok(Local::now().offset().fix()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(raw) = self.timezone.as_deref() {
            parse_utc_offset(raw)?;
        }
        self.tiers.validate()?;
        self.format.validate()?;
        self.source.validate()?;
        self.sink.validate()?;
        if let Some(&widest) = self.tiers.windows.iter().max() {
            if widest > self.source.max_lookahead_days {
                return Err(Error::InvalidConfig(format!(
                    "tiers.windows: {widest}-day tier is beyond source.max_lookahead_days ({})",
                    self.source.max_lookahead_days
                )));
            }
        }
        Ok(())
    }
}

impl TiersConfig {
    fn validate(&self) -> Result<()> {
        let mut previous = 1;
        for &window in &self.windows {
            if window <= previous {
                return Err(Error::InvalidConfig(
                    "tiers.windows must be strictly increasing and greater than 1".to_string(),
                ));
            }
            if window > MAX_WINDOW_DAYS {
                return Err(Error::InvalidConfig(format!(
                    "tiers.windows: {window} exceeds {MAX_WINDOW_DAYS} days"
                )));
            }
            previous = window;
        }
        if let Some(hour) = self.urgent_hours.iter().find(|&&hour| hour > 23) {
            return Err(Error::InvalidConfig(format!(
                "tiers.urgent_hours: {hour} is not an hour of the day"
            )));
        }
        Ok(())
    }
}

impl FormatConfig {
    fn validate(&self) -> Result<()> {
        if self.memo_max_chars == 0 {
            return Err(Error::InvalidConfig(
                "format.memo_max_chars must be > 0".to_string(),
            ));
        }
        if self.ellipsis.chars().count() >= self.detail_max_chars {
            return Err(Error::InvalidConfig(
                "format.detail_max_chars must be longer than format.ellipsis".to_string(),
            ));
        }
        Ok(())
    }
}

impl SourceConfig {
    fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "source.api_base cannot be empty".to_string(),
            ));
        }
        if self.page_size == 0 || self.page_size > 100 {
            return Err(Error::InvalidConfig(
                "source.page_size must be between 1 and 100".to_string(),
            ));
        }
        if self.max_lookahead_days > MAX_WINDOW_DAYS {
            return Err(Error::InvalidConfig(format!(
                "source.max_lookahead_days exceeds {MAX_WINDOW_DAYS} days"
            )));
        }
        if self.statuses.is_empty() {
            return Err(Error::InvalidConfig(
                "source.statuses cannot be empty".to_string(),
            ));
        }
        if self.statuses.iter().any(|status| status.trim().is_empty()) {
            return Err(Error::InvalidConfig(
                "source.statuses cannot include empty entries".to_string(),
            ));
        }
        if self.allowed_notify_days.is_empty() {
            return Err(Error::InvalidConfig(
                "source.allowed_notify_days cannot be empty".to_string(),
            ));
        }
        if !self.allowed_notify_days.contains(&self.default_notify_days) {
            return Err(Error::InvalidConfig(format!(
                "source.default_notify_days {} not in source.allowed_notify_days",
                self.default_notify_days
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "source.timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl SinkConfig {
    fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "sink.api_base cannot be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "sink.timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse "+09:00", "-0530", "Z" or "UTC" into a fixed offset.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let trimmed = raw.trim();
    let invalid = || Error::InvalidConfig(format!("timezone: invalid UTC offset '{raw}'"));

    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }
    trimmed.parse::<FixedOffset>().map_err(|_| invalid())
}

/// API credentials and the delivery target, all required for a full run.
#[derive(Clone)]
pub struct Credentials {
    pub notion_token: String,
    pub notion_db_id: String,
    pub slack_token: String,
    pub slack_channel: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("notion_token", &"<redacted>")
            .field("notion_db_id", &self.notion_db_id)
            .field("slack_token", &"<redacted>")
            .field("slack_channel", &self.slack_channel)
            .finish()
    }
}

/// Credentials for the task database only (enough for a preview).
#[derive(Clone)]
pub struct SourceCredentials {
    pub token: String,
    pub database_id: String,
}

impl Credentials {
    /// Collect every setting; all missing names are reported at once.
    pub fn resolve(
        notion_token: Option<String>,
        notion_db_id: Option<String>,
        slack_token: Option<String>,
        slack_channel: Option<String>,
    ) -> Result<Self> {
        let mut missing = Vec::new();
        let notion_token = require(notion_token, NOTION_TOKEN_ENV, &mut missing);
        let notion_db_id = require(notion_db_id, NOTION_DB_ID_ENV, &mut missing);
        let slack_token = require(slack_token, SLACK_TOKEN_ENV, &mut missing);
        let slack_channel = require(slack_channel, SLACK_CHANNEL_ENV, &mut missing);
        if !missing.is_empty() {
            return Err(Error::MissingSetting(missing));
        }
        Ok(Self {
            notion_token,
            notion_db_id,
            slack_token,
            slack_channel,
        })
    }

    pub fn source(&self) -> SourceCredentials {
        SourceCredentials {
            token: self.notion_token.clone(),
            database_id: self.notion_db_id.clone(),
        }
    }
}

impl SourceCredentials {
    pub fn resolve(token: Option<String>, database_id: Option<String>) -> Result<Self> {
        let mut missing = Vec::new();
        let token = require(token, NOTION_TOKEN_ENV, &mut missing);
        let database_id = require(database_id, NOTION_DB_ID_ENV, &mut missing);
        if !missing.is_empty() {
            return Err(Error::MissingSetting(missing));
        }
        Ok(Self { token, database_id })
    }
}

fn require(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(value) => value,
        None => {
            missing.push(name);
            String::new()
        }
    }
}
