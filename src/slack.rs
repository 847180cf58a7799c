//! Slack delivery via `chat.postMessage`.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::SinkConfig;
use crate::error::{Error, Result};
use crate::format::{truncate_to_fit, Message, RenderedTask, Segment};
use crate::sink::NotificationSink;

/// Slack rejects section blocks whose text is longer than this.
pub const SECTION_TEXT_LIMIT: usize = 3000;

/// Slack Web API client bound to one bot token.
pub struct SlackClient {
    api_base: String,
    token: String,
    http: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl SlackClient {
    pub fn new(token: impl Into<String>, config: &SinkConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: token.into(),
            http,
        })
    }

    /// Request body for `chat.postMessage`.
    pub fn payload(channel: &str, message: &Message) -> Value {
        json!({
            "channel": channel,
            "text": message.fallback_text,
            "blocks": blocks(message),
        })
    }
}

/// Block Kit rendering of a message.
pub fn blocks(message: &Message) -> Vec<Value> {
    message
        .segments
        .iter()
        .map(|segment| match segment {
            Segment::Header(text) => json!({
                "type": "header",
                "text": { "type": "plain_text", "text": text, "emoji": true }
            }),
            Segment::Divider => json!({ "type": "divider" }),
            Segment::SectionTitle(title) => mrkdwn_section(format!("*{title}*")),
            Segment::Task(task) => mrkdwn_section(task_text(task)),
            Segment::Footer(text) => json!({
                "type": "context",
                "elements": [{ "type": "mrkdwn", "text": text }]
            }),
        })
        .collect()
}

fn mrkdwn_section(text: String) -> Value {
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": truncate_to_fit(&text, SECTION_TEXT_LIMIT, "...") }
    })
}

fn task_text(task: &RenderedTask) -> String {
    let title = escape_control(&task.title);
    let link = if task.url.is_empty() {
        format!("*{title}*")
    } else {
        format!("*<{}|{title}>*", escape_control(&task.url))
    };
    format!("{link}\n{}", task.details)
}

/// Escape the characters Slack treats as control sequences.
pub fn escape_control(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl NotificationSink for SlackClient {
    fn post(&self, channel: &str, message: &Message) -> Result<String> {
        let url = format!("{}/chat.postMessage", self.api_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&Self::payload(channel, message))
            .send()
            .map_err(|err| Error::Delivery(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Delivery(format!("status {status}: {body}")));
        }

        let body: PostMessageResponse = response
            .json()
            .map_err(|err| Error::Delivery(format!("unreadable response: {err}")))?;
        if !body.ok {
            return Err(Error::Delivery(
                body.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }

        let ts = body.ts.unwrap_or_default();
        tracing::info!(channel, ts = %ts, "posted digest");
        Ok(ts)
    }
}
