//! `send` and `preview` command implementation

use std::path::PathBuf;

use chrono::Utc;

use crate::cli::{CredentialArgs, WindowArgs};
use crate::config::{Config, Credentials, SourceCredentials};
use crate::digest::{self, Delivery, RunOptions, RunReport};
use crate::error::Result;
use crate::notion::NotionClient;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::slack::SlackClient;

pub struct SendOptions {
    pub config: Option<PathBuf>,
    pub credentials: CredentialArgs,
    pub window: WindowArgs,
    /// Post the digest; `false` for a preview
    pub deliver: bool,
    pub output: OutputOptions,
}

pub fn run(opts: SendOptions) -> Result<()> {
    let config = Config::discover(opts.config.as_deref(), &std::env::current_dir()?)?;
    let offset = config.utc_offset()?;
    let now = Utc::now().with_timezone(&offset);
    let run_options = RunOptions {
        days: opts.window.days,
        urgent: opts.window.urgent,
    };
    let creds = opts.credentials;

    let report = if opts.deliver {
        let credentials = Credentials::resolve(
            creds.notion_token,
            creds.notion_db_id,
            creds.slack_token,
            creds.slack_channel,
        )?;
        let source = NotionClient::new(&credentials.source(), &config.source)?;
        let sink = SlackClient::new(credentials.slack_token.clone(), &config.sink)?;
        digest::run(
            &source,
            Some(Delivery {
                sink: &sink,
                channel: &credentials.slack_channel,
            }),
            &config,
            now,
            run_options,
        )?
    } else {
        let credentials = SourceCredentials::resolve(creds.notion_token, creds.notion_db_id)?;
        let source = NotionClient::new(&credentials, &config.source)?;
        digest::run(&source, None, &config, now, run_options)?
    };

    let command = if opts.deliver { "send" } else { "preview" };
    let human = human_output(&report, opts.deliver);
    emit_success(opts.output, command, &report, Some(&human))
}

fn human_output(report: &RunReport, deliver: bool) -> HumanOutput {
    let Some(digest) = &report.digest else {
        let mut human = HumanOutput::new("No tasks to notify");
        human.push_summary("fetched", report.fetched.to_string());
        push_skipped(&mut human, report.skipped);
        return human;
    };

    let header = if deliver { "Digest sent" } else { "Digest preview" };
    let mut human = HumanOutput::new(header);
    human.push_summary("mode", format!("{:?}", report.mode).to_lowercase());
    human.push_summary("fetched", report.fetched.to_string());
    human.push_summary("notified", digest.retained.to_string());
    if let Some(ts) = &report.delivered {
        human.push_summary("message", ts.clone());
    }
    if !deliver {
        human.set_body(digest.message.fallback_text.clone());
    }
    push_skipped(&mut human, report.skipped);
    if digest.excluded > 0 {
        human.push_warning(format!(
            "{} fetched task(s) fell outside the notified tiers",
            digest.excluded
        ));
    }
    human
}

fn push_skipped(human: &mut HumanOutput, skipped: usize) {
    if skipped > 0 {
        human.push_warning(format!(
            "{skipped} record(s) skipped: missing title or due date"
        ));
    }
}
