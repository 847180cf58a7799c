//! task-digest - deadline reminders for a Notion task database
//!
//! Groups open tasks by urgency and posts a single digest to Slack.

use clap::Parser;
use task_digest::cli::Cli;
use task_digest::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "task_digest=info";
const MAX_FILTER_LEN: usize = 4096;

/// Directives from `RUST_LOG`; anything unusable falls back to the default.
fn log_filter() -> EnvFilter {
    match std::env::var("RUST_LOG") {
        Ok(raw) if !raw.trim().is_empty() && raw.len() <= MAX_FILTER_LEN => {
            EnvFilter::try_new(raw.trim()).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
        }
        _ => EnvFilter::new(DEFAULT_LOG_FILTER),
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter())
        .init();

    let command = infer_command_name_from_args();
    let cli = Cli::parse();
    let json = cli.json;
    if let Err(err) = cli.run() {
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}
