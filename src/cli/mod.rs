//! Command-line interface for task-digest
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is defined in its own submodule.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{
    NOTION_DB_ID_ENV, NOTION_TOKEN_ENV, SLACK_CHANNEL_ENV, SLACK_TOKEN_ENV,
};
use crate::error::Result;
use crate::output::OutputOptions;

mod check_config;
mod send;

/// task-digest - deadline reminders for a Notion task database
///
/// Fetches open tasks, groups them by how soon they are due and posts one
/// digest message to a Slack channel.
#[derive(Parser, Debug)]
#[command(name = "task-digest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ./task-digest.toml when present)
    #[arg(long, global = true, env = "TASK_DIGEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// API credentials; normally taken from the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Notion integration token
    #[arg(long, global = true, env = NOTION_TOKEN_ENV, hide_env_values = true)]
    pub notion_token: Option<String>,

    /// Notion database id
    #[arg(long, global = true, env = NOTION_DB_ID_ENV)]
    pub notion_db_id: Option<String>,

    /// Slack bot token
    #[arg(long, global = true, env = SLACK_TOKEN_ENV, hide_env_values = true)]
    pub slack_token: Option<String>,

    /// Slack channel id
    #[arg(long, global = true, env = SLACK_CHANNEL_ENV)]
    pub slack_channel: Option<String>,
}

/// Lookahead and mode flags shared by `send` and `preview`.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct WindowArgs {
    /// Query tasks due up to N days ahead (clamped to source.max_lookahead_days)
    #[arg(long, default_value_t = 0)]
    pub days: u32,

    /// Only report tasks due today
    #[arg(long)]
    pub urgent: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch tasks and post the digest
    Send(WindowArgs),

    /// Fetch tasks and print the digest without posting
    Preview(WindowArgs),

    /// Load and validate the configuration
    CheckConfig,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        match self.command {
            Commands::Send(window) => send::run(send::SendOptions {
                config: self.config,
                credentials: self.credentials,
                window,
                deliver: true,
                output,
            }),
            Commands::Preview(window) => send::run(send::SendOptions {
                config: self.config,
                credentials: self.credentials,
                window,
                deliver: false,
                output,
            }),
            Commands::CheckConfig => check_config::run(self.config, output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_send_flags() {
        let cli = Cli::try_parse_from(["task-digest", "--json", "send", "--days", "2", "--urgent"])
            .expect("parse");
        assert!(cli.json);
        match cli.command {
            Commands::Send(window) => {
                assert_eq!(window.days, 2);
                assert!(window.urgent);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn negative_days_rejected() {
        assert!(Cli::try_parse_from(["task-digest", "preview", "--days", "-1"]).is_err());
    }
}
