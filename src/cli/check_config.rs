//! `check-config` command implementation
//!
//! Loads and validates the configuration without touching the network and
//! prints the effective settings.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::urgency::TierPolicy;

#[derive(Serialize)]
struct CheckReport {
    /// File the settings came from; `None` means built-in defaults
    source: Option<PathBuf>,
    utc_offset: String,
    config: Config,
}

pub fn run(explicit: Option<PathBuf>, output: OutputOptions) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let config = Config::discover(explicit.as_deref(), &cwd)?;
    let offset = config.utc_offset()?;

    let source = explicit.or_else(|| {
        let candidate = cwd.join(DEFAULT_CONFIG_FILE);
        candidate.exists().then_some(candidate)
    });

    let mut human = HumanOutput::new("Configuration OK");
    human.push_summary(
        "file",
        source
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "(defaults)".to_string()),
    );
    human.push_summary("utc offset", offset.to_string());
    let tiers: Vec<String> = TierPolicy::from(&config.tiers)
        .tiers()
        .iter()
        .map(|tier| tier.label())
        .collect();
    human.push_summary("tiers", tiers.join(", "));
    human.push_summary("per-task window", config.tiers.per_task_window.to_string());
    if !config.tiers.urgent_hours.is_empty() {
        let hours: Vec<String> = config
            .tiers
            .urgent_hours
            .iter()
            .map(|hour| format!("{hour:02}:00"))
            .collect();
        human.push_summary("urgent hours", hours.join(", "));
    }
    human.push_summary("max lookahead", format!("{} days", config.source.max_lookahead_days));
    human.push_summary("statuses", config.source.statuses.len().to_string());

    let report = CheckReport {
        source,
        utc_offset: offset.to_string(),
        config,
    };
    emit_success(output, "check-config", &report, Some(&human))
}
