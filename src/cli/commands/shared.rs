//! Shared components for CLI commands
//!
//! Logging setup, manager construction and the two output formats used by
//! every subcommand.

use crate::app::services::version_manager::VersionManager;
use crate::cli::args::GlobalArgs;
use crate::config::ManagerConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Set up structured logging on stderr so stdout stays clean for results
pub fn setup_logging(global: &GlobalArgs) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = global.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rail_dataset_manager={}", log_level)));

    if global.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .context("Failed to initialize logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to initialize logging")?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Resolve configuration and open the version manager
pub async fn open_manager(config: ManagerConfig) -> Result<VersionManager> {
    debug!("Opening archive store at {}", config.data_root.display());
    let root = config.data_root.clone();
    VersionManager::open(config)
        .await
        .with_context(|| format!("Failed to open archive store at {}", root.display()))
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode JSON output")?;
    println!("{}", json);
    Ok(())
}

/// Spinner for long-running steps; hidden in JSON and quiet modes
pub fn spinner(global: &GlobalArgs, message: &str) -> ProgressBar {
    if global.is_json() || global.quiet {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", "!".yellow().bold(), message);
}

pub fn stamp_or_none<T: std::fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "none".dimmed().to_string(), |v| v.to_string())
}
