//! Archive commands: list, revert, apply, delete, clear

use super::shared::{open_manager, print_json, stamp_or_none, success};
use crate::app::models::{ArchiveSummary, SwitchOutcome};
use crate::cli::args::{ClearArgs, GlobalArgs, RevertArgs, StampArgs};
use anyhow::{Result, bail};
use colored::Colorize;
use serde_json::json;

pub async fn run_list(global: &GlobalArgs) -> Result<()> {
    let manager = open_manager(global.to_config()?).await?;
    let archives = manager.list_archives();

    if global.is_json() {
        return print_json(&archives);
    }
    if archives.is_empty() {
        println!("No datasets stored yet");
        return Ok(());
    }

    println!(
        "{:<22} {:<10} {:<24} {:<25} {:>9}",
        "STAMP".bold(),
        "FLAGS".bold(),
        "NAME".bold(),
        "DATES".bold(),
        "STATIONS".bold()
    );
    for archive in &archives {
        println!("{}", format_row(archive));
    }
    Ok(())
}

fn format_row(archive: &ArchiveSummary) -> String {
    let mut flags = Vec::new();
    if archive.is_current {
        flags.push("current");
    }
    if archive.is_default {
        flags.push("default");
    }
    let dates = match (archive.start_date, archive.end_date) {
        (Some(start), Some(end)) => format!("{} to {}", start, end),
        _ => "-".to_string(),
    };
    let stations = archive
        .stations
        .map_or_else(|| "-".to_string(), |count| count.to_string());
    let row = format!(
        "{:<22} {:<10} {:<24} {:<25} {:>9}",
        archive.stamp.as_str(),
        flags.join(","),
        truncate(&archive.name, 24),
        dates,
        stations
    );
    if archive.is_current {
        row.green().to_string()
    } else {
        row
    }
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        return name.to_string();
    }
    let mut short: String = name.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}

pub async fn run_revert(global: &GlobalArgs, args: RevertArgs) -> Result<()> {
    let manager = open_manager(global.to_config()?).await?;
    let outcome = manager.revert(args.stamp.as_deref()).await?;
    report_switch(global, &outcome)
}

pub async fn run_apply(global: &GlobalArgs, args: StampArgs) -> Result<()> {
    let manager = open_manager(global.to_config()?).await?;
    let outcome = manager.apply_archive(&args.stamp).await?;
    report_switch(global, &outcome)
}

fn report_switch(global: &GlobalArgs, outcome: &SwitchOutcome) -> Result<()> {
    if global.is_json() {
        return print_json(outcome);
    }
    if outcome.changed {
        success(&format!(
            "Dataset {} is now current (was {})",
            outcome.new_current_stamp.to_string().bold(),
            stamp_or_none(outcome.previous_stamp.as_ref())
        ));
    } else {
        println!(
            "Dataset {} is already current; nothing changed",
            outcome.new_current_stamp
        );
    }
    Ok(())
}

pub async fn run_delete(global: &GlobalArgs, args: StampArgs) -> Result<()> {
    let manager = open_manager(global.to_config()?).await?;
    manager.delete_archive(&args.stamp).await?;

    if global.is_json() {
        return print_json(&json!({ "deleted": args.stamp }));
    }
    success(&format!("Deleted archive {}", args.stamp));
    Ok(())
}

pub async fn run_clear(global: &GlobalArgs, args: ClearArgs) -> Result<()> {
    if !args.yes {
        bail!("Refusing to clear archives without --yes");
    }
    let manager = open_manager(global.to_config()?).await?;
    let outcome = manager.clear_archives().await?;

    if global.is_json() {
        return print_json(&outcome);
    }
    success(&format!(
        "Cleared {} archive(s); default and current datasets kept",
        outcome.deleted_count
    ));
    Ok(())
}
