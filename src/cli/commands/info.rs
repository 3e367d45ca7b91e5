//! Info and gc commands

use super::shared::{open_manager, print_json, success};
use crate::cli::args::GlobalArgs;
use anyhow::Result;
use colored::Colorize;
use serde_json::json;

pub async fn run_info(global: &GlobalArgs) -> Result<()> {
    let manager = open_manager(global.to_config()?).await?;
    let info = manager.data_info();

    if global.is_json() {
        return print_json(&info);
    }

    let Some(stamp) = &info.current_stamp else {
        println!("{}", "No dataset is being served".yellow());
        return Ok(());
    };
    println!("Dataset:  {}", info.dataset_name.as_deref().unwrap_or("-").bold());
    println!("Stamp:    {}", stamp);
    match (info.available_min_date, info.available_max_date) {
        (Some(start), Some(end)) => println!("Dates:    {} to {}", start, end),
        _ => println!("Dates:    {}", "no train days".dimmed()),
    }
    if let Some(snapshot) = manager.current_snapshot() {
        println!("Location: {}", snapshot.dir.display());
        println!("Records:  {}", snapshot.summary.total_records());
    }
    Ok(())
}

pub async fn run_gc(global: &GlobalArgs) -> Result<()> {
    let manager = open_manager(global.to_config()?).await?;
    let removed = manager.collect_garbage().await?;

    if global.is_json() {
        return print_json(&json!({ "removed": removed }));
    }
    success(&format!("Removed {} orphaned item(s)", removed));
    Ok(())
}
