//! Upload command: validate, store and activate a new dataset

use super::shared::{open_manager, print_json, spinner, stamp_or_none, success, warning};
use crate::app::models::UploadOutcome;
use crate::app::services::validator::{TrainArchive, UploadFile, UploadPayload};
use crate::app::services::version_manager::UploadRequest;
use crate::cli::args::{GlobalArgs, UploadArgs};
use anyhow::Result;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub async fn run_upload(
    global: &GlobalArgs,
    args: UploadArgs,
    cancel: CancellationToken,
) -> Result<()> {
    args.validate()?;

    let mut config = global.to_config()?;
    if let Some(mode) = args.precompute_mode {
        config.precompute_mode = mode.into();
    }
    let manager = open_manager(config).await?;

    let stations = args.stations.as_deref().map(UploadFile::from_path).transpose()?;
    let archive = args.archive.as_deref().map(TrainArchive::from_path).transpose()?;
    if let Some(archive) = &archive {
        info!("Uploading train records from {}", archive.describe());
    }
    let payload = UploadPayload::from_parts(stations, archive)?;

    let mut request = UploadRequest::new(payload).with_precompute(!args.no_precompute);
    if let Some(name) = args.name {
        request = request.with_name(name);
    }

    let progress = spinner(global, "Validating and storing dataset");
    let result = manager.upload(request, &cancel).await;
    progress.finish_and_clear();
    let outcome = result?;

    if global.is_json() {
        print_json(&outcome)?;
    } else {
        print_outcome(&outcome);
    }

    // Background precompute must finish before the runtime shuts down
    let progress = spinner(global, "Waiting for precompute");
    manager.wait_for_background_tasks().await;
    progress.finish_and_clear();
    Ok(())
}

fn print_outcome(outcome: &UploadOutcome) {
    success(&format!(
        "Dataset {} is now current",
        outcome.applied_stamp.to_string().bold()
    ));
    println!(
        "  Previous:   {}",
        stamp_or_none(outcome.previous_stamp.as_ref())
    );

    let stats = &outcome.upload_stats;
    println!(
        "  Stations:   {}",
        if stats.stations_uploaded {
            "uploaded".to_string()
        } else {
            "carried over".dimmed().to_string()
        }
    );
    match &stats.date_range {
        Some(span) => println!(
            "  Train days: {} ({} to {})",
            stats.train_dates.len(),
            span.start,
            span.end
        ),
        None => println!("  Train days: {}", "carried over".dimmed()),
    }

    if let Some(range) = &outcome.precompute_range {
        let clamped = if range.clamped_to_max_range {
            " (clamped)".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  Precompute: {} to {}{}",
            range.start_date, range.end_date, clamped
        );
    }
    if let Some(message) = &outcome.precompute_warning {
        warning(&format!("Precompute failed: {}", message));
    }
}
