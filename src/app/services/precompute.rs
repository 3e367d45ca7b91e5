//! Precompute trigger
//!
//! After a dataset becomes current, the analytics layer is asked to
//! precompute over the dataset's date range. The range is clamped to the most
//! recent `max_range_days` days. Failures never undo the activation.

use crate::app::models::{DateSpan, PrecomputeRange, Stamp};
use crate::config::ManagerConfig;
use crate::error::{DatasetError, Result};
use anyhow::{Context, anyhow, bail};
use chrono::Duration as ChronoDuration;
use futures::future::{BoxFuture, FutureExt};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Everything the analytics layer needs to rebuild its caches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecomputeRequest {
    pub stamp: Stamp,
    pub snapshot_dir: PathBuf,
    pub range: PrecomputeRange,
}

pub trait PrecomputeTrigger: Send + Sync {
    fn trigger(&self, request: PrecomputeRequest) -> BoxFuture<'static, anyhow::Result<()>>;
}

/// Keep the last `max_range_days` days of `span`
pub fn clamp_range(span: DateSpan, max_range_days: u32) -> PrecomputeRange {
    let max_range_days = i64::from(max_range_days.max(1));
    if span.days() > max_range_days {
        PrecomputeRange {
            start_date: span.end - ChronoDuration::days(max_range_days - 1),
            end_date: span.end,
            clamped_to_max_range: true,
        }
    } else {
        PrecomputeRange {
            start_date: span.start,
            end_date: span.end,
            clamped_to_max_range: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTrigger;

impl PrecomputeTrigger for NoopTrigger {
    fn trigger(&self, request: PrecomputeRequest) -> BoxFuture<'static, anyhow::Result<()>> {
        debug!(
            "No precompute configured for {} ({} to {})",
            request.stamp, request.range.start_date, request.range.end_date
        );
        futures::future::ready(Ok(())).boxed()
    }
}

/// Runs an external program with `--start`, `--end` and `--dataset-dir` appended
#[derive(Debug, Clone)]
pub struct CommandTrigger {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTrigger {
    pub fn new(command: &[String], timeout: Duration) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .filter(|(program, _)| !program.trim().is_empty())
            .ok_or_else(|| DatasetError::configuration("precompute_command must name a program"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }
}

impl PrecomputeTrigger for CommandTrigger {
    fn trigger(&self, request: PrecomputeRequest) -> BoxFuture<'static, anyhow::Result<()>> {
        let program = self.program.clone();
        let args = self.args.clone();
        let timeout = self.timeout;

        async move {
            let start_time = Instant::now();
            let mut command = tokio::process::Command::new(&program);
            command
                .args(&args)
                .arg("--start")
                .arg(request.range.start_date.to_string())
                .arg("--end")
                .arg(request.range.end_date.to_string())
                .arg("--dataset-dir")
                .arg(&request.snapshot_dir)
                .stdin(Stdio::null())
                .kill_on_drop(true);

            info!(
                "Running precompute '{}' for {} ({} to {})",
                program, request.stamp, request.range.start_date, request.range.end_date
            );
            let output = tokio::time::timeout(timeout, command.output())
                .await
                .map_err(|_| anyhow!("precompute timed out after {}s", timeout.as_secs()))?
                .with_context(|| format!("failed to start precompute program '{}'", program))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let detail = stderr.lines().last().unwrap_or("").trim();
                bail!("precompute exited with {}: {}", output.status, detail);
            }

            info!(
                "Precompute for {} finished in {:.2}s",
                request.stamp,
                start_time.elapsed().as_secs_f64()
            );
            Ok(())
        }
        .boxed()
    }
}

/// Build the trigger the configuration asks for
pub fn trigger_from_config(config: &ManagerConfig) -> Result<Arc<dyn PrecomputeTrigger>> {
    match &config.precompute_command {
        Some(command) => Ok(Arc::new(CommandTrigger::new(
            command,
            config.precompute_timeout(),
        )?)),
        None => Ok(Arc::new(NoopTrigger)),
    }
}
