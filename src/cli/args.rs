//! Command-line argument definitions for the dataset manager
//!
//! This module defines the operator-facing CLI using the clap derive API.
//! Global flags select the store and output format; each subcommand maps onto
//! one version manager operation.

use crate::config::{ManagerConfig, PrecomputeMode};
use crate::error::{DatasetError, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::debug;

/// CLI arguments for the railway dataset manager
///
/// Replaces the dataset served by the dashboard, keeps every earlier
/// generation as a restorable archive, and never leaves the service pointing
/// at a partial dataset.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rail-datasets",
    version,
    about = "Upload, archive and restore the railway dataset served by the dashboard",
    long_about = "Manages the single railway dataset (station table plus per-day train records) \
                  served by the statistics dashboard. Every upload is validated before it is \
                  stored, every previous dataset stays available as an archive, and switching \
                  between archives is atomic."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Flags shared by every subcommand
#[derive(Debug, Clone, clap::Args)]
pub struct GlobalArgs {
    /// Root directory of the archive store
    ///
    /// Overrides the config file and RAIL_DATASETS_ROOT. Defaults to a
    /// directory under the platform data directory.
    #[arg(long = "data-root", value_name = "PATH", global = true)]
    pub data_root: Option<PathBuf>,

    /// Bundled dataset used to seed an empty store
    #[arg(long = "seed", value_name = "PATH", global = true)]
    pub seed_dir: Option<PathBuf>,

    /// Path to a JSON configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Output format for results
    #[arg(
        long = "format",
        value_enum,
        default_value = "human",
        global = true,
        help = "Output format for results"
    )]
    pub output_format: OutputFormat,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        conflicts_with = "verbose",
        help = "Suppress output except errors"
    )]
    pub quiet: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Validate and activate a new dataset
    Upload(UploadArgs),
    /// List every stored dataset, newest first
    List,
    /// Restore an earlier dataset (the most recent one when no stamp is given)
    Revert(RevertArgs),
    /// Make a specific archived dataset current
    Apply(StampArgs),
    /// Delete an archived dataset
    Delete(StampArgs),
    /// Delete every archive except the default and the current dataset
    Clear(ClearArgs),
    /// Show the dataset currently being served
    Info,
    /// Remove storage left behind by interrupted uploads
    Gc,
}

#[derive(Debug, Clone, Parser)]
pub struct UploadArgs {
    /// Station reference table (.csv)
    #[arg(short = 's', long = "stations", value_name = "FILE")]
    pub stations: Option<PathBuf>,

    /// Train records: a .zip package or a directory of YYYY-MM-DD/trains.csv
    #[arg(short = 'a', long = "archive", value_name = "PATH")]
    pub archive: Option<PathBuf>,

    /// Display name for the new dataset
    #[arg(short = 'n', long = "name", value_name = "NAME")]
    pub name: Option<String>,

    /// Skip the precompute step after activation
    #[arg(long = "no-precompute")]
    pub no_precompute: bool,

    /// Override how the precompute step is dispatched
    #[arg(long = "precompute-mode", value_enum, value_name = "MODE")]
    pub precompute_mode: Option<PrecomputeModeArg>,
}

#[derive(Debug, Clone, Parser)]
pub struct RevertArgs {
    /// Stamp to restore
    #[arg(value_name = "STAMP")]
    pub stamp: Option<String>,
}

#[derive(Debug, Clone, Parser)]
pub struct StampArgs {
    /// Archive stamp, as printed by `list`
    #[arg(value_name = "STAMP")]
    pub stamp: String,
}

#[derive(Debug, Clone, Parser)]
pub struct ClearArgs {
    /// Confirm deletion of all non-protected archives
    #[arg(long = "yes")]
    pub yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON for scripting
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PrecomputeModeArg {
    Await,
    Background,
}

impl From<PrecomputeModeArg> for PrecomputeMode {
    fn from(mode: PrecomputeModeArg) -> Self {
        match mode {
            PrecomputeModeArg::Await => PrecomputeMode::Await,
            PrecomputeModeArg::Background => PrecomputeMode::Background,
        }
    }
}

impl GlobalArgs {
    /// Get the log level based on verbosity settings
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }

        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    pub fn is_json(&self) -> bool {
        self.output_format == OutputFormat::Json
    }

    /// Build the manager configuration: config file, environment, then flags
    ///
    /// Without `--config`, the platform config file is used when it exists.
    pub fn to_config(&self) -> Result<ManagerConfig> {
        if let Some(config_file) = &self.config_file {
            if !config_file.is_file() {
                return Err(DatasetError::configuration(format!(
                    "Config file does not exist: {}",
                    config_file.display()
                )));
            }
        }
        let config_file = self.config_file.clone().or_else(|| {
            ManagerConfig::default_config_path().filter(|path| path.is_file())
        });
        debug!("Using config file: {:?}", config_file);

        let mut config = ManagerConfig::load_layered(config_file.as_deref())?;
        if let Some(data_root) = &self.data_root {
            config.data_root = data_root.clone();
        }
        if let Some(seed_dir) = &self.seed_dir {
            config.seed_dir = Some(seed_dir.clone());
        }
        Ok(config)
    }
}

impl UploadArgs {
    /// Reject an upload that names neither half before touching the store
    pub fn validate(&self) -> Result<()> {
        if self.stations.is_none() && self.archive.is_none() {
            return Err(DatasetError::EmptyUpload);
        }
        for path in self.stations.iter().chain(self.archive.iter()) {
            if !path.exists() {
                return Err(DatasetError::configuration(format!(
                    "Upload path does not exist: {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}
