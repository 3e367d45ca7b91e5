//! Configuration management and validation.
//!
//! Provides the manager configuration with layered loading
//! (defaults -> JSON file -> environment -> CLI overrides) and
//! validation of the limits the store and precompute step rely on.

use crate::constants::{
    APP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_DATASET_NAME, DEFAULT_MAX_PACKAGE_BYTES,
    DEFAULT_MAX_RANGE_DAYS, DEFAULT_MIN_FREE_SPACE_MB, DEFAULT_PRECOMPUTE_TIMEOUT_SECS,
    ENV_DATA_ROOT, ENV_MAX_RANGE_DAYS, ENV_SEED_DIR,
};
use crate::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// How the precompute trigger is dispatched after an activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecomputeMode {
    /// Run inline; a failure is reported back as a warning on the upload outcome
    #[default]
    Await,
    /// Spawn on the runtime; a failure is only logged
    Background,
}

/// Global configuration for the dataset manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Root directory of the archive store
    pub data_root: PathBuf,

    /// Directory holding the bundled dataset used to seed an empty store
    pub seed_dir: Option<PathBuf>,

    /// Name of the seeded dataset when the seed carries no metadata
    pub default_dataset_name: String,

    /// Largest window (in days) the precompute step is asked to cover
    pub max_range_days: u32,

    /// Uncompressed size ceiling for uploaded packages
    pub max_package_bytes: u64,

    /// Free space (MB) that must remain after writing a snapshot
    pub min_free_space_mb: u64,

    /// Await the precompute trigger or spawn it in the background
    pub precompute_mode: PrecomputeMode,

    /// External program (and leading arguments) run after each activation
    pub precompute_command: Option<Vec<String>>,

    /// Time limit for the external precompute program
    pub precompute_timeout_secs: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            data_root: Self::default_data_root(),
            seed_dir: None,
            default_dataset_name: DEFAULT_DATASET_NAME.to_string(),
            max_range_days: DEFAULT_MAX_RANGE_DAYS,
            max_package_bytes: DEFAULT_MAX_PACKAGE_BYTES,
            min_free_space_mb: DEFAULT_MIN_FREE_SPACE_MB,
            precompute_mode: PrecomputeMode::Await,
            precompute_command: None,
            precompute_timeout_secs: DEFAULT_PRECOMPUTE_TIMEOUT_SECS,
        }
    }
}

impl ManagerConfig {
    /// Create configuration rooted at the given store directory
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            ..Self::default()
        }
    }

    /// Platform data directory, falling back to the working directory
    pub fn default_data_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join("store")
    }

    /// Platform config file location, if the platform has a config directory
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn with_seed_dir(mut self, seed_dir: impl Into<PathBuf>) -> Self {
        self.seed_dir = Some(seed_dir.into());
        self
    }

    pub fn with_default_dataset_name(mut self, name: impl Into<String>) -> Self {
        self.default_dataset_name = name.into();
        self
    }

    pub fn with_max_range_days(mut self, days: u32) -> Self {
        self.max_range_days = days;
        self
    }

    pub fn with_max_package_bytes(mut self, bytes: u64) -> Self {
        self.max_package_bytes = bytes;
        self
    }

    pub fn with_min_free_space_mb(mut self, megabytes: u64) -> Self {
        self.min_free_space_mb = megabytes;
        self
    }

    pub fn with_precompute_mode(mut self, mode: PrecomputeMode) -> Self {
        self.precompute_mode = mode;
        self
    }

    pub fn with_precompute_command(mut self, command: Vec<String>) -> Self {
        self.precompute_command = Some(command);
        self
    }

    pub fn precompute_timeout(&self) -> Duration {
        Duration::from_secs(self.precompute_timeout_secs)
    }

    /// Load configuration from a JSON file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DatasetError::configuration(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            DatasetError::configuration(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Layered load: defaults, then the config file if any, then the environment
    pub fn load_layered(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `RAIL_DATASETS_*` environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(root) = std::env::var(ENV_DATA_ROOT) {
            debug!("{} overrides data root: {}", ENV_DATA_ROOT, root);
            self.data_root = PathBuf::from(root);
        }
        if let Ok(seed) = std::env::var(ENV_SEED_DIR) {
            debug!("{} overrides seed directory: {}", ENV_SEED_DIR, seed);
            self.seed_dir = Some(PathBuf::from(seed));
        }
        if let Ok(days) = std::env::var(ENV_MAX_RANGE_DAYS) {
            self.max_range_days = days.trim().parse().map_err(|_| {
                DatasetError::configuration(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_MAX_RANGE_DAYS, days
                ))
            })?;
        }
        Ok(())
    }

    /// Reject values the store or the precompute step cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.data_root.as_os_str().is_empty() {
            return Err(DatasetError::configuration("data_root must not be empty"));
        }
        if self.max_range_days == 0 {
            return Err(DatasetError::configuration(
                "max_range_days must be at least 1",
            ));
        }
        if self.max_package_bytes == 0 {
            return Err(DatasetError::configuration(
                "max_package_bytes must be greater than zero",
            ));
        }
        if self.default_dataset_name.trim().is_empty() {
            return Err(DatasetError::configuration(
                "default_dataset_name must not be blank",
            ));
        }
        if let Some(command) = &self.precompute_command {
            if command.first().is_none_or(|program| program.trim().is_empty()) {
                return Err(DatasetError::configuration(
                    "precompute_command must name a program",
                ));
            }
            if self.precompute_timeout_secs == 0 {
                return Err(DatasetError::configuration(
                    "precompute_timeout_secs must be greater than zero",
                ));
            }
        }
        if let Some(seed) = &self.seed_dir {
            if !seed.is_dir() {
                return Err(DatasetError::configuration(format!(
                    "seed directory '{}' does not exist",
                    seed.display()
                )));
            }
        }
        Ok(())
    }
}
