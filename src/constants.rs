//! Application constants for the dataset manager
//!
//! This module contains on-disk layout names, default limits and the column
//! names the validator relies on.

// =============================================================================
// Archive Store Layout
// =============================================================================

/// Index record holding names, flags, dates and the current pointer
pub const INDEX_FILE_NAME: &str = "index.json";

/// Advisory lock file serializing writers across processes
pub const LOCK_FILE_NAME: &str = ".lock";

/// Directory holding one immutable directory per stamp
pub const SNAPSHOTS_DIR_NAME: &str = "snapshots";

/// Directory holding in-flight snapshot writes
pub const STAGING_DIR_NAME: &str = "staging";

/// Suffix appended to staging directories while they are being written
pub const STAGING_SUFFIX: &str = ".partial";

/// Per-snapshot summary, duplicated from the index for recovery
pub const SNAPSHOT_META_FILE_NAME: &str = "snapshot.json";

/// Current on-disk index format
pub const INDEX_FORMAT_VERSION: u32 = 1;

// =============================================================================
// Dataset Files
// =============================================================================

/// Station reference table name, both in uploads and in stored snapshots
pub const STATIONS_FILE_NAME: &str = "stations.csv";

/// Per-day train table name inside each `YYYY-MM-DD` directory
pub const TRAINS_FILE_NAME: &str = "trains.csv";

/// Optional metadata file in a seed directory (`{"name": "..."}`)
pub const SEED_META_FILE_NAME: &str = "dataset.meta.json";

/// Date directory naming
pub const DATE_DIR_FORMAT: &str = "%Y-%m-%d";

/// Package entries that archivers add and that never carry data
pub const IGNORED_PACKAGE_PREFIXES: &[&str] = &["__MACOSX/"];
pub const IGNORED_PACKAGE_FILE_NAMES: &[&str] = &[".DS_Store", "Thumbs.db"];

// =============================================================================
// Stamps
// =============================================================================

/// Stamp rendering of the UTC creation instant; lexicographic order is creation order
pub const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.3fZ";

/// Shape every stamp must match before a path is built from it
pub const STAMP_PATTERN: &str = r"^\d{8}T\d{6}\.\d{3}Z$";

// =============================================================================
// Defaults
// =============================================================================

/// Largest window the precompute step is asked to cover
pub const DEFAULT_MAX_RANGE_DAYS: u32 = 366;

/// Name given to the seeded dataset when it carries no metadata
pub const DEFAULT_DATASET_NAME: &str = "Bundled dataset";

/// Name given to an upload when neither the operator nor the current dataset supplies one
pub const UPLOADED_DATASET_NAME: &str = "Uploaded dataset";

/// Uncompressed size ceiling for uploaded packages (zip bomb protection)
pub const DEFAULT_MAX_PACKAGE_BYTES: u64 = 4 * 1024 * 1024 * 1024;

/// Free space that must remain on the store's disk after a snapshot is written
pub const DEFAULT_MIN_FREE_SPACE_MB: u64 = 64;

/// Upper bound for an external precompute command
pub const DEFAULT_PRECOMPUTE_TIMEOUT_SECS: u64 = 3600;

/// Directory name used under the platform data/config directories
pub const APP_DIR_NAME: &str = "rail-dataset-manager";

/// Config file name under the platform config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

// =============================================================================
// Environment
// =============================================================================

pub const ENV_DATA_ROOT: &str = "RAIL_DATASETS_ROOT";
pub const ENV_SEED_DIR: &str = "RAIL_DATASETS_SEED";
pub const ENV_MAX_RANGE_DAYS: &str = "RAIL_DATASETS_MAX_RANGE_DAYS";

// =============================================================================
// Column Names
// =============================================================================

/// Station table columns
pub mod station_columns {
    pub const CODE: &str = "code";
    pub const REGION: &str = "region";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
}

/// Per-day train table columns
pub mod train_columns {
    pub const TRAIN_HASH: &str = "train_hash";
    pub const STOP_NUMBER: &str = "stop_number";
    pub const ARRIVAL_DELAY: &str = "arrival_delay";
    pub const DEPARTURE_DELAY: &str = "departure_delay";
    pub const DAY: &str = "day";

    /// Columns that must hold a number (or nothing) when present
    pub const NUMERIC: &[&str] = &[STOP_NUMBER, ARRIVAL_DELAY, DEPARTURE_DELAY];
}
