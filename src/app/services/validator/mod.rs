//! Dataset validation service
//!
//! Turns an upload payload into a normalized [`Snapshot`] or a structured
//! error. Validation never touches the archive store: a rejected upload leaves
//! no trace.

use crate::app::models::{Snapshot, UploadStats};
use crate::config::ManagerConfig;
use crate::error::Result;
use std::path::Path;
use std::time::Instant;
use tracing::info;

pub mod package;
pub mod payload;
pub mod stations;
pub mod table;
pub mod train_day;

#[cfg(test)]
pub mod tests;

pub use payload::{TrainArchive, UploadFile, UploadPayload};

/// Result of a successful validation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    /// Normalized tables; a half the upload did not carry is absent
    pub snapshot: Snapshot,
    pub stats: UploadStats,
}

#[derive(Debug, Clone, Copy)]
pub struct DatasetValidator {
    max_package_bytes: u64,
}

impl DatasetValidator {
    pub fn new(max_package_bytes: u64) -> Self {
        Self { max_package_bytes }
    }

    pub fn from_config(config: &ManagerConfig) -> Self {
        Self::new(config.max_package_bytes)
    }

    /// Validate an upload without persisting anything
    ///
    /// A separately supplied stations file takes precedence over a
    /// `stations.csv` found at the package root.
    pub fn validate(&self, payload: &UploadPayload) -> Result<ValidatedUpload> {
        let start_time = Instant::now();

        let uploaded_stations = payload
            .stations()
            .map(stations::validate_stations_file)
            .transpose()?;

        let (package_stations, days) = match payload.archive() {
            Some(archive) => {
                let parsed = package::load_archive(archive, self.max_package_bytes)?;
                (parsed.stations, parsed.days)
            }
            None => (None, Default::default()),
        };

        let stations = match (uploaded_stations, package_stations) {
            (Some(table), _) => Some(table),
            (None, Some(bytes)) => Some(stations::validate_stations(&bytes)?),
            (None, None) => None,
        };

        let snapshot = Snapshot::new(stations, days);
        let summary = snapshot.summary();
        let stats = UploadStats {
            stations_uploaded: snapshot.stations.is_some(),
            train_dates: summary.train_dates(),
            date_range: summary.date_span(),
        };

        info!(
            "Validated upload: stations={}, days={}, records={} in {:.2}s",
            stats.stations_uploaded,
            stats.train_dates.len(),
            summary.total_records(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(ValidatedUpload { snapshot, stats })
    }

    /// Validate a dataset directory on disk, as used for the bundled seed
    pub fn validate_directory(&self, dir: &Path) -> Result<Snapshot> {
        let payload = UploadPayload::ArchiveOnly(TrainArchive::Directory(dir.to_path_buf()));
        self.validate(&payload).map(|validated| validated.snapshot)
    }
}
