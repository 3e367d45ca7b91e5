//! Read-only view of the snapshot being served

use crate::app::models::{SnapshotSummary, Stamp};
use crate::constants::{STATIONS_FILE_NAME, TRAINS_FILE_NAME};
use crate::app::services::validator::train_day::parse_date_name;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::warn;

/// The current snapshot as consumed by the statistics engine
///
/// Resolved from the live index on every call, so a holder keeps reading the
/// generation it resolved even if the current pointer moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentSnapshot {
    pub stamp: Stamp,
    pub name: String,
    pub dir: PathBuf,
    pub summary: SnapshotSummary,
}

impl CurrentSnapshot {
    pub fn stations_path(&self) -> Option<PathBuf> {
        let path = self.dir.join(STATIONS_FILE_NAME);
        path.is_file().then_some(path)
    }

    /// `trains.csv` paths for every stored day in `[start, end]`, in date order
    pub fn train_day_paths(&self, start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, PathBuf)> {
        let pattern = format!(
            "{}/*/{}",
            glob::Pattern::escape(&self.dir.to_string_lossy()),
            TRAINS_FILE_NAME
        );
        let paths = match glob::glob(&pattern) {
            Ok(paths) => paths,
            Err(e) => {
                warn!("Invalid day pattern for {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        let mut days: Vec<(NaiveDate, PathBuf)> = paths
            .filter_map(|entry| entry.ok())
            .filter_map(|path| {
                let date = day_of(&path)?;
                (start <= date && date <= end).then_some((date, path))
            })
            .collect();
        days.sort();
        days
    }
}

fn day_of(path: &Path) -> Option<NaiveDate> {
    path.parent()?
        .file_name()?
        .to_str()
        .and_then(parse_date_name)
}
