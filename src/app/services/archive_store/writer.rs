//! Snapshot directory writing and reading
//!
//! Snapshots are written into `staging/<stamp>.partial`, synced, and only
//! then renamed into `snapshots/<stamp>`. A directory under `snapshots/` is
//! therefore always complete.

use super::index::SnapshotMeta;
use super::layout::StoreLayout;
use crate::app::models::{CsvTable, Snapshot, Stamp, TrainDay};
use crate::app::services::validator::train_day::parse_date_name;
use crate::constants::{SNAPSHOT_META_FILE_NAME, STATIONS_FILE_NAME, TRAINS_FILE_NAME};
use crate::error::{DatasetError, Result};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use sysinfo::Disks;
use tracing::{debug, warn};

/// Write a complete snapshot directory for `stamp` and return its final path
///
/// On failure the staging directory is removed and nothing is left under
/// `snapshots/`.
pub fn write_snapshot(
    layout: &StoreLayout,
    stamp: &Stamp,
    snapshot: &Snapshot,
    meta: &SnapshotMeta,
) -> Result<PathBuf> {
    let staging = layout.staging_dir_for(stamp);
    let target = layout.snapshot_dir(stamp);
    if target.exists() {
        return Err(DatasetError::storage_message(format!(
            "Snapshot directory for {} already exists",
            stamp
        )));
    }

    let result = write_tables(&staging, snapshot, meta).and_then(|_| {
        fs::rename(&staging, &target).map_err(|e| {
            DatasetError::storage(format!("Failed to publish snapshot {}", stamp), e)
        })?;
        sync_dir(&layout.snapshots_dir());
        Ok(())
    });

    if let Err(e) = result {
        remove_dir_quietly(&staging);
        return Err(e);
    }

    debug!("Published snapshot directory {}", target.display());
    Ok(target)
}

fn write_tables(staging: &Path, snapshot: &Snapshot, meta: &SnapshotMeta) -> Result<()> {
    fs::create_dir_all(staging).map_err(|e| {
        DatasetError::storage(format!("Failed to create '{}'", staging.display()), e)
    })?;

    if let Some(stations) = &snapshot.stations {
        write_synced(&staging.join(STATIONS_FILE_NAME), &stations.to_csv_bytes()?)?;
    }
    for (date, day) in &snapshot.days {
        let day_dir = staging.join(date.format("%Y-%m-%d").to_string());
        fs::create_dir_all(&day_dir).map_err(|e| {
            DatasetError::storage(format!("Failed to create '{}'", day_dir.display()), e)
        })?;
        write_synced(&day_dir.join(TRAINS_FILE_NAME), &day.table.to_csv_bytes()?)?;
    }
    write_synced(
        &staging.join(SNAPSHOT_META_FILE_NAME),
        &serde_json::to_vec_pretty(meta)?,
    )?;
    Ok(())
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path)
        .map_err(|e| DatasetError::storage(format!("Failed to create '{}'", path.display()), e))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| DatasetError::storage(format!("Failed to write '{}'", path.display()), e))
}

/// Directory fsync is not available everywhere; failure only loses durability of the rename
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        debug!("Directory sync skipped for {}: {}", dir.display(), e);
    }
}

pub fn remove_dir_quietly(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove '{}': {}", dir.display(), e);
        }
    }
}

/// Read a published snapshot directory back into memory
pub fn read_snapshot(dir: &Path) -> Result<Snapshot> {
    let stations_path = dir.join(STATIONS_FILE_NAME);
    let stations = if stations_path.is_file() {
        Some(read_table(&stations_path)?)
    } else {
        None
    };

    let mut days = BTreeMap::new();
    let listing = fs::read_dir(dir)
        .map_err(|e| DatasetError::storage(format!("Failed to list '{}'", dir.display()), e))?;
    for entry in listing {
        let entry = entry?;
        let name = entry.file_name();
        let Some(date) = name.to_str().and_then(parse_date_name) else {
            continue;
        };
        let table = read_table(&entry.path().join(TRAINS_FILE_NAME))?;
        days.insert(date, TrainDay::new(date, table));
    }

    Ok(Snapshot::new(stations, days))
}

pub fn read_meta(dir: &Path) -> Result<SnapshotMeta> {
    let path = dir.join(SNAPSHOT_META_FILE_NAME);
    let raw = fs::read(&path)
        .map_err(|e| DatasetError::storage(format!("Failed to read '{}'", path.display()), e))?;
    Ok(serde_json::from_slice(&raw)?)
}

fn read_table(path: &Path) -> Result<CsvTable> {
    let bytes = fs::read(path)
        .map_err(|e| DatasetError::storage(format!("Failed to read '{}'", path.display()), e))?;
    CsvTable::from_csv_bytes(&bytes)
}

/// Fail with `StorageFailure` when writing `required_bytes` would leave less than `reserve_bytes` free
pub fn check_free_space(path: &Path, required_bytes: u64, reserve_bytes: u64) -> Result<()> {
    let Some(available) = available_space(path) else {
        debug!("No disk found for {}, skipping free space check", path.display());
        return Ok(());
    };
    let needed = required_bytes.saturating_add(reserve_bytes);
    if available < needed {
        return Err(DatasetError::storage_message(format!(
            "Insufficient disk space: {} MB available, {} MB needed",
            available / (1024 * 1024),
            needed.div_ceil(1024 * 1024)
        )));
    }
    debug!(
        "Free space check passed: {} MB available, {} MB needed",
        available / (1024 * 1024),
        needed.div_ceil(1024 * 1024)
    );
    Ok(())
}

/// Available bytes on the disk whose mount point is the longest prefix of `path`
fn available_space(path: &Path) -> Option<u64> {
    let path = path.canonicalize().ok()?;
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}
