//! Orphan collection and index recovery

use super::index::{ArchiveIndex, SnapshotMeta};
use super::layout::StoreLayout;
use super::writer::{read_meta, remove_dir_quietly};
use crate::app::models::Stamp;
use crate::error::{DatasetError, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Remove staging leftovers and snapshot directories the index does not reference
pub fn collect_orphans(layout: &StoreLayout, index: &ArchiveIndex) -> Result<usize> {
    let mut removed = 0;

    for path in list_children(&layout.staging_dir())? {
        info!("Removing interrupted write {}", path.display());
        remove_path(&path);
        removed += 1;
    }

    for path in list_children(&layout.snapshots_dir())? {
        let referenced = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| Stamp::parse(name).ok())
            .is_some_and(|stamp| index.entries.contains_key(&stamp));
        if !referenced {
            info!("Removing unreferenced snapshot {}", path.display());
            remove_path(&path);
            removed += 1;
        }
    }

    if removed > 0 {
        info!("Collected {} orphaned item(s)", removed);
    }
    Ok(removed)
}

/// Rebuild an index from the metadata copies inside snapshot directories
///
/// Used when `index.json` is missing while snapshots exist. The rebuilt index
/// has no current entry.
pub fn recover_index(layout: &StoreLayout) -> Result<ArchiveIndex> {
    let mut index = ArchiveIndex::default();
    for path in list_children(&layout.snapshots_dir())? {
        if !path.is_dir() {
            continue;
        }
        match read_meta(&path) {
            Ok(SnapshotMeta { stamp, mut record }) => {
                if record.is_default && index.default_stamp().is_some() {
                    warn!("Dropping duplicate default flag on {}", stamp);
                    record.is_default = false;
                }
                index.entries.insert(stamp, record);
            }
            Err(e) => warn!("Skipping unrecoverable snapshot {}: {}", path.display(), e),
        }
    }
    if !index.entries.is_empty() {
        warn!(
            "Archive index was missing; recovered {} entries from snapshot metadata",
            index.entries.len()
        );
    }
    Ok(index)
}

fn list_children(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let listing = match fs::read_dir(dir) {
        Ok(listing) => listing,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(DatasetError::storage(
                format!("Failed to list '{}'", dir.display()),
                e,
            ));
        }
    };
    let mut paths = Vec::new();
    for entry in listing {
        paths.push(entry?.path());
    }
    paths.sort();
    Ok(paths)
}

fn remove_path(path: &Path) {
    if path.is_dir() {
        remove_dir_quietly(path);
    } else if let Err(e) = fs::remove_file(path) {
        warn!("Failed to remove '{}': {}", path.display(), e);
    }
}
