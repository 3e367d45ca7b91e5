//! Persistent archive index
//!
//! The index is the single source of truth for names, flags, dates and the
//! current pointer. It is rewritten whole on every mutation through a
//! temporary file and an atomic rename, so a crash leaves either the old or
//! the new index on disk.

use crate::app::models::{ArchiveEntry, SnapshotSummary, Stamp};
use crate::constants::INDEX_FORMAT_VERSION;
use crate::error::{DatasetError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Stored metadata for one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_default: bool,
    pub summary: SnapshotSummary,
}

/// Copy of an index record kept inside each snapshot directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub stamp: Stamp,
    pub record: IndexRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveIndex {
    pub version: u32,
    /// The one entry being served; `None` only before the first dataset exists
    pub current: Option<Stamp>,
    pub entries: BTreeMap<Stamp, IndexRecord>,
}

impl Default for ArchiveIndex {
    fn default() -> Self {
        Self {
            version: INDEX_FORMAT_VERSION,
            current: None,
            entries: BTreeMap::new(),
        }
    }
}

impl ArchiveIndex {
    /// Load the index; `Ok(None)` when the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DatasetError::storage(
                    format!("Failed to read archive index '{}'", path.display()),
                    e,
                ));
            }
        };
        let index: Self = serde_json::from_slice(&raw).map_err(|e| {
            DatasetError::storage(
                format!("Archive index '{}' is corrupt", path.display()),
                e,
            )
        })?;
        if index.version > INDEX_FORMAT_VERSION {
            return Err(DatasetError::storage_message(format!(
                "Archive index version {} is newer than supported version {}",
                index.version, INDEX_FORMAT_VERSION
            )));
        }
        if let Some(current) = &index.current {
            if !index.entries.contains_key(current) {
                return Err(DatasetError::storage_message(format!(
                    "Archive index points at unknown current entry {}",
                    current
                )));
            }
        }
        if index.entries.values().filter(|r| r.is_default).count() > 1 {
            return Err(DatasetError::storage_message(
                "Archive index holds more than one default entry",
            ));
        }
        Ok(Some(index))
    }

    /// Write the index atomically next to its final location
    pub fn persist(&self, path: &Path) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let payload = serde_json::to_vec_pretty(self)?;

        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|e| DatasetError::storage("Failed to create temporary index file", e))?;
        tmp.write_all(&payload)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| DatasetError::storage("Failed to write temporary index file", e))?;
        tmp.persist(path).map_err(|e| {
            DatasetError::storage(
                format!("Failed to replace archive index '{}'", path.display()),
                e.error,
            )
        })?;

        debug!(
            "Persisted archive index with {} entries (current: {})",
            self.entries.len(),
            self.current
                .as_ref()
                .map_or_else(|| "none".to_string(), Stamp::to_string)
        );
        Ok(())
    }

    pub fn entry(&self, stamp: &Stamp) -> Option<ArchiveEntry> {
        self.entries
            .get(stamp)
            .map(|record| self.to_entry(stamp, record))
    }

    /// All entries, newest first
    pub fn entries_newest_first(&self) -> Vec<ArchiveEntry> {
        self.entries
            .iter()
            .rev()
            .map(|(stamp, record)| self.to_entry(stamp, record))
            .collect()
    }

    pub fn default_stamp(&self) -> Option<&Stamp> {
        self.entries
            .iter()
            .find(|(_, record)| record.is_default)
            .map(|(stamp, _)| stamp)
    }

    pub fn latest_stamp(&self) -> Option<&Stamp> {
        self.entries.keys().next_back()
    }

    fn to_entry(&self, stamp: &Stamp, record: &IndexRecord) -> ArchiveEntry {
        ArchiveEntry {
            stamp: stamp.clone(),
            name: record.name.clone(),
            created_at: record.created_at,
            is_default: record.is_default,
            is_current: self.current.as_ref() == Some(stamp),
            summary: record.summary.clone(),
        }
    }
}
