//! Archive store service
//!
//! Append-only snapshot directories plus a small JSON index holding names,
//! flags, dates and the single current pointer.
//!
//! Readers share an in-memory mirror of the index behind an `RwLock`. Writers
//! are serialized by a mutex inside the process and by an advisory file lock
//! across processes. Under both locks a writer reloads `index.json`, builds
//! the next index value, persists it, and only then swaps it into the mirror,
//! so a reader always observes an index that is already on disk and has
//! exactly one current entry.

use crate::app::models::{ArchiveEntry, Snapshot, Stamp};
use crate::error::{DatasetError, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};
use std::time::Instant;
use tracing::{debug, info, warn};

pub mod current;
pub mod gc;
pub mod index;
pub mod layout;
pub mod lock;
pub mod writer;

#[cfg(test)]
pub mod tests;

pub use current::CurrentSnapshot;
pub use index::{ArchiveIndex, IndexRecord, SnapshotMeta};
pub use layout::StoreLayout;
pub use lock::StoreLock;

#[derive(Debug)]
pub struct ArchiveStore {
    layout: StoreLayout,

    /// Persisted index, mirrored in memory for readers
    index: RwLock<ArchiveIndex>,

    /// Serializes writers within the process; holds the last allocated stamp
    writer: Mutex<Option<Stamp>>,

    /// Bytes that must stay free on the store's disk after a put
    reserve_bytes: u64,
}

impl ArchiveStore {
    /// Open (or create) a store rooted at `root`
    ///
    /// Loads the index, rebuilding it from snapshot metadata when the file is
    /// missing, and removes orphaned staging and snapshot directories.
    pub fn open(root: &Path, min_free_space_mb: u64) -> Result<Self> {
        let start_time = Instant::now();
        let layout = StoreLayout::new(root);
        layout.ensure_dirs()?;
        let lock = StoreLock::acquire(&layout.lock_path())?;

        let index = match ArchiveIndex::load(&layout.index_path())? {
            Some(index) => index,
            None => {
                let recovered = gc::recover_index(&layout)?;
                if !recovered.entries.is_empty() {
                    recovered.persist(&layout.index_path())?;
                }
                recovered
            }
        };
        gc::collect_orphans(&layout, &index)?;
        drop(lock);

        info!(
            "Opened archive store at {} with {} entries (current: {}) in {:.2}s",
            root.display(),
            index.entries.len(),
            index
                .current
                .as_ref()
                .map_or_else(|| "none".to_string(), Stamp::to_string),
            start_time.elapsed().as_secs_f64()
        );

        let last_stamp = index.latest_stamp().cloned();
        Ok(Self {
            layout,
            index: RwLock::new(index),
            writer: Mutex::new(last_stamp),
            reserve_bytes: min_free_space_mb.saturating_mul(1024 * 1024),
        })
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    fn read_index(&self) -> RwLockReadGuard<'_, ArchiveIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the writer locks and bring the mirror up to date with disk
    fn lock_writer(&self) -> Result<WriterGuard<'_>> {
        let last_stamp = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let file_lock = StoreLock::acquire(&self.layout.lock_path())?;
        self.reload_index()?;
        Ok(WriterGuard {
            last_stamp,
            _file_lock: file_lock,
        })
    }

    /// Replace the mirror with the index on disk, if there is one
    fn reload_index(&self) -> Result<()> {
        if let Some(index) = ArchiveIndex::load(&self.layout.index_path())? {
            *self.index.write().unwrap_or_else(PoisonError::into_inner) = index;
        }
        Ok(())
    }

    /// Pick up changes other processes made to the store
    pub fn refresh(&self) -> Result<()> {
        self.reload_index()
    }

    /// Apply `change` to a copy of the index, persist it, then publish it
    ///
    /// Callers must hold the writer guard.
    fn commit<T>(&self, change: impl FnOnce(&mut ArchiveIndex) -> Result<T>) -> Result<T> {
        let mut next = self.read_index().clone();
        let outcome = change(&mut next)?;
        next.persist(&self.layout.index_path())?;
        *self.index.write().unwrap_or_else(PoisonError::into_inner) = next;
        Ok(outcome)
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    pub fn is_empty(&self) -> bool {
        self.read_index().entries.is_empty()
    }

    pub fn current_stamp(&self) -> Option<Stamp> {
        self.read_index().current.clone()
    }

    pub fn current_entry(&self) -> Option<ArchiveEntry> {
        let index = self.read_index();
        index.current.as_ref().and_then(|stamp| index.entry(stamp))
    }

    pub fn default_stamp(&self) -> Option<Stamp> {
        self.read_index().default_stamp().cloned()
    }

    pub fn get(&self, stamp: &Stamp) -> Result<ArchiveEntry> {
        self.read_index()
            .entry(stamp)
            .ok_or_else(|| DatasetError::not_found(stamp.as_str()))
    }

    /// All entries, newest first, read from the index only
    pub fn list(&self) -> Vec<ArchiveEntry> {
        self.read_index().entries_newest_first()
    }

    pub fn snapshot_dir(&self, stamp: &Stamp) -> Result<PathBuf> {
        if !self.read_index().entries.contains_key(stamp) {
            return Err(DatasetError::not_found(stamp.as_str()));
        }
        Ok(self.layout.snapshot_dir(stamp))
    }

    /// Read a stored snapshot back into memory
    pub fn load_snapshot(&self, stamp: &Stamp) -> Result<Snapshot> {
        let dir = self.snapshot_dir(stamp)?;
        writer::read_snapshot(&dir)
    }

    pub fn current_snapshot(&self) -> Option<CurrentSnapshot> {
        let entry = self.current_entry()?;
        Some(CurrentSnapshot {
            dir: self.layout.snapshot_dir(&entry.stamp),
            stamp: entry.stamp,
            name: entry.name,
            summary: entry.summary,
        })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Store a snapshot under a freshly allocated stamp without activating it
    ///
    /// The snapshot becomes visible only once its directory is complete and
    /// the index has been persisted. Any failure leaves the index untouched.
    pub fn put(&self, snapshot: &Snapshot, name: &str, is_default: bool) -> Result<Stamp> {
        let mut guard = self.lock_writer()?;
        let (stamp, _) =
            self.insert(&mut guard.last_stamp, snapshot, name, is_default, false, &|| false)?;
        Ok(stamp)
    }

    /// Store a snapshot and make it current in the same index write
    ///
    /// `prepare` sees the current entry under the writer locks and returns the
    /// snapshot and its name. When `is_abandoned` reports true after the
    /// directory is written, the directory is removed and nothing is indexed,
    /// so an abandoned upload never shows up as an archive. Returns the new
    /// stamp and the previously current one.
    pub fn put_current<F>(
        &self,
        is_default: bool,
        prepare: F,
        is_abandoned: &dyn Fn() -> bool,
    ) -> Result<(Stamp, Option<Stamp>)>
    where
        F: FnOnce(Option<&ArchiveEntry>) -> Result<(Snapshot, String)>,
    {
        let mut guard = self.lock_writer()?;
        let current = self.current_entry();
        let (snapshot, name) = prepare(current.as_ref())?;
        self.insert(
            &mut guard.last_stamp,
            &snapshot,
            &name,
            is_default,
            true,
            is_abandoned,
        )
    }

    /// Callers must hold the writer guard
    fn insert(
        &self,
        last_stamp: &mut Option<Stamp>,
        snapshot: &Snapshot,
        name: &str,
        is_default: bool,
        make_current: bool,
        is_abandoned: &dyn Fn() -> bool,
    ) -> Result<(Stamp, Option<Stamp>)> {
        let start_time = Instant::now();

        if is_default {
            if let Some(existing) = self.default_stamp() {
                return Err(DatasetError::storage_message(format!(
                    "A default dataset already exists ({})",
                    existing
                )));
            }
        }

        writer::check_free_space(
            self.layout.root(),
            snapshot.estimated_bytes(),
            self.reserve_bytes,
        )?;

        // Other processes may have allocated newer stamps
        let on_disk = self.read_index().latest_stamp().cloned();
        let floor = std::cmp::max(last_stamp.clone(), on_disk);
        let (stamp, created_at) = Stamp::next_after(floor.as_ref(), Utc::now());
        let record = IndexRecord {
            name: name.to_string(),
            created_at,
            is_default,
            summary: snapshot.summary(),
        };
        let meta = SnapshotMeta {
            stamp: stamp.clone(),
            record: record.clone(),
        };

        let dir = writer::write_snapshot(&self.layout, &stamp, snapshot, &meta)?;
        *last_stamp = Some(stamp.clone());

        if is_abandoned() {
            warn!("Discarding {} before indexing; the write was abandoned", stamp);
            writer::remove_dir_quietly(&dir);
            return Err(DatasetError::cancelled(format!(
                "{} was abandoned before it was indexed",
                stamp
            )));
        }

        let committed = self.commit(|index| {
            if index.entries.contains_key(&stamp) {
                return Err(DatasetError::storage_message(format!(
                    "Stamp {} is already taken",
                    stamp
                )));
            }
            index.entries.insert(stamp.clone(), record);
            if make_current {
                Ok(index.current.replace(stamp.clone()))
            } else {
                Ok(index.current.clone())
            }
        });
        let previous = match committed {
            Ok(previous) => previous,
            Err(e) => {
                writer::remove_dir_quietly(&dir);
                return Err(e);
            }
        };

        info!(
            "Stored snapshot {} '{}' ({} days{}) in {:.2}s",
            stamp,
            name,
            snapshot.days.len(),
            if make_current { ", now current" } else { "" },
            start_time.elapsed().as_secs_f64()
        );
        Ok((stamp, previous))
    }

    /// Point the current pointer at `stamp`; returns the previous current entry
    pub fn mark_current(&self, stamp: &Stamp) -> Result<Option<Stamp>> {
        let _writer = self.lock_writer()?;
        let previous = self.commit(|index| {
            if !index.entries.contains_key(stamp) {
                return Err(DatasetError::not_found(stamp.as_str()));
            }
            Ok(index.current.replace(stamp.clone()))
        })?;
        info!(
            "Current dataset is now {} (was {})",
            stamp,
            previous
                .as_ref()
                .map_or_else(|| "none".to_string(), Stamp::to_string)
        );
        Ok(previous)
    }

    /// Remove one non-default, non-current entry
    pub fn delete(&self, stamp: &Stamp) -> Result<()> {
        let _writer = self.lock_writer()?;
        self.commit(|index| {
            let record = index
                .entries
                .get(stamp)
                .ok_or_else(|| DatasetError::not_found(stamp.as_str()))?;
            if record.is_default {
                return Err(DatasetError::cannot_delete_default(stamp.as_str()));
            }
            if index.current.as_ref() == Some(stamp) {
                return Err(DatasetError::cannot_delete_current(stamp.as_str()));
            }
            index.entries.remove(stamp);
            Ok(())
        })?;
        writer::remove_dir_quietly(&self.layout.snapshot_dir(stamp));
        info!("Deleted archive {}", stamp);
        Ok(())
    }

    /// Remove every entry that is neither default nor current
    pub fn clear(&self) -> Result<usize> {
        let _writer = self.lock_writer()?;
        let removed = self.commit(|index| {
            let doomed: Vec<Stamp> = index
                .entries
                .iter()
                .filter(|(stamp, record)| {
                    !record.is_default && index.current.as_ref() != Some(*stamp)
                })
                .map(|(stamp, _)| stamp.clone())
                .collect();
            for stamp in &doomed {
                index.entries.remove(stamp);
            }
            Ok(doomed)
        })?;
        for stamp in &removed {
            debug!("Removing cleared archive {}", stamp);
            writer::remove_dir_quietly(&self.layout.snapshot_dir(stamp));
        }
        info!("Cleared {} archive(s)", removed.len());
        Ok(removed.len())
    }

    /// Remove staging leftovers and unreferenced snapshot directories
    pub fn collect_orphans(&self) -> Result<usize> {
        let _writer = self.lock_writer()?;
        let index = self.read_index().clone();
        gc::collect_orphans(&self.layout, &index)
    }
}

/// Both writer locks; the in-process mutex is always taken first
struct WriterGuard<'a> {
    last_stamp: MutexGuard<'a, Option<Stamp>>,
    _file_lock: StoreLock,
}
