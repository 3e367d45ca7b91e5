//! Version manager service
//!
//! Orchestrates every dataset transition against the archive store: seeding
//! the bundled default, uploads, revert, apply, delete and clear. Mutating
//! operations are serialized by one async mutex (and by the store's file lock
//! across processes); read accessors go straight to the store's index and
//! never wait for a transition to finish.

use crate::app::models::{
    ArchiveEntry, ArchiveSummary, DataInfo, DatasetRange, DatasetState, Stamp,
};
use crate::app::services::archive_store::{ArchiveStore, CurrentSnapshot};
use crate::app::services::precompute::{PrecomputeTrigger, trigger_from_config};
use crate::app::services::validator::DatasetValidator;
use crate::config::ManagerConfig;
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

pub mod seed;
pub mod switch;
pub mod upload;

#[cfg(test)]
pub mod tests;

pub use upload::UploadRequest;

pub struct VersionManager {
    pub(crate) config: ManagerConfig,
    pub(crate) store: Arc<ArchiveStore>,
    pub(crate) validator: DatasetValidator,
    pub(crate) trigger: Arc<dyn PrecomputeTrigger>,

    /// Serializes upload, revert, apply, delete, clear, seeding and GC
    pub(crate) mutation: Mutex<()>,

    /// Background precompute tasks still running
    pub(crate) background: TaskTracker,
}

impl std::fmt::Debug for VersionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionManager")
            .field("data_root", &self.config.data_root)
            .field("current", &self.store.current_stamp())
            .finish_non_exhaustive()
    }
}

impl VersionManager {
    /// Open the store, seed the default dataset when the store is empty and
    /// restore a current pointer if the index lost it
    pub async fn open(config: ManagerConfig) -> Result<Self> {
        let trigger = trigger_from_config(&config)?;
        Self::open_with_trigger(config, trigger).await
    }

    pub async fn open_with_trigger(
        config: ManagerConfig,
        trigger: Arc<dyn PrecomputeTrigger>,
    ) -> Result<Self> {
        config.validate()?;

        let root = config.data_root.clone();
        let min_free_space_mb = config.min_free_space_mb;
        let store =
            tokio::task::spawn_blocking(move || ArchiveStore::open(&root, min_free_space_mb))
                .await??;

        let manager = Self {
            validator: DatasetValidator::from_config(&config),
            config,
            store: Arc::new(store),
            trigger,
            mutation: Mutex::new(()),
            background: TaskTracker::new(),
        };

        manager.seed_default().await?;
        manager.restore_current_pointer().await?;
        Ok(manager)
    }

    /// Take the mutation lock and pick up what other processes committed
    pub(crate) async fn begin_mutation(&self) -> Result<MutexGuard<'_, ()>> {
        let guard = self.mutation.lock().await;
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.refresh()).await??;
        Ok(guard)
    }

    /// Wait for background precompute tasks started by earlier uploads
    pub async fn wait_for_background_tasks(&self) {
        if self.background.is_empty() {
            return;
        }
        info!("Waiting for {} background precompute task(s)", self.background.len());
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    /// Promote the default entry when entries exist but none is current
    async fn restore_current_pointer(&self) -> Result<()> {
        let _guard = self.begin_mutation().await?;
        if self.store.is_empty() || self.store.current_stamp().is_some() {
            return Ok(());
        }
        match self.store.default_stamp() {
            Some(default) => {
                warn!("No current dataset recorded; promoting default {}", default);
                let store = Arc::clone(&self.store);
                tokio::task::spawn_blocking(move || store.mark_current(&default)).await??;
            }
            None => warn!(
                "Archive store holds {} entries but none is current; apply one explicitly",
                self.store.list().len()
            ),
        }
        Ok(())
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn store(&self) -> &ArchiveStore {
        &self.store
    }

    pub fn state(&self) -> DatasetState {
        match self.store.current_stamp() {
            Some(stamp) => DatasetState::Ready(stamp),
            None => DatasetState::NoDataset,
        }
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    pub fn list_archives(&self) -> Vec<ArchiveSummary> {
        self.store.list().iter().map(ArchiveSummary::from).collect()
    }

    pub fn get_archive(&self, stamp: &str) -> Result<ArchiveEntry> {
        self.store.get(&Stamp::parse(stamp)?)
    }

    pub fn current_snapshot(&self) -> Option<CurrentSnapshot> {
        self.store.current_snapshot()
    }

    /// Date range of the current dataset; `None` without a dataset or without train days
    pub fn dataset_range(&self) -> Option<DatasetRange> {
        let entry = self.store.current_entry()?;
        let span = entry.summary.date_span()?;
        Some(DatasetRange {
            start_date: span.start,
            end_date: span.end,
            dataset_name: entry.name,
        })
    }

    pub fn data_info(&self) -> DataInfo {
        match self.store.current_entry() {
            Some(entry) => DataInfo {
                available_min_date: entry.summary.start_date,
                available_max_date: entry.summary.end_date,
                dataset_name: Some(entry.name),
                current_stamp: Some(entry.stamp),
            },
            None => DataInfo::default(),
        }
    }

    /// Remove orphaned storage left by interrupted writes
    pub async fn collect_garbage(&self) -> Result<usize> {
        let _guard = self.begin_mutation().await?;
        let store = Arc::clone(&self.store);
        let removed = tokio::task::spawn_blocking(move || store.collect_orphans()).await??;
        info!("Garbage collection removed {} item(s)", removed);
        Ok(removed)
    }
}
