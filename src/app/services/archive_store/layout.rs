//! On-disk layout of the archive store

use crate::app::models::Stamp;
use crate::constants::{
    INDEX_FILE_NAME, LOCK_FILE_NAME, SNAPSHOTS_DIR_NAME, STAGING_DIR_NAME, STAGING_SUFFIX,
};
use crate::error::{DatasetError, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the store root and its subdirectories when missing
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.root.clone(), self.snapshots_dir(), self.staging_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                DatasetError::storage(format!("Failed to create '{}'", dir.display()), e)
            })?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE_NAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.root.join(SNAPSHOTS_DIR_NAME)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR_NAME)
    }

    pub fn snapshot_dir(&self, stamp: &Stamp) -> PathBuf {
        self.snapshots_dir().join(stamp.as_str())
    }

    pub fn staging_dir_for(&self, stamp: &Stamp) -> PathBuf {
        self.staging_dir()
            .join(format!("{}{}", stamp.as_str(), STAGING_SUFFIX))
    }
}
