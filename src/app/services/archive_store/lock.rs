//! Cross-process writer lock
//!
//! Every process opening the same store root takes an exclusive advisory lock
//! on `<root>/.lock` before it mutates the index or touches `staging/`.

use crate::error::{DatasetError, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// Held for the duration of one mutation; released when dropped
#[derive(Debug)]
pub struct StoreLock {
    file: File,
}

impl StoreLock {
    /// Block until no other process holds the lock
    pub fn acquire(path: &Path) -> Result<Self> {
        let start_time = Instant::now();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                DatasetError::storage(format!("Failed to open lock file '{}'", path.display()), e)
            })?;
        FileExt::lock_exclusive(&file).map_err(|e| {
            DatasetError::storage(format!("Failed to lock '{}'", path.display()), e)
        })?;

        let waited = start_time.elapsed();
        if waited.as_millis() > 100 {
            debug!("Waited {:.2}s for the store lock", waited.as_secs_f64());
        }
        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // Closing the handle releases the lock as well
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!("Failed to release store lock: {}", e);
        }
    }
}
