//! Seeding the bundled default dataset

use super::VersionManager;
use crate::app::models::Stamp;
use crate::constants::SEED_META_FILE_NAME;
use crate::error::{DatasetError, ErrorKind, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct SeedMeta {
    name: Option<String>,
}

/// Name recorded in the seed's metadata file, if any
fn seed_name(dir: &Path) -> Option<String> {
    let path = dir.join(SEED_META_FILE_NAME);
    let raw = std::fs::read(&path).ok()?;
    match serde_json::from_slice::<SeedMeta>(&raw) {
        Ok(meta) => meta
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()),
        Err(e) => {
            warn!("Ignoring unreadable seed metadata {}: {}", path.display(), e);
            None
        }
    }
}

impl VersionManager {
    /// Store the configured seed directory as the default, current entry
    ///
    /// Does nothing when the store already has entries or no seed is configured.
    pub async fn seed_default(&self) -> Result<Option<Stamp>> {
        let _guard = self.begin_mutation().await?;
        if !self.store.is_empty() {
            debug!("Store already populated, skipping seed");
            return Ok(None);
        }
        let Some(seed_dir) = self.config.seed_dir.clone() else {
            info!("No seed directory configured; starting without a dataset");
            return Ok(None);
        };

        info!("Seeding default dataset from {}", seed_dir.display());
        let validator = self.validator;
        let fallback_name = self.config.default_dataset_name.clone();
        let store = Arc::clone(&self.store);

        let seeded = tokio::task::spawn_blocking(move || -> Result<Option<Stamp>> {
            let snapshot = validator.validate_directory(&seed_dir)?;
            let name = seed_name(&seed_dir).unwrap_or(fallback_name);
            store.put_current(
                true,
                |current| {
                    // Another process may have seeded while we validated
                    if current.is_some() {
                        return Err(DatasetError::cancelled("store was populated concurrently"));
                    }
                    Ok((snapshot, name))
                },
                &|| false,
            )
            .map(|(stamp, _)| Some(stamp))
            .or_else(|e| match e.kind() {
                ErrorKind::Cancelled => Ok(None),
                _ => Err(e),
            })
        })
        .await??;

        let Some(stamp) = seeded else {
            info!("Store was seeded by another process");
            return Ok(None);
        };

        info!("Default dataset {} is current", stamp);
        Ok(Some(stamp))
    }
}
