//! Revert, apply, delete and clear

use super::VersionManager;
use crate::app::models::{ClearOutcome, Stamp, SwitchOutcome};
use crate::error::{DatasetError, Result};
use std::sync::Arc;
use tracing::info;

impl VersionManager {
    /// Make an older entry current again
    ///
    /// Without a target the newest non-current entry is chosen. Naming the
    /// entry that is already current succeeds with `changed: false`.
    pub async fn revert(&self, target: Option<&str>) -> Result<SwitchOutcome> {
        let target = target.map(Stamp::parse).transpose()?;
        let _guard = self.begin_mutation().await?;
        let current = self.store.current_stamp();

        let target = match target {
            Some(stamp) => {
                self.store.get(&stamp)?;
                stamp
            }
            None => self
                .store
                .list()
                .into_iter()
                .find(|entry| !entry.is_current)
                .map(|entry| entry.stamp)
                .ok_or_else(|| DatasetError::not_found("no earlier archive to revert to"))?,
        };

        if current.as_ref() == Some(&target) {
            info!("Revert target {} is already current", target);
            return Ok(SwitchOutcome {
                new_current_stamp: target,
                previous_stamp: current,
                changed: false,
            });
        }

        self.switch_to(target).await
    }

    /// Make a named archive current; `AlreadyCurrent` when it already is
    pub async fn apply_archive(&self, stamp: &str) -> Result<SwitchOutcome> {
        let target = Stamp::parse(stamp)?;
        let _guard = self.begin_mutation().await?;

        self.store.get(&target)?;
        if self.store.current_stamp().as_ref() == Some(&target) {
            return Err(DatasetError::already_current(target.as_str()));
        }

        self.switch_to(target).await
    }

    /// Callers must hold the mutation lock
    async fn switch_to(&self, target: Stamp) -> Result<SwitchOutcome> {
        let store = Arc::clone(&self.store);
        let next = target.clone();
        let previous_stamp = tokio::task::spawn_blocking(move || store.mark_current(&next)).await??;

        if let Some(entry) = self.store.current_entry() {
            if let Some(span) = entry.summary.date_span() {
                info!(
                    "Serving '{}' ({} to {})",
                    entry.name, span.start, span.end
                );
            }
        }

        Ok(SwitchOutcome {
            new_current_stamp: target,
            previous_stamp,
            changed: true,
        })
    }

    pub async fn delete_archive(&self, stamp: &str) -> Result<()> {
        let target = Stamp::parse(stamp)?;
        let _guard = self.begin_mutation().await?;
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.delete(&target)).await?
    }

    /// Delete every archive except the default and the current entry
    pub async fn clear_archives(&self) -> Result<ClearOutcome> {
        let _guard = self.begin_mutation().await?;
        let store = Arc::clone(&self.store);
        let deleted_count = tokio::task::spawn_blocking(move || store.clear()).await??;
        Ok(ClearOutcome { deleted_count })
    }
}
