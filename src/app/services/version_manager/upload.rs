//! Upload: validate, store, activate, precompute

use super::VersionManager;
use crate::app::models::{
    ArchiveEntry, DateSpan, PrecomputeRange, SnapshotSummary, Stamp, UploadOutcome,
};
use crate::app::services::precompute::{PrecomputeRequest, clamp_range};
use crate::app::services::validator::UploadPayload;
use crate::config::PrecomputeMode;
use crate::constants::UPLOADED_DATASET_NAME;
use crate::error::{DatasetError, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// An operator's upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub payload: UploadPayload,
    /// Display name; when absent, the uploaded date range (or, for a
    /// stations-only upload, the current dataset's name)
    pub dataset_name: Option<String>,
    /// Ask the analytics layer to precompute after activation
    pub precompute: bool,
}

impl UploadRequest {
    pub fn new(payload: UploadPayload) -> Self {
        Self {
            payload,
            dataset_name: None,
            precompute: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = Some(name.into());
        self
    }

    pub fn with_precompute(mut self, precompute: bool) -> Self {
        self.precompute = precompute;
        self
    }
}

/// Operator-supplied name, else the uploaded date range, else the current name
fn dataset_name_for(
    explicit: Option<String>,
    uploaded: Option<DateSpan>,
    current: Option<&ArchiveEntry>,
) -> String {
    if let Some(name) = explicit
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
    {
        return name;
    }
    match (uploaded, current) {
        (Some(span), _) => format!("{} → {}", span.start, span.end),
        (None, Some(entry)) => entry.name.clone(),
        (None, None) => UPLOADED_DATASET_NAME.to_string(),
    }
}

impl VersionManager {
    /// Validate an upload and make it the current dataset
    ///
    /// A halfway upload (stations only, or train days only) is completed with
    /// the other half of the current snapshot. Validation runs before the
    /// mutation lock is taken and leaves the store untouched on failure.
    /// Cancellation, or dropping the returned future, is honored up to the
    /// moment the index is written; the snapshot is stored and activated in
    /// that single write, so an abandoned upload leaves no archive behind.
    pub async fn upload(
        &self,
        request: UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome> {
        let start_time = Instant::now();
        let UploadRequest {
            payload,
            dataset_name,
            precompute,
        } = request;

        let validator = self.validator;
        let validated =
            tokio::task::spawn_blocking(move || validator.validate(&payload)).await??;
        if cancel.is_cancelled() {
            return Err(DatasetError::cancelled("upload cancelled after validation"));
        }

        let guard = self.begin_mutation().await?;
        let carries_days = !validated.snapshot.days.is_empty();
        let uploaded_span = validated.snapshot.summary().date_span();

        // Dropping this future before the index write abandons the stored directory
        let abandoned = cancel.child_token();
        let abandon_on_drop = abandoned.clone().drop_guard();

        let store = Arc::clone(&self.store);
        let (stamp, previous_stamp) = tokio::task::spawn_blocking(move || {
            store.put_current(
                false,
                |current| {
                    let name = dataset_name_for(dataset_name, uploaded_span, current);
                    let mut snapshot = validated.snapshot;
                    if snapshot.is_partial() {
                        if let Some(base) = current {
                            debug!("Completing partial upload from {}", base.stamp);
                            snapshot = snapshot.inherit_missing(store.load_snapshot(&base.stamp)?);
                        }
                    }
                    Ok((snapshot, name))
                },
                &|| abandoned.is_cancelled(),
            )
        })
        .await??;
        abandon_on_drop.disarm();

        let entry = self.store.get(&stamp)?;
        drop(guard);

        info!(
            "Upload activated {} '{}' in {:.2}s",
            stamp,
            entry.name,
            start_time.elapsed().as_secs_f64()
        );

        let (precompute_range, precompute_warning) = if precompute && carries_days {
            self.dispatch_precompute(&stamp, &entry.summary).await
        } else {
            (None, None)
        };

        Ok(UploadOutcome {
            applied_stamp: stamp,
            previous_stamp,
            precompute_range,
            precompute_warning,
            upload_stats: validated.stats,
        })
    }

    /// Fire the precompute trigger for a freshly activated snapshot
    ///
    /// Returns the requested range and, in await mode, the failure message.
    pub(crate) async fn dispatch_precompute(
        &self,
        stamp: &Stamp,
        summary: &SnapshotSummary,
    ) -> (Option<PrecomputeRange>, Option<String>) {
        let Some(span) = summary.date_span() else {
            return (None, None);
        };
        let range = clamp_range(span, self.config.max_range_days);
        if range.clamped_to_max_range {
            info!(
                "Precompute range clamped to {} days: {} to {}",
                self.config.max_range_days, range.start_date, range.end_date
            );
        }

        let snapshot_dir = match self.store.snapshot_dir(stamp) {
            Ok(dir) => dir,
            Err(e) => return (Some(range), Some(e.to_string())),
        };
        let request = PrecomputeRequest {
            stamp: stamp.clone(),
            snapshot_dir,
            range,
        };
        let task = self.trigger.trigger(request);

        match self.config.precompute_mode {
            PrecomputeMode::Await => match task.await {
                Ok(()) => (Some(range), None),
                Err(e) => {
                    warn!("Precompute for {} failed: {:#}", stamp, e);
                    (Some(range), Some(format!("{:#}", e)))
                }
            },
            PrecomputeMode::Background => {
                let stamp = stamp.clone();
                self.background.spawn(async move {
                    if let Err(e) = task.await {
                        warn!("Background precompute for {} failed: {:#}", stamp, e);
                    }
                });
                (Some(range), None)
            }
        }
    }
}
