//! Shared fixtures for version manager tests

use crate::app::services::precompute::{PrecomputeRequest, PrecomputeTrigger};
use crate::app::services::validator::tests::write_dataset_dir;
use crate::app::services::version_manager::VersionManager;
use crate::config::ManagerConfig;
use futures::future::{BoxFuture, FutureExt};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub mod seed_tests;

/// Remembers every request it receives
#[derive(Debug, Default, Clone)]
pub struct RecordingTrigger {
    pub requests: Arc<Mutex<Vec<PrecomputeRequest>>>,
}

impl RecordingTrigger {
    pub fn recorded(&self) -> Vec<PrecomputeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl PrecomputeTrigger for RecordingTrigger {
    fn trigger(&self, request: PrecomputeRequest) -> BoxFuture<'static, anyhow::Result<()>> {
        self.requests.lock().unwrap().push(request);
        futures::future::ready(Ok(())).boxed()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FailingTrigger;

impl PrecomputeTrigger for FailingTrigger {
    fn trigger(&self, _request: PrecomputeRequest) -> BoxFuture<'static, anyhow::Result<()>> {
        futures::future::ready(Err(anyhow::anyhow!("analytics backend unavailable"))).boxed()
    }
}

pub const SEED_DATES: &[&str] = &["2024-01-01", "2024-01-02"];

/// Config with a two-day seed dataset under `temp_dir`
pub fn seeded_config(temp_dir: &TempDir) -> ManagerConfig {
    let seed = temp_dir.path().join("seed");
    write_dataset_dir(&seed, SEED_DATES, true);
    ManagerConfig::new(temp_dir.path().join("store"))
        .with_seed_dir(seed)
        .with_min_free_space_mb(0)
}

pub async fn seeded_manager(temp_dir: &TempDir) -> (VersionManager, RecordingTrigger) {
    let trigger = RecordingTrigger::default();
    let manager = VersionManager::open_with_trigger(seeded_config(temp_dir), Arc::new(trigger.clone()))
        .await
        .unwrap();
    (manager, trigger)
}
