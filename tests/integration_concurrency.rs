//! Concurrent transitions against one store
//!
//! Readers must never observe zero or two current entries while applies,
//! reverts and uploads race each other, and two managers opened on the same
//! data root (as two CLI invocations would) must not lose each other's writes.

mod common;

use common::{config, full_upload, open};
use rail_dataset_manager::{Stamp, UploadRequest, VersionManager};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_applies_leave_exactly_one_current() {
    let temp_dir = TempDir::new().unwrap();
    let manager = Arc::new(open(&temp_dir).await);
    let cancel = CancellationToken::new();

    let mut stamps: Vec<Stamp> = Vec::new();
    for day in ["2024-06-01", "2024-07-01", "2024-08-01"] {
        let outcome = manager
            .upload(UploadRequest::new(full_upload(&[day])), &cancel)
            .await
            .unwrap();
        stamps.push(outcome.applied_stamp);
    }
    // Current is the last upload; race applies of the two before it
    let (first, second) = (stamps[0].clone(), stamps[1].clone());

    let stop = Arc::new(AtomicBool::new(false));
    let observations = Arc::new(AtomicUsize::new(0));
    let reader = {
        let manager = Arc::clone(&manager);
        let stop = Arc::clone(&stop);
        let observations = Arc::clone(&observations);
        tokio::task::spawn_blocking(move || {
            while !stop.load(Ordering::Relaxed) {
                let current = manager
                    .list_archives()
                    .iter()
                    .filter(|archive| archive.is_current)
                    .count();
                assert_eq!(current, 1, "list() showed {} current entries", current);
                observations.fetch_add(1, Ordering::Relaxed);
            }
        })
    };

    for _ in 0..10 {
        let a = {
            let manager = Arc::clone(&manager);
            let stamp = first.clone();
            tokio::spawn(async move { manager.apply_archive(stamp.as_str()).await })
        };
        let b = {
            let manager = Arc::clone(&manager);
            let stamp = second.clone();
            tokio::spawn(async move { manager.apply_archive(stamp.as_str()).await })
        };
        let outcomes = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];
        let current = manager.data_info().current_stamp.unwrap();
        assert!(current == first || current == second);

        // One apply ran after the other and displaced it
        let last = outcomes.iter().find(|o| o.new_current_stamp == current).unwrap();
        let other = outcomes.iter().find(|o| o.new_current_stamp != current).unwrap();
        assert!(last.changed && other.changed);
        assert_eq!(last.previous_stamp.as_ref(), Some(&other.new_current_stamp));
        assert_eq!(other.previous_stamp.as_ref(), Some(&stamps[2]));

        manager.revert(Some(stamps[2].as_str())).await.unwrap();
    }

    stop.store(true, Ordering::Relaxed);
    reader.await.unwrap();
    assert!(observations.load(Ordering::Relaxed) > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_are_serialized() {
    let temp_dir = TempDir::new().unwrap();
    let manager = Arc::new(open(&temp_dir).await);

    let handles: Vec<_> = ["2024-06-01", "2024-07-01", "2024-08-01", "2024-09-01"]
        .into_iter()
        .map(|day| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                manager
                    .upload(
                        UploadRequest::new(full_upload(&[day])),
                        &CancellationToken::new(),
                    )
                    .await
            })
        })
        .collect();

    let mut applied = Vec::new();
    for handle in handles {
        applied.push(handle.await.unwrap().unwrap().applied_stamp);
    }

    let archives = manager.list_archives();
    assert_eq!(archives.len(), 5);
    assert_eq!(archives.iter().filter(|a| a.is_current).count(), 1);

    // Stamps are unique and the current entry is the last one activated
    applied.sort();
    applied.dedup();
    assert_eq!(applied.len(), 4);
    let current = manager.data_info().current_stamp.unwrap();
    assert!(applied.contains(&current));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_managers_on_one_root_keep_every_upload() {
    let temp_dir = TempDir::new().unwrap();
    let first = Arc::new(open(&temp_dir).await);
    let second = Arc::new(VersionManager::open(config(&temp_dir)).await.unwrap());
    let cancel = CancellationToken::new();

    // Sequential: the second manager must see the first one's upload
    let a = first
        .upload(UploadRequest::new(full_upload(&["2024-06-01"])), &cancel)
        .await
        .unwrap();
    let b = second
        .upload(UploadRequest::new(full_upload(&["2024-07-01"])), &cancel)
        .await
        .unwrap();
    assert_eq!(b.previous_stamp, Some(a.applied_stamp.clone()));

    // Concurrent: both uploads survive with distinct stamps
    let handles: Vec<_> = [(Arc::clone(&first), "2024-08-01"), (Arc::clone(&second), "2024-09-01")]
        .into_iter()
        .map(|(manager, day)| {
            tokio::spawn(async move {
                manager
                    .upload(
                        UploadRequest::new(full_upload(&[day])),
                        &CancellationToken::new(),
                    )
                    .await
            })
        })
        .collect();
    let mut applied = vec![a.applied_stamp, b.applied_stamp];
    for handle in handles {
        applied.push(handle.await.unwrap().unwrap().applied_stamp);
    }

    let reopened = VersionManager::open(config(&temp_dir)).await.unwrap();
    let archives = reopened.list_archives();
    assert_eq!(archives.len(), 5);
    assert_eq!(archives.iter().filter(|a| a.is_current).count(), 1);
    for stamp in &applied {
        assert!(archives.iter().any(|archive| &archive.stamp == stamp));
    }
    applied.sort();
    applied.dedup();
    assert_eq!(applied.len(), 4);
}
