//! Tests for opening and seeding

use super::*;
use crate::app::models::DatasetState;
use crate::app::services::precompute::NoopTrigger;
use chrono::NaiveDate;

#[tokio::test]
async fn test_seed_creates_default_current_entry() {
    let temp_dir = TempDir::new().unwrap();
    let (manager, _) = seeded_manager(&temp_dir).await;

    let archives = manager.list_archives();
    assert_eq!(archives.len(), 1);
    assert!(archives[0].is_default);
    assert!(archives[0].is_current);
    assert_eq!(archives[0].name, "Bundled dataset");
    assert_eq!(archives[0].train_days, 2);
    assert!(matches!(manager.state(), DatasetState::Ready(_)));
}

#[tokio::test]
async fn test_seed_name_comes_from_metadata() {
    let temp_dir = TempDir::new().unwrap();
    let config = seeded_config(&temp_dir);
    std::fs::write(
        temp_dir.path().join("seed/dataset.meta.json"),
        r#"{"name": " Lombardy 2024 ", "created_at": "2024-01-03T00:00:00"}"#,
    )
    .unwrap();

    let manager = VersionManager::open_with_trigger(config, Arc::new(NoopTrigger))
        .await
        .unwrap();
    assert_eq!(manager.data_info().dataset_name.as_deref(), Some("Lombardy 2024"));
}

#[tokio::test]
async fn test_reopen_does_not_seed_twice() {
    let temp_dir = TempDir::new().unwrap();
    let first = {
        let (manager, _) = seeded_manager(&temp_dir).await;
        manager.data_info().current_stamp
    };

    let (manager, _) = seeded_manager(&temp_dir).await;
    assert_eq!(manager.list_archives().len(), 1);
    assert_eq!(manager.data_info().current_stamp, first);
    assert_eq!(manager.seed_default().await.unwrap(), None);
}

#[tokio::test]
async fn test_without_seed_there_is_no_dataset() {
    let temp_dir = TempDir::new().unwrap();
    let config = ManagerConfig::new(temp_dir.path().join("store")).with_min_free_space_mb(0);
    let manager = VersionManager::open_with_trigger(config, Arc::new(NoopTrigger))
        .await
        .unwrap();

    assert_eq!(manager.state(), DatasetState::NoDataset);
    assert_eq!(manager.data_info(), Default::default());
    assert!(manager.dataset_range().is_none());
    assert!(manager.current_snapshot().is_none());
}

#[tokio::test]
async fn test_data_info_and_range_follow_current() {
    let temp_dir = TempDir::new().unwrap();
    let (manager, _) = seeded_manager(&temp_dir).await;

    let info = manager.data_info();
    assert_eq!(info.available_min_date, NaiveDate::from_ymd_opt(2024, 1, 1));
    assert_eq!(info.available_max_date, NaiveDate::from_ymd_opt(2024, 1, 2));

    let range = manager.dataset_range().unwrap();
    assert_eq!(range.dataset_name, "Bundled dataset");
    assert_eq!(range.end_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
}

#[tokio::test]
async fn test_lost_current_pointer_falls_back_to_default() {
    let temp_dir = TempDir::new().unwrap();
    {
        seeded_manager(&temp_dir).await;
    }
    std::fs::remove_file(temp_dir.path().join("store/index.json")).unwrap();

    let (manager, _) = seeded_manager(&temp_dir).await;
    let current = manager.store().current_entry().unwrap();
    assert!(current.is_default);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config = seeded_config(&temp_dir).with_max_range_days(0);
    let error = VersionManager::open_with_trigger(config, Arc::new(NoopTrigger))
        .await
        .unwrap_err();
    assert_eq!(error.kind(), crate::error::ErrorKind::Configuration);
}
