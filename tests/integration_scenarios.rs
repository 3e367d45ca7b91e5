//! End-to-end dataset lifecycle tests against a real on-disk store

mod common;

use chrono::NaiveDate;
use common::{STATIONS, config, days_zip, full_upload, open, trains_csv, zip_bytes};
use rail_dataset_manager::{
    DatasetError, DatasetState, ErrorKind, TrainArchive, UploadFile, UploadPayload,
    UploadRequest, VersionManager,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_fresh_store_seeds_default_as_current() {
    let temp_dir = TempDir::new().unwrap();
    let manager = open(&temp_dir).await;

    let archives = manager.list_archives();
    assert_eq!(archives.len(), 1);
    assert!(archives[0].is_default);
    assert!(archives[0].is_current);
    assert!(matches!(manager.state(), DatasetState::Ready(_)));

    let range = manager.dataset_range().unwrap();
    assert_eq!(range.start_date, date(2024, 1, 1));
    assert_eq!(range.end_date, date(2024, 1, 3));
}

#[tokio::test]
async fn test_upload_then_revert_restores_default() {
    let temp_dir = TempDir::new().unwrap();
    let manager = open(&temp_dir).await;
    let default_stamp = manager.data_info().current_stamp.unwrap();

    // Upload becomes current, the default stays archived
    let request = UploadRequest::new(full_upload(&["2024-06-01", "2024-06-02"])).with_name("June");
    let outcome = manager.upload(request, &CancellationToken::new()).await.unwrap();

    let archives = manager.list_archives();
    assert_eq!(archives.len(), 2);
    let uploaded = archives.iter().find(|a| a.stamp == outcome.applied_stamp).unwrap();
    let default = archives.iter().find(|a| a.stamp == default_stamp).unwrap();
    assert!(uploaded.is_current && !uploaded.is_default);
    assert!(default.is_default && !default.is_current);
    assert_eq!(default.start_date, Some(date(2024, 1, 1)));
    assert_eq!(outcome.precompute_range.unwrap().start_date, date(2024, 6, 1));

    // Revert without a target goes back to the default
    let reverted = manager.revert(None).await.unwrap();
    assert!(reverted.changed);
    assert_eq!(reverted.new_current_stamp, default_stamp);
    assert_eq!(reverted.previous_stamp, Some(outcome.applied_stamp));

    let archives = manager.list_archives();
    assert_eq!(archives.len(), 2);
    assert_eq!(archives.iter().filter(|a| a.is_current).count(), 1);
    assert_eq!(manager.data_info().dataset_name.as_deref(), Some("Bundled dataset"));
}

#[tokio::test]
async fn test_malformed_day_leaves_store_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let manager = open(&temp_dir).await;
    let before = manager.list_archives();

    let bad_day = trains_csv("2024-06-02").replace("t1,2,2,2", "t1,2,late,2");
    let package = zip_bytes(&[
        ("2024-06-01/trains.csv".to_string(), trains_csv("2024-06-01").into_bytes()),
        ("2024-06-02/trains.csv".to_string(), bad_day.into_bytes()),
    ]);
    let payload = UploadPayload::Full {
        stations: UploadFile::new("stations.csv", STATIONS),
        archive: TrainArchive::Zip(UploadFile::new("days.zip", package)),
    };

    let error = manager
        .upload(UploadRequest::new(payload), &CancellationToken::new())
        .await
        .unwrap_err();

    match &error {
        DatasetError::MalformedTrainDay { date: bad, .. } => assert_eq!(*bad, date(2024, 6, 2)),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(manager.list_archives(), before);

    let snapshots = std::fs::read_dir(temp_dir.path().join("store").join("snapshots"))
        .unwrap()
        .count();
    assert_eq!(snapshots, 1);
}

#[tokio::test]
async fn test_rejected_uploads_report_their_kind() {
    let temp_dir = TempDir::new().unwrap();
    let manager = open(&temp_dir).await;
    let cancel = CancellationToken::new();

    let duplicate = UploadFile::new("stations.csv", "code,region\nS01,1\nS01,2\n");
    let error = manager
        .upload(UploadRequest::new(UploadPayload::StationsOnly(duplicate)), &cancel)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MalformedStations);

    let not_a_zip = UploadFile::new("days.zip", b"plain text".to_vec());
    let error = manager
        .upload(
            UploadRequest::new(UploadPayload::ArchiveOnly(TrainArchive::Zip(not_a_zip))),
            &cancel,
        )
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MalformedPackage);

    assert_eq!(
        UploadPayload::from_parts(None, None).unwrap_err().kind(),
        ErrorKind::EmptyUpload
    );
    assert_eq!(manager.list_archives().len(), 1);
}

#[tokio::test]
async fn test_delete_boundaries() {
    let temp_dir = TempDir::new().unwrap();
    let manager = open(&temp_dir).await;
    let cancel = CancellationToken::new();
    let default_stamp = manager.data_info().current_stamp.unwrap();

    let first = manager
        .upload(UploadRequest::new(full_upload(&["2024-06-01"])), &cancel)
        .await
        .unwrap();
    let second = manager
        .upload(UploadRequest::new(full_upload(&["2024-07-01"])), &cancel)
        .await
        .unwrap();

    let error = manager
        .delete_archive(default_stamp.as_str())
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::CannotDeleteDefault);

    let error = manager
        .delete_archive(second.applied_stamp.as_str())
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::CannotDeleteCurrent);

    let error = manager
        .delete_archive("20000101T000000.000Z")
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);

    manager
        .delete_archive(first.applied_stamp.as_str())
        .await
        .unwrap();
    assert_eq!(manager.list_archives().len(), 2);

    let error = manager
        .apply_archive(first.applied_stamp.as_str())
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_clear_keeps_default_and_current() {
    let temp_dir = TempDir::new().unwrap();
    let manager = open(&temp_dir).await;
    let cancel = CancellationToken::new();

    for month in ["2024-06-01", "2024-07-01", "2024-08-01"] {
        manager
            .upload(UploadRequest::new(full_upload(&[month])), &cancel)
            .await
            .unwrap();
    }
    let current = manager.data_info().current_stamp.unwrap();

    let cleared = manager.clear_archives().await.unwrap();
    assert_eq!(cleared.deleted_count, 2);

    let archives = manager.list_archives();
    assert_eq!(archives.len(), 2);
    assert!(archives.iter().any(|a| a.is_default));
    assert!(archives.iter().any(|a| a.is_current && a.stamp == current));

    let again = manager.clear_archives().await.unwrap();
    assert_eq!(again.deleted_count, 0);
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let applied = {
        let manager = open(&temp_dir).await;
        let request = UploadRequest::new(UploadPayload::ArchiveOnly(TrainArchive::Zip(
            days_zip(&["2024-06-01", "2024-06-02"]),
        )))
        .with_name("June");
        manager
            .upload(request, &CancellationToken::new())
            .await
            .unwrap()
            .applied_stamp
    };

    let manager = VersionManager::open(config(&temp_dir)).await.unwrap();
    let info = manager.data_info();
    assert_eq!(info.current_stamp, Some(applied));
    assert_eq!(info.dataset_name.as_deref(), Some("June"));
    assert_eq!(info.available_min_date, Some(date(2024, 6, 1)));
    assert_eq!(manager.list_archives().len(), 2);

    // Station table was carried over from the seed
    let snapshot = manager.current_snapshot().unwrap();
    assert_eq!(snapshot.summary.station_count, Some(3));
    assert!(snapshot.stations_path().unwrap().is_file());
    assert_eq!(
        snapshot
            .train_day_paths(date(2024, 6, 1), date(2024, 6, 30))
            .len(),
        2
    );
}

#[tokio::test]
async fn test_revert_apply_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let manager = open(&temp_dir).await;
    let uploaded = manager
        .upload(
            UploadRequest::new(full_upload(&["2024-06-01"])),
            &CancellationToken::new(),
        )
        .await
        .unwrap()
        .applied_stamp;

    let reverted = manager.revert(None).await.unwrap();
    let applied = manager.apply_archive(uploaded.as_str()).await.unwrap();
    assert_eq!(applied.new_current_stamp, uploaded);
    assert_eq!(applied.previous_stamp, Some(reverted.new_current_stamp));

    let error = manager.apply_archive(uploaded.as_str()).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::AlreadyCurrent);
}

#[tokio::test]
async fn test_cancelled_upload_is_not_stored() {
    let temp_dir = TempDir::new().unwrap();
    let manager = open(&temp_dir).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let error = manager
        .upload(UploadRequest::new(full_upload(&["2024-06-01"])), &cancel)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Cancelled);
    assert_eq!(manager.list_archives().len(), 1);
}
