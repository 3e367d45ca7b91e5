//! Tests for the validator entry points

use super::*;
use crate::app::services::validator::DatasetValidator;
use crate::constants::DEFAULT_MAX_PACKAGE_BYTES;
use crate::error::ErrorKind;
use chrono::NaiveDate;
use tempfile::TempDir;

fn validator() -> DatasetValidator {
    DatasetValidator::new(DEFAULT_MAX_PACKAGE_BYTES)
}

#[test]
fn test_payload_requires_one_half() {
    let error = UploadPayload::from_parts(None, None).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::EmptyUpload);

    let payload = UploadPayload::from_parts(Some(stations_upload()), None).unwrap();
    assert!(matches!(payload, UploadPayload::StationsOnly(_)));
    assert!(payload.archive().is_none());
}

#[test]
fn test_full_upload_statistics() {
    let validated = validator()
        .validate(&full_payload(&["2024-05-02", "2024-05-01"]))
        .unwrap();

    let stats = &validated.stats;
    assert!(stats.stations_uploaded);
    assert_eq!(
        stats.train_dates,
        vec![
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 2).unwrap()
        ]
    );
    assert_eq!(stats.date_range.unwrap().days(), 2);

    let summary = validated.snapshot.summary();
    assert_eq!(summary.station_count, Some(2));
    assert_eq!(summary.total_records(), 6);
}

#[test]
fn test_stations_only_upload_has_no_days() {
    let payload = UploadPayload::StationsOnly(stations_upload());
    let validated = validator().validate(&payload).unwrap();

    assert!(validated.snapshot.days.is_empty());
    assert!(validated.snapshot.is_partial());
    assert!(validated.stats.date_range.is_none());
}

#[test]
fn test_separate_stations_file_wins_over_package_copy() {
    let packaged = format!("{}\nP01,3,Packaged,P,,\n", STATIONS_HEADER);
    let day = trains_csv("2024-05-01");
    let bytes = build_zip(&[
        ("stations.csv", packaged.as_bytes()),
        ("2024-05-01/trains.csv", day.as_bytes()),
    ]);
    let archive = TrainArchive::Zip(UploadFile::new("d.zip", bytes));

    let payload = UploadPayload::from_parts(Some(stations_upload()), Some(archive.clone())).unwrap();
    let validated = validator().validate(&payload).unwrap();
    let stations = validated.snapshot.stations.unwrap();
    assert_eq!(stations.rows[0][0], "S01");

    let payload = UploadPayload::ArchiveOnly(archive);
    let validated = validator().validate(&payload).unwrap();
    assert_eq!(validated.snapshot.stations.unwrap().rows[0][0], "P01");
    assert!(validated.stats.stations_uploaded);
}

#[test]
fn test_bad_stations_fail_even_with_good_archive() {
    let payload = UploadPayload::Full {
        stations: UploadFile::new("stations.csv", "code\nS01\nS01\n"),
        archive: TrainArchive::Zip(dataset_zip("", &["2024-05-01"])),
    };
    let error = validator().validate(&payload).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::MalformedStations);
}

#[test]
fn test_validate_directory() {
    let temp_dir = TempDir::new().unwrap();
    write_dataset_dir(temp_dir.path(), &["2024-01-01", "2024-01-02", "2024-01-03"], true);

    let snapshot = validator().validate_directory(temp_dir.path()).unwrap();
    assert_eq!(snapshot.days.len(), 3);
    assert!(snapshot.stations.is_some());
}
