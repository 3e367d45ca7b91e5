//! Shared fixtures for archive store tests

use crate::app::models::Snapshot;
use crate::app::services::archive_store::ArchiveStore;
use crate::app::services::validator::stations::validate_stations;
use crate::app::services::validator::tests::{stations_csv, trains_csv};
use crate::app::services::validator::train_day::{parse_date_name, validate_train_day};
use std::collections::BTreeMap;
use tempfile::TempDir;


/// Snapshot with the fixture stations and one table per date
pub fn sample_snapshot(dates: &[&str]) -> Snapshot {
    let stations = validate_stations(stations_csv().as_bytes()).unwrap();
    let days: BTreeMap<_, _> = dates
        .iter()
        .map(|raw| {
            let date = parse_date_name(raw).unwrap();
            (date, validate_train_day(date, trains_csv(raw).as_bytes()).unwrap())
        })
        .collect();
    Snapshot::new(Some(stations), days)
}

pub fn open_store(temp_dir: &TempDir) -> ArchiveStore {
    ArchiveStore::open(&temp_dir.path().join("store"), 0).unwrap()
}
