//! Shared fixtures for validator tests
//!
//! Other service tests reuse these to build payloads and snapshots.

use crate::app::services::validator::{TrainArchive, UploadFile, UploadPayload};
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;

pub mod validator_tests;

pub const STATIONS_HEADER: &str = "code,region,long_name,short_name,latitude,longitude";

pub const TRAINS_HEADER: &str = "train_hash,stop_number,arrival_delay,departure_delay,crowding,day,stop_station_code,client_code,phantom,trenord_phantom";

/// Two-station table in the export layout
pub fn stations_csv() -> String {
    format!(
        "{}\nS01,1,Milano Centrale,Milano C.,45.4861,9.2045\nS02,1,Bergamo,Bergamo,45.6906,9.6751\n",
        STATIONS_HEADER
    )
}

/// Three stop records for two trains on `day`
pub fn trains_csv(day: &str) -> String {
    format!(
        "{header}\n\
         a1,1,0,2,10,{day},S01,TN,0,0\n\
         a1,2,3,4,15,{day},S02,TN,0,0\n\
         b7,1,,-1,,{day},S02,TN,0,0\n",
        header = TRAINS_HEADER,
        day = day
    )
}

pub fn stations_upload() -> UploadFile {
    UploadFile::new("stations.csv", stations_csv())
}

/// Build an in-memory ZIP; names ending in `/` become directory entries
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, bytes) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(bytes).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// ZIP upload with one `trains.csv` per date under `prefix`
pub fn dataset_zip(prefix: &str, dates: &[&str]) -> UploadFile {
    let contents: Vec<(String, String)> = dates
        .iter()
        .map(|date| (format!("{}{}/trains.csv", prefix, date), trains_csv(date)))
        .collect();
    let entries: Vec<(&str, &[u8])> = contents
        .iter()
        .map(|(name, body)| (name.as_str(), body.as_bytes()))
        .collect();
    UploadFile::new("dataset.zip", build_zip(&entries))
}

pub fn archive_payload(dates: &[&str]) -> UploadPayload {
    UploadPayload::ArchiveOnly(TrainArchive::Zip(dataset_zip("", dates)))
}

pub fn full_payload(dates: &[&str]) -> UploadPayload {
    UploadPayload::Full {
        stations: stations_upload(),
        archive: TrainArchive::Zip(dataset_zip("", dates)),
    }
}

/// Write a dataset directory (optionally with a stations table) under `root`
pub fn write_dataset_dir(root: &Path, dates: &[&str], with_stations: bool) {
    fs::create_dir_all(root).unwrap();
    if with_stations {
        fs::write(root.join("stations.csv"), stations_csv()).unwrap();
    }
    for date in dates {
        let day_dir = root.join(date);
        fs::create_dir_all(&day_dir).unwrap();
        fs::write(day_dir.join("trains.csv"), trains_csv(date)).unwrap();
    }
}
