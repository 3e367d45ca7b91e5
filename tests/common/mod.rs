//! Shared fixtures for integration tests

#![allow(dead_code)]

use rail_dataset_manager::{
    ManagerConfig, TrainArchive, UploadFile, UploadPayload, VersionManager,
};
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

pub const STATIONS: &str = "code,region,long_name,short_name,latitude,longitude\n\
S01,1,Milano Centrale,Milano C.,45.4861,9.2045\n\
S02,1,Bergamo,Bergamo,45.6906,9.6751\n\
S03,3,Brescia,Brescia,45.5324,10.2130\n";

pub fn trains_csv(day: &str) -> String {
    format!(
        "train_hash,stop_number,arrival_delay,departure_delay,crowding,day,stop_station_code,client_code,phantom,trenord_phantom\n\
         t1,1,0,1,20,{day},S01,TN,0,0\n\
         t1,2,2,2,35,{day},S02,TN,0,0\n\
         t2,1,5,6,,{day},S03,TN,0,0\n",
        day = day
    )
}

/// ZIP bytes from `(name, contents)` pairs
pub fn zip_bytes(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, bytes) in entries {
        writer.start_file(name.as_str(), options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A package of well-formed days wrapped in a top-level folder, as exporters produce
pub fn days_zip(dates: &[&str]) -> UploadFile {
    let entries: Vec<(String, Vec<u8>)> = dates
        .iter()
        .map(|date| {
            (
                format!("export/{}/trains.csv", date),
                trains_csv(date).into_bytes(),
            )
        })
        .collect();
    UploadFile::new("days.zip", zip_bytes(&entries))
}

pub fn full_upload(dates: &[&str]) -> UploadPayload {
    UploadPayload::Full {
        stations: UploadFile::new("stations.csv", STATIONS),
        archive: TrainArchive::Zip(days_zip(dates)),
    }
}

pub fn write_seed(root: &Path, dates: &[&str]) {
    fs::create_dir_all(root).unwrap();
    fs::write(root.join("stations.csv"), STATIONS).unwrap();
    for date in dates {
        fs::create_dir_all(root.join(date)).unwrap();
        fs::write(root.join(date).join("trains.csv"), trains_csv(date)).unwrap();
    }
}

pub fn config(temp_dir: &TempDir) -> ManagerConfig {
    let seed = temp_dir.path().join("seed");
    write_seed(&seed, &["2024-01-01", "2024-01-02", "2024-01-03"]);
    ManagerConfig::new(temp_dir.path().join("store"))
        .with_seed_dir(seed)
        .with_min_free_space_mb(0)
}

pub async fn open(temp_dir: &TempDir) -> VersionManager {
    VersionManager::open(config(temp_dir)).await.unwrap()
}
