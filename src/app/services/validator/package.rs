//! Train package reading
//!
//! A package is a tree of `YYYY-MM-DD/trains.csv` files, optionally with a
//! `stations.csv` next to the date directories. It arrives either as a ZIP
//! upload or as a directory on disk; both are read through [`PackageSource`]
//! so the root discovery and per-day checks are shared.

use super::payload::{TrainArchive, UploadFile};
use super::train_day::{parse_date_name, validate_train_day};
use crate::app::models::TrainDay;
use crate::constants::{
    IGNORED_PACKAGE_FILE_NAMES, IGNORED_PACKAGE_PREFIXES, STATIONS_FILE_NAME, TRAINS_FILE_NAME,
};
use crate::error::{DatasetError, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::ZipArchive;

/// One file or directory inside a package, addressed by a `/`-separated relative path
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PackageEntry {
    pub path: String,
    pub is_dir: bool,
}

/// Read access to the contents of a train package
pub trait PackageSource {
    fn entries(&self) -> &[PackageEntry];

    fn read(&mut self, path: &str) -> Result<Vec<u8>>;
}

/// Raw contents of a package before per-day validation
#[derive(Debug)]
pub struct RawPackage {
    pub root: String,
    pub stations: Option<Vec<u8>>,
    pub days: Vec<(NaiveDate, Vec<u8>)>,
}

/// Validated contents of a package
#[derive(Debug)]
pub struct ParsedPackage {
    pub stations: Option<Vec<u8>>,
    pub days: BTreeMap<NaiveDate, TrainDay>,
}

// =============================================================================
// Sources
// =============================================================================

pub struct ZipSource<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    entries: Vec<PackageEntry>,
    names: BTreeMap<String, usize>,
    /// Uncompressed bytes still allowed to be extracted
    budget: u64,
}

impl<'a> ZipSource<'a> {
    /// Open a ZIP upload, rejecting unsafe entry names and oversized contents
    pub fn open(file: &'a UploadFile, max_uncompressed_bytes: u64) -> Result<Self> {
        if !file.has_extension("zip") {
            return Err(DatasetError::malformed_package(format!(
                "'{}' is not a .zip file",
                file.file_name
            )));
        }

        let mut archive = ZipArchive::new(Cursor::new(file.bytes.as_slice())).map_err(|e| {
            DatasetError::malformed_package(format!("unreadable ZIP archive: {}", e))
        })?;

        let mut entries = Vec::new();
        let mut names = BTreeMap::new();
        let mut total_uncompressed: u64 = 0;
        for index in 0..archive.len() {
            let entry = archive.by_index(index).map_err(|e| {
                DatasetError::malformed_package(format!("unreadable ZIP entry {}: {}", index, e))
            })?;
            let raw_name = entry.name().replace('\\', "/");
            if is_unsafe_entry_name(&raw_name) {
                return Err(DatasetError::malformed_package(format!(
                    "unsafe path in archive: '{}'",
                    raw_name
                )));
            }
            total_uncompressed = total_uncompressed.saturating_add(entry.size());
            if total_uncompressed > max_uncompressed_bytes {
                return Err(DatasetError::malformed_package(format!(
                    "uncompressed size exceeds the limit of {} bytes",
                    max_uncompressed_bytes
                )));
            }

            let path = raw_name.trim_end_matches('/').to_string();
            if path.is_empty() || is_ignored(&path) {
                continue;
            }
            let is_dir = entry.is_dir();
            if !is_dir {
                names.insert(path.clone(), index);
            }
            entries.push(PackageEntry { path, is_dir });
        }

        debug!(
            "Opened ZIP package '{}' with {} entries ({} bytes uncompressed)",
            file.file_name,
            entries.len(),
            total_uncompressed
        );
        Ok(Self {
            archive,
            entries,
            names,
            budget: max_uncompressed_bytes,
        })
    }
}

impl PackageSource for ZipSource<'_> {
    fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    fn read(&mut self, path: &str) -> Result<Vec<u8>> {
        let index = *self.names.get(path).ok_or_else(|| {
            DatasetError::malformed_package(format!("'{}' is not a file in the archive", path))
        })?;
        let mut entry = self.archive.by_index(index).map_err(|e| {
            DatasetError::malformed_package(format!("unreadable ZIP entry '{}': {}", path, e))
        })?;
        let bytes = read_limited(&mut entry, self.budget, path)?;
        self.budget -= bytes.len() as u64;
        Ok(bytes)
    }
}

/// Extract at most `budget` bytes; header sizes are not trusted
pub fn read_limited(reader: &mut impl Read, budget: u64, path: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader
        .take(budget.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| {
            DatasetError::malformed_package(format!("failed to extract '{}': {}", path, e))
        })?;
    if bytes.len() as u64 > budget {
        return Err(DatasetError::malformed_package(format!(
            "'{}' expands beyond the uncompressed size limit",
            path
        )));
    }
    Ok(bytes)
}

pub struct DirectorySource {
    root: PathBuf,
    entries: Vec<PackageEntry>,
}

impl DirectorySource {
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(DatasetError::malformed_package(format!(
                "'{}' is not a directory",
                root.display()
            )));
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| {
                DatasetError::malformed_package(format!(
                    "failed to scan '{}': {}",
                    root.display(),
                    e
                ))
            })?;
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if is_ignored(&path) {
                continue;
            }
            entries.push(PackageEntry {
                path,
                is_dir: entry.file_type().is_dir(),
            });
        }

        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }
}

impl PackageSource for DirectorySource {
    fn entries(&self) -> &[PackageEntry] {
        &self.entries
    }

    fn read(&mut self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.root.join(path);
        std::fs::read(&full_path).map_err(|e| {
            DatasetError::storage(format!("Failed to read '{}'", full_path.display()), e)
        })
    }
}

fn is_unsafe_entry_name(name: &str) -> bool {
    if name.starts_with('/') || name.as_bytes().get(1) == Some(&b':') {
        return true;
    }
    Path::new(name)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}

fn is_ignored(path: &str) -> bool {
    if IGNORED_PACKAGE_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix) || path == prefix.trim_end_matches('/'))
    {
        return true;
    }
    let file_name = path.rsplit('/').next().unwrap_or(path);
    IGNORED_PACKAGE_FILE_NAMES.contains(&file_name)
}

// =============================================================================
// Root Discovery
// =============================================================================

fn join(root: &str, name: &str) -> String {
    if root.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", root, name)
    }
}

fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

/// The shallowest directory holding at least one `YYYY-MM-DD/trains.csv`
pub fn find_dataset_root(entries: &[PackageEntry]) -> Option<String> {
    entries
        .iter()
        .filter(|entry| !entry.is_dir)
        .filter_map(|entry| {
            let (day_dir, file_name) = split_parent(&entry.path);
            if file_name != TRAINS_FILE_NAME || day_dir.is_empty() {
                return None;
            }
            let (root, day_name) = split_parent(day_dir);
            parse_date_name(day_name).map(|_| root)
        })
        .min_by_key(|root| {
            let depth = if root.is_empty() {
                0
            } else {
                root.split('/').count()
            };
            (depth, *root)
        })
        .map(str::to_string)
}

/// Locate the root and read every date directory's table and the optional stations file
pub fn read_package(source: &mut dyn PackageSource) -> Result<RawPackage> {
    let root = find_dataset_root(source.entries()).ok_or_else(|| {
        DatasetError::malformed_package(format!(
            "no YYYY-MM-DD/{} found in the package",
            TRAINS_FILE_NAME
        ))
    })?;

    let mut dates = BTreeSet::new();
    let mut files = BTreeSet::new();
    for entry in source.entries() {
        let relative = if root.is_empty() {
            entry.path.as_str()
        } else {
            match entry
                .path
                .strip_prefix(root.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
            {
                Some(rest) => rest,
                None => continue,
            }
        };
        let mut parts = relative.splitn(2, '/');
        let first = parts.next().unwrap_or_default();
        if let Some(date) = parse_date_name(first) {
            if entry.is_dir || parts.next().is_some() {
                dates.insert(date);
            }
        }
        if !entry.is_dir {
            files.insert(relative.to_string());
        }
    }

    let mut days = Vec::with_capacity(dates.len());
    for date in dates {
        let day_path = format!("{}/{}", date.format("%Y-%m-%d"), TRAINS_FILE_NAME);
        if !files.contains(&day_path) {
            return Err(DatasetError::malformed_train_day(
                date,
                format!("missing {}", TRAINS_FILE_NAME),
            ));
        }
        days.push((date, source.read(&join(&root, &day_path))?));
    }

    let stations = if files.contains(STATIONS_FILE_NAME) {
        Some(source.read(&join(&root, STATIONS_FILE_NAME))?)
    } else {
        None
    };

    info!(
        "Package root '{}' holds {} day(s){}",
        if root.is_empty() { "." } else { root.as_str() },
        days.len(),
        if stations.is_some() {
            " and a stations table"
        } else {
            ""
        }
    );
    Ok(RawPackage {
        root,
        stations,
        days,
    })
}

/// Validate every day, spreading the work over the available cores
///
/// The reported error is the first failing day in date order, so the result
/// does not depend on scheduling.
pub fn parse_days(raw_days: &[(NaiveDate, Vec<u8>)]) -> Result<BTreeMap<NaiveDate, TrainDay>> {
    if raw_days.is_empty() {
        return Ok(BTreeMap::new());
    }

    let workers = num_cpus::get().clamp(1, raw_days.len());
    let chunk_size = raw_days.len().div_ceil(workers);

    let results: Vec<Result<TrainDay>> = std::thread::scope(|scope| {
        let handles: Vec<_> = raw_days
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|(date, bytes)| validate_train_day(*date, bytes))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    });

    let mut days = BTreeMap::new();
    for result in results {
        let day = result?;
        days.insert(day.date, day);
    }
    Ok(days)
}

/// Open the archive, locate the dataset root and validate every day
pub fn load_archive(archive: &TrainArchive, max_uncompressed_bytes: u64) -> Result<ParsedPackage> {
    let raw = match archive {
        TrainArchive::Zip(file) => {
            let mut source = ZipSource::open(file, max_uncompressed_bytes)?;
            read_package(&mut source)?
        }
        TrainArchive::Directory(path) => {
            let mut source = DirectorySource::open(path)?;
            read_package(&mut source)?
        }
    };
    let days = parse_days(&raw.days)?;
    Ok(ParsedPackage {
        stations: raw.stations,
        days,
    })
}
