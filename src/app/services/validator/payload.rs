//! Upload payload shapes
//!
//! An upload carries a stations file, a train archive, or both. The "neither"
//! case is unrepresentable once a payload has been built.

use crate::error::{DatasetError, Result};
use std::path::{Path, PathBuf};

/// A file received from the operator, held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Name the operator gave the file; only its extension is checked
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file into an upload
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            DatasetError::storage(format!("Failed to read upload '{}'", path.display()), e)
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { file_name, bytes })
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        Path::new(&self.file_name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

/// Per-day train records, as a ZIP upload or a directory already on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainArchive {
    Zip(UploadFile),
    Directory(PathBuf),
}

impl TrainArchive {
    /// Classify a local path: directories are read in place, anything else as a ZIP
    pub fn from_path(path: &Path) -> Result<Self> {
        if path.is_dir() {
            Ok(Self::Directory(path.to_path_buf()))
        } else {
            Ok(Self::Zip(UploadFile::from_path(path)?))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Zip(file) => file.file_name.clone(),
            Self::Directory(path) => path.display().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPayload {
    StationsOnly(UploadFile),
    ArchiveOnly(TrainArchive),
    Full {
        stations: UploadFile,
        archive: TrainArchive,
    },
}

impl UploadPayload {
    /// Build a payload from the optional halves; `EmptyUpload` when both are absent
    pub fn from_parts(stations: Option<UploadFile>, archive: Option<TrainArchive>) -> Result<Self> {
        match (stations, archive) {
            (Some(stations), Some(archive)) => Ok(Self::Full { stations, archive }),
            (Some(stations), None) => Ok(Self::StationsOnly(stations)),
            (None, Some(archive)) => Ok(Self::ArchiveOnly(archive)),
            (None, None) => Err(DatasetError::EmptyUpload),
        }
    }

    pub fn stations(&self) -> Option<&UploadFile> {
        match self {
            Self::StationsOnly(stations) | Self::Full { stations, .. } => Some(stations),
            Self::ArchiveOnly(_) => None,
        }
    }

    pub fn archive(&self) -> Option<&TrainArchive> {
        match self {
            Self::ArchiveOnly(archive) | Self::Full { archive, .. } => Some(archive),
            Self::StationsOnly(_) => None,
        }
    }
}
