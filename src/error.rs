//! Error handling for dataset version operations.
//!
//! Every failure surfaced to the administrative interface carries exactly one
//! [`ErrorKind`], so callers can branch on the kind without parsing messages.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Stable, serializable classification of a [`DatasetError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmptyUpload,
    MalformedStations,
    MalformedTrainDay,
    MalformedPackage,
    StorageFailure,
    AlreadyCurrent,
    CannotDeleteCurrent,
    CannotDeleteDefault,
    NotFound,
    Cancelled,
    Configuration,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyUpload => "empty_upload",
            Self::MalformedStations => "malformed_stations",
            Self::MalformedTrainDay => "malformed_train_day",
            Self::MalformedPackage => "malformed_package",
            Self::StorageFailure => "storage_failure",
            Self::AlreadyCurrent => "already_current",
            Self::CannotDeleteCurrent => "cannot_delete_current",
            Self::CannotDeleteDefault => "cannot_delete_default",
            Self::NotFound => "not_found",
            Self::Cancelled => "cancelled",
            Self::Configuration => "configuration",
        }
    }

    /// Validation failures leave the store untouched and can be retried with corrected input
    pub const fn is_validation(self) -> bool {
        matches!(
            self,
            Self::EmptyUpload
                | Self::MalformedStations
                | Self::MalformedTrainDay
                | Self::MalformedPackage
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Upload contains neither a stations file nor a train archive")]
    EmptyUpload,

    #[error("Malformed stations file{}: {reason}", describe_row(.row))]
    MalformedStations { row: Option<usize>, reason: String },

    #[error("Malformed train records for {date}: {reason}")]
    MalformedTrainDay { date: NaiveDate, reason: String },

    #[error("Malformed dataset package: {reason}")]
    MalformedPackage { reason: String },

    #[error("Storage failure: {message}")]
    StorageFailure {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Archive {stamp} is already the current dataset")]
    AlreadyCurrent { stamp: String },

    #[error("Archive {stamp} is the current dataset and cannot be deleted")]
    CannotDeleteCurrent { stamp: String },

    #[error("Archive {stamp} is the default dataset and cannot be deleted")]
    CannotDeleteDefault { stamp: String },

    #[error("Archive not found: {stamp}")]
    NotFound { stamp: String },

    #[error("Operation cancelled: {reason}")]
    Cancelled { reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

fn describe_row(row: &Option<usize>) -> String {
    match row {
        Some(row) => format!(" at row {}", row),
        None => String::new(),
    }
}

impl DatasetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyUpload => ErrorKind::EmptyUpload,
            Self::MalformedStations { .. } => ErrorKind::MalformedStations,
            Self::MalformedTrainDay { .. } => ErrorKind::MalformedTrainDay,
            Self::MalformedPackage { .. } => ErrorKind::MalformedPackage,
            Self::StorageFailure { .. } => ErrorKind::StorageFailure,
            Self::AlreadyCurrent { .. } => ErrorKind::AlreadyCurrent,
            Self::CannotDeleteCurrent { .. } => ErrorKind::CannotDeleteCurrent,
            Self::CannotDeleteDefault { .. } => ErrorKind::CannotDeleteDefault,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// Create a stations error pointing at a 1-based data row
    pub fn malformed_stations(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedStations {
            row: Some(row),
            reason: reason.into(),
        }
    }

    /// Create a stations error that concerns the file as a whole
    pub fn malformed_stations_file(reason: impl Into<String>) -> Self {
        Self::MalformedStations {
            row: None,
            reason: reason.into(),
        }
    }

    pub fn malformed_train_day(date: NaiveDate, reason: impl Into<String>) -> Self {
        Self::MalformedTrainDay {
            date,
            reason: reason.into(),
        }
    }

    pub fn malformed_package(reason: impl Into<String>) -> Self {
        Self::MalformedPackage {
            reason: reason.into(),
        }
    }

    /// Create a storage failure with the underlying cause attached
    pub fn storage(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::StorageFailure {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a storage failure without an underlying cause
    pub fn storage_message(message: impl Into<String>) -> Self {
        Self::StorageFailure {
            message: message.into(),
            source: None,
        }
    }

    pub fn already_current(stamp: impl Into<String>) -> Self {
        Self::AlreadyCurrent {
            stamp: stamp.into(),
        }
    }

    pub fn cannot_delete_current(stamp: impl Into<String>) -> Self {
        Self::CannotDeleteCurrent {
            stamp: stamp.into(),
        }
    }

    pub fn cannot_delete_default(stamp: impl Into<String>) -> Self {
        Self::CannotDeleteDefault {
            stamp: stamp.into(),
        }
    }

    pub fn not_found(stamp: impl Into<String>) -> Self {
        Self::NotFound {
            stamp: stamp.into(),
        }
    }

    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for DatasetError {
    fn from(error: std::io::Error) -> Self {
        Self::storage("I/O operation failed", error)
    }
}

impl From<serde_json::Error> for DatasetError {
    fn from(error: serde_json::Error) -> Self {
        Self::storage("Archive metadata could not be encoded or decoded", error)
    }
}

impl From<tokio::task::JoinError> for DatasetError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::storage("Background storage task did not complete", error)
    }
}

pub type Result<T> = std::result::Result<T, DatasetError>;
