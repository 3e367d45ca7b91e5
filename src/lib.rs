//! Railway Dataset Manager Library
//!
//! Versioned, archive-backed management of the single railway dataset (a
//! station reference table plus one train-record table per day) served by
//! the statistics dashboard.
//!
//! This library provides tools for:
//! - Validating uploaded station tables and zipped day packages before anything is stored
//! - Storing every dataset generation as an immutable, timestamp-stamped snapshot
//! - Switching the current dataset atomically (upload, revert, apply)
//! - Protecting the bundled default and the current dataset from deletion
//! - Triggering the analytics precompute step after each activation

pub mod config;
pub mod constants;
pub mod error;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod archive_store;
        pub mod precompute;
        pub mod validator;
        pub mod version_manager;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{
    ArchiveEntry, ArchiveSummary, DataInfo, DatasetRange, DatasetState, Snapshot, Stamp,
    SwitchOutcome, UploadOutcome,
};
pub use app::services::validator::{TrainArchive, UploadFile, UploadPayload};
pub use app::services::version_manager::{UploadRequest, VersionManager};
pub use config::{ManagerConfig, PrecomputeMode};
pub use error::{DatasetError, ErrorKind, Result};
