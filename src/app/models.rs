//! Data models for dataset versions
//!
//! This module contains the core data structures for representing dataset
//! snapshots, archive entries and the request/response shapes exchanged with
//! the administrative interface.

use crate::constants::{STAMP_FORMAT, STAMP_PATTERN, train_columns};
use crate::error::{DatasetError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

// =============================================================================
// Stamps
// =============================================================================

/// Opaque, strictly increasing archive identifier
///
/// Rendered from the UTC creation instant with millisecond precision, so the
/// lexicographic order of stamps is their creation order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stamp(String);

fn stamp_regex() -> &'static Regex {
    static STAMP_REGEX: OnceLock<Regex> = OnceLock::new();
    STAMP_REGEX.get_or_init(|| Regex::new(STAMP_PATTERN).expect("stamp pattern is a valid regex"))
}

impl Stamp {
    /// Parse an operator-supplied stamp
    ///
    /// A value that does not have the stamp shape cannot name any archive, so it
    /// is reported as `NotFound` rather than as a separate error kind.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if !stamp_regex().is_match(raw) || NaiveDateTime::parse_from_str(raw, STAMP_FORMAT).is_err()
        {
            return Err(DatasetError::not_found(raw));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self(instant.format(STAMP_FORMAT).to_string())
    }

    /// Allocate the stamp for a snapshot created at `now`
    ///
    /// Stamps must be strictly greater than `previous`; when the clock has not
    /// advanced by a full millisecond the new stamp is bumped past it.
    pub fn next_after(previous: Option<&Stamp>, now: DateTime<Utc>) -> (Self, DateTime<Utc>) {
        let now = truncate_to_millis(now);
        let instant = match previous.and_then(Stamp::instant) {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        (Self::from_datetime(instant), instant)
    }

    /// The creation instant encoded in the stamp
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.0, STAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn truncate_to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    let millis = instant.nanosecond() / 1_000_000 * 1_000_000;
    instant.with_nanosecond(millis).unwrap_or(instant)
}

// =============================================================================
// Tables and Snapshots
// =============================================================================

/// A normalized CSV table: trimmed UTF-8 fields, one header row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsvTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// Case-insensitive column lookup
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of one column, empty when the column is absent
    pub fn column_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let index = self.column_index(name);
        self.rows
            .iter()
            .filter_map(move |row| index.and_then(|i| row.get(i)).map(String::as_str))
    }

    /// Approximate serialized size, used for free-space checks
    pub fn estimated_bytes(&self) -> u64 {
        let line_bytes = |fields: &[String]| -> u64 {
            fields.iter().map(|f| f.len() as u64 + 3).sum::<u64>() + 1
        };
        line_bytes(&self.header) + self.rows.iter().map(|row| line_bytes(row)).sum::<u64>()
    }

    /// Serialize as UTF-8 CSV
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(&self.header)
            .map_err(|e| DatasetError::storage("Failed to encode CSV header", e))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| DatasetError::storage("Failed to encode CSV row", e))?;
        }
        writer
            .into_inner()
            .map_err(|e| DatasetError::storage("Failed to flush CSV buffer", e.into_error()))
    }

    /// Read a table previously written by [`CsvTable::to_csv_bytes`]
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(bytes);
        let header = reader
            .headers()
            .map_err(|e| DatasetError::storage("Stored CSV header is unreadable", e))?
            .iter()
            .map(str::to_string)
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| DatasetError::storage("Stored CSV row is unreadable", e))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self { header, rows })
    }
}

/// One day of train records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainDay {
    pub date: NaiveDate,
    pub table: CsvTable,
    /// Distinct `train_hash` values in the table
    pub train_count: usize,
}

impl TrainDay {
    pub fn new(date: NaiveDate, table: CsvTable) -> Self {
        let train_count = table
            .column_values(train_columns::TRAIN_HASH)
            .filter(|hash| !hash.is_empty())
            .collect::<HashSet<_>>()
            .len();
        Self {
            date,
            table,
            train_count,
        }
    }

    pub fn record_count(&self) -> usize {
        self.table.row_count()
    }
}

/// An immutable dataset generation: station table plus per-day train tables
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub stations: Option<CsvTable>,
    pub days: BTreeMap<NaiveDate, TrainDay>,
}

impl Snapshot {
    pub fn new(stations: Option<CsvTable>, days: BTreeMap<NaiveDate, TrainDay>) -> Self {
        Self { stations, days }
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_none() && self.days.is_empty()
    }

    /// True when either half (stations or train days) is missing
    pub fn is_partial(&self) -> bool {
        self.stations.is_none() || self.days.is_empty()
    }

    /// Fill the missing half from `base`, keeping everything this snapshot carries
    pub fn inherit_missing(mut self, base: Snapshot) -> Self {
        if self.stations.is_none() {
            self.stations = base.stations;
        }
        if self.days.is_empty() {
            self.days = base.days;
        }
        self
    }

    pub fn estimated_bytes(&self) -> u64 {
        self.stations.as_ref().map_or(0, CsvTable::estimated_bytes)
            + self
                .days
                .values()
                .map(|day| day.table.estimated_bytes())
                .sum::<u64>()
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            start_date: self.days.keys().next().copied(),
            end_date: self.days.keys().next_back().copied(),
            station_count: self.stations.as_ref().map(CsvTable::row_count),
            day_records: self
                .days
                .iter()
                .map(|(date, day)| (*date, day.record_count()))
                .collect(),
            day_trains: self
                .days
                .iter()
                .map(|(date, day)| (*date, day.train_count))
                .collect(),
        }
    }
}

/// Derived metadata of a snapshot, kept in the index so listing never reads bulk data
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotSummary {
    /// Earliest day with train records
    pub start_date: Option<NaiveDate>,

    /// Latest day with train records
    pub end_date: Option<NaiveDate>,

    /// Rows in the station table, `None` when the snapshot has no station table
    pub station_count: Option<usize>,

    /// Train records per day
    pub day_records: BTreeMap<NaiveDate, usize>,

    /// Distinct trains per day
    pub day_trains: BTreeMap<NaiveDate, usize>,
}

impl SnapshotSummary {
    pub fn total_records(&self) -> usize {
        self.day_records.values().sum()
    }

    pub fn train_dates(&self) -> Vec<NaiveDate> {
        self.day_records.keys().copied().collect()
    }

    pub fn date_span(&self) -> Option<DateSpan> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some(DateSpan { start, end }),
            _ => None,
        }
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    /// Number of calendar days covered, both ends included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

// =============================================================================
// Archive Entries
// =============================================================================

/// One stored dataset generation with its flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub stamp: Stamp,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub is_default: bool,
    pub is_current: bool,
    pub summary: SnapshotSummary,
}

/// Listing shape returned to the administrative interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub stamp: Stamp,
    pub name: String,
    pub is_default: bool,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub train_days: usize,
    pub stations: Option<usize>,
}

impl From<&ArchiveEntry> for ArchiveSummary {
    fn from(entry: &ArchiveEntry) -> Self {
        Self {
            stamp: entry.stamp.clone(),
            name: entry.name.clone(),
            is_default: entry.is_default,
            is_current: entry.is_current,
            created_at: entry.created_at,
            start_date: entry.summary.start_date,
            end_date: entry.summary.end_date,
            train_days: entry.summary.day_records.len(),
            stations: entry.summary.station_count,
        }
    }
}

/// Externally observable manager state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetState {
    /// Nothing has been seeded or uploaded yet
    NoDataset,
    /// A dataset is being served
    Ready(Stamp),
}

/// Read-only view over the current snapshot's dates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dataset_name: String,
}

/// Answer to the "what is being served" query
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DataInfo {
    pub dataset_name: Option<String>,
    pub available_min_date: Option<NaiveDate>,
    pub available_max_date: Option<NaiveDate>,
    pub current_stamp: Option<Stamp>,
}

// =============================================================================
// Operation Outcomes
// =============================================================================

/// What an upload carried
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UploadStats {
    pub stations_uploaded: bool,
    pub train_dates: Vec<NaiveDate>,
    pub date_range: Option<DateSpan>,
}

/// Window handed to the precompute trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PrecomputeRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// The dataset spans more days than the supported window and the start was moved forward
    pub clamped_to_max_range: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub applied_stamp: Stamp,
    /// The entry that was current before and is now a regular archive
    pub previous_stamp: Option<Stamp>,
    pub precompute_range: Option<PrecomputeRange>,
    /// Set when the precompute step failed; the activation itself stands
    pub precompute_warning: Option<String>,
    pub upload_stats: UploadStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchOutcome {
    pub new_current_stamp: Stamp,
    pub previous_stamp: Option<Stamp>,
    /// False when the requested target was already current
    pub changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearOutcome {
    pub deleted_count: usize,
}
