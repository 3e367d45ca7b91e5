//! Station reference table validation

use super::payload::UploadFile;
use super::table::{is_integer, is_number, parse_table};
use crate::app::models::CsvTable;
use crate::constants::station_columns;
use crate::error::{DatasetError, Result};
use std::collections::HashSet;
use tracing::debug;

/// Validate an uploaded stations file, including its name
pub fn validate_stations_file(file: &UploadFile) -> Result<CsvTable> {
    if !file.has_extension("csv") {
        return Err(DatasetError::malformed_stations_file(format!(
            "'{}' is not a .csv file",
            file.file_name
        )));
    }
    validate_stations(&file.bytes)
}

/// Validate station CSV content and return the normalized table
pub fn validate_stations(bytes: &[u8]) -> Result<CsvTable> {
    let table = parse_table(bytes, |row, reason| DatasetError::MalformedStations {
        row,
        reason,
    })?;

    let code_index = table
        .column_index(station_columns::CODE)
        .ok_or_else(|| DatasetError::malformed_stations_file("missing 'code' column"))?;
    let region_index = table.column_index(station_columns::REGION);
    let coordinate_indexes: Vec<(usize, &str)> =
        [station_columns::LATITUDE, station_columns::LONGITUDE]
            .into_iter()
            .filter_map(|name| table.column_index(name).map(|i| (i, name)))
            .collect();

    let mut seen = HashSet::with_capacity(table.row_count());
    for (index, fields) in table.rows.iter().enumerate() {
        let row = index + 1;
        let code = &fields[code_index];
        if code.is_empty() {
            return Err(DatasetError::malformed_stations(row, "empty station code"));
        }
        if !seen.insert(code.as_str()) {
            return Err(DatasetError::malformed_stations(
                row,
                format!("duplicate station code '{}'", code),
            ));
        }
        if let Some(i) = region_index {
            let region = &fields[i];
            if !region.is_empty() && !is_integer(region) {
                return Err(DatasetError::malformed_stations(
                    row,
                    format!("region '{}' is not an integer", region),
                ));
            }
        }
        for &(i, name) in &coordinate_indexes {
            let value = &fields[i];
            if !value.is_empty() && !is_number(value) {
                return Err(DatasetError::malformed_stations(
                    row,
                    format!("{} '{}' is not a number", name, value),
                ));
            }
        }
    }

    debug!("Validated stations table with {} rows", table.row_count());
    Ok(table)
}
