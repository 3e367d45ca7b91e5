//! Per-day train table validation

use super::table::{is_number, parse_table};
use crate::app::models::TrainDay;
use crate::constants::{DATE_DIR_FORMAT, train_columns};
use crate::error::{DatasetError, Result};
use chrono::NaiveDate;

/// Validate one day's `trains.csv`
///
/// Every problem is reported as `MalformedTrainDay` for `date`, with the
/// offending data row in the reason when there is one.
pub fn validate_train_day(date: NaiveDate, bytes: &[u8]) -> Result<TrainDay> {
    let reject = |row: Option<usize>, reason: String| {
        let reason = match row {
            Some(row) => format!("row {}: {}", row, reason),
            None => reason,
        };
        DatasetError::malformed_train_day(date, reason)
    };

    let table = parse_table(bytes, reject)?;

    let hash_index = table
        .column_index(train_columns::TRAIN_HASH)
        .ok_or_else(|| reject(None, "missing 'train_hash' column".to_string()))?;
    let numeric_indexes: Vec<(usize, &str)> = train_columns::NUMERIC
        .iter()
        .filter_map(|&name| table.column_index(name).map(|i| (i, name)))
        .collect();
    let day_index = table.column_index(train_columns::DAY);

    for (index, fields) in table.rows.iter().enumerate() {
        let row = Some(index + 1);
        if fields[hash_index].is_empty() {
            return Err(reject(row, "empty train_hash".to_string()));
        }
        for &(i, name) in &numeric_indexes {
            let value = &fields[i];
            if !value.is_empty() && !is_number(value) {
                return Err(reject(row, format!("{} '{}' is not numeric", name, value)));
            }
        }
        if let Some(i) = day_index {
            let value = &fields[i];
            if !value.is_empty() && parse_day(value).is_none() {
                return Err(reject(row, format!("day '{}' is not a date", value)));
            }
        }
    }

    Ok(TrainDay::new(date, table))
}

/// Parse a strict `YYYY-MM-DD` name
pub fn parse_date_name(name: &str) -> Option<NaiveDate> {
    if name.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(name, DATE_DIR_FORMAT).ok()
}

/// `day` values may carry a time part after the date
fn parse_day(value: &str) -> Option<NaiveDate> {
    let date_part = value.get(..10).unwrap_or(value);
    parse_date_name(date_part)
}
