//! Text decoding and structural CSV parsing shared by both table kinds

use crate::app::models::CsvTable;
use crate::error::{DatasetError, Result};
use std::borrow::Cow;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode uploaded bytes: UTF-8 (BOM stripped), otherwise Latin-1
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Parse CSV text into a trimmed table with a uniform field count
///
/// `reject` builds the error for a problem at an optional 1-based data row, so
/// each caller reports in its own error kind.
pub fn parse_table<F>(bytes: &[u8], reject: F) -> Result<CsvTable>
where
    F: Fn(Option<usize>, String) -> DatasetError,
{
    let text = decode_text(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| reject(None, format!("unreadable header: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();
    if header.iter().all(String::is_empty) {
        return Err(reject(None, "file is empty or has no header".to_string()));
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        let record = record.map_err(|e| reject(Some(row), e.to_string()))?;
        if record.len() == 1 && record.get(0).is_some_and(str::is_empty) {
            continue;
        }
        if record.len() != header.len() {
            return Err(reject(
                Some(row),
                format!("expected {} fields, found {}", header.len(), record.len()),
            ));
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(CsvTable::new(header, rows))
}

pub fn is_integer(value: &str) -> bool {
    value.parse::<i64>().is_ok()
}

pub fn is_number(value: &str) -> bool {
    value.parse::<f64>().is_ok_and(f64::is_finite)
}
