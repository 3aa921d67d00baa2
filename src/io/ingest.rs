//! CSV ingest and validation.
//!
//! Turns a delimited text file with a header row into an `ObservationSet`.
//!
//! Rules:
//! - the x and y columns are chosen by header name (case-insensitive, BOM-safe)
//! - rows whose x or y is missing, unparseable or non-finite are skipped and
//!   reported, not fatal
//! - row order is preserved
//! - a file with no usable rows is an error

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{DatasetStats, Observation, ObservationSet};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: observations + stats + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub observations: ObservationSet,
    pub x_col: String,
    pub y_col: String,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load observations from the CSV file at `path`.
pub fn load_observations(path: &Path, x_col: &str, y_col: &str) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_observations(file, x_col, y_col)
}

/// Load observations from any CSV reader.
pub fn read_observations<R: Read>(input: R, x_col: &str, y_col: &str) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    let x_idx = column_index(&header_map, x_col)?;
    let y_idx = column_index(&header_map, y_col)?;

    let mut points = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, x_idx, x_col, y_idx, y_col) {
            Ok(point) => points.push(point),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if !row_errors.is_empty() {
        tracing::warn!(skipped = row_errors.len(), rows_read, "skipped invalid CSV rows");
    }

    let rows_used = points.len();
    if rows_used == 0 {
        return Err(AppError::new(2, "No valid rows found in the CSV."));
    }

    let observations = ObservationSet::new(points)?;
    let stats = observations.stats();
    tracing::debug!(rows_read, rows_used, "observations loaded");

    Ok(IngestedData {
        observations,
        x_col: x_col.to_string(),
        y_col: y_col.to_string(),
        stats,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins for duplicated headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn column_index(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, AppError> {
    header_map.get(&normalize_header_name(name)).copied().ok_or_else(|| {
        let mut available: Vec<&str> = header_map.keys().map(String::as_str).collect();
        available.sort_unstable();
        AppError::new(
            2,
            format!("Missing required column: `{name}` (available: {}).", available.join(", ")),
        )
    })
}

fn parse_row(
    record: &StringRecord,
    x_idx: usize,
    x_col: &str,
    y_idx: usize,
    y_col: &str,
) -> Result<Observation, String> {
    let x = parse_cell(record, x_idx, x_col)?;
    let y = parse_cell(record, y_idx, y_col)?;
    Ok(Observation { x, y })
}

fn parse_cell(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing `{name}` value."))?;
    let v: f64 = raw
        .parse()
        .map_err(|_| format!("Invalid `{name}` value '{raw}'."))?;
    if !v.is_finite() {
        return Err(format!("Non-finite `{name}` value '{raw}'."));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_named_columns_in_row_order() {
        let csv = "\u{feff}Day,Count,label\n0,10,a\n1,12.21,b\n2,14.92,c\n";
        let data = read_observations(csv.as_bytes(), "day", "COUNT").unwrap();
        assert_eq!(data.rows_read, 3);
        assert_eq!(data.rows_used, 3);
        assert_eq!(data.observations.xs(), &[0.0, 1.0, 2.0]);
        assert_eq!(data.observations.ys(), &[10.0, 12.21, 14.92]);
        assert!(data.row_errors.is_empty());
        assert_eq!(data.stats.y_max, 14.92);
    }

    #[test]
    fn bad_rows_are_reported_and_skipped() {
        let csv = "t,y\n0,1\n1,\n2,abc\n3,NaN\n4,5\n";
        let data = read_observations(csv.as_bytes(), "t", "y").unwrap();
        assert_eq!(data.rows_used, 2);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = read_observations("t,y\n0,1\n".as_bytes(), "t", "value").unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("`value`"));
    }

    #[test]
    fn no_usable_rows_is_an_error() {
        let err = read_observations("t,y\n0,x\n".as_bytes(), "t", "y").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
