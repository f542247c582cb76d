//! Source file readers: CSV reference tables and spreadsheet exports.
//!
//! Both produce a [`Frame`] whose header is the first row of the file.
//! Any failure to open or parse a file is a `SourceRead` error carrying the path.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::frame::Frame;
use crate::value::Value;

/// Read a CSV or spreadsheet, dispatching on the file extension.
pub fn read_table(path: &Path) -> DbResult<Frame> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xlsm" | "xls" | "ods" => read_workbook(path),
        _ => Err(DbError::source_read(path, format!("unsupported file type '{}'", ext))),
    }
}

/// Read a CSV file. Empty fields become NULL, everything else stays text.
pub fn read_csv(path: &Path) -> DbResult<Frame> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|e| DbError::source_read(path, e))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DbError::source_read(path, e))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| DbError::source_read(path, e))?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Value::Null
                    } else {
                        Value::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    debug!(path = %path.display(), rows = rows.len(), columns = headers.len(), "Read CSV");
    Ok(Frame::new(headers, rows))
}

/// Read the first worksheet of a workbook.
pub fn read_workbook(path: &Path) -> DbResult<Frame> {
    let mut workbook = open_workbook_auto(path).map_err(|e| DbError::source_read(path, e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DbError::source_read(path, "workbook has no worksheets"))?
        .map_err(|e| DbError::source_read(path, e))?;

    let mut rows_iter = range.rows();
    let headers: Vec<String> = match rows_iter.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| cell_to_value(cell).as_key().unwrap_or_default().trim().to_string())
            .collect(),
        None => return Err(DbError::source_read(path, "worksheet is empty")),
    };

    let rows: Vec<Vec<Value>> = rows_iter
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| row.iter().map(cell_to_value).collect())
        .collect();

    debug!(path = %path.display(), rows = rows.len(), columns = headers.len(), "Read workbook");
    Ok(Frame::new(headers, rows))
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Int(i) => Value::Integer(*i),
        Data::Float(f) => Value::Real(*f),
        Data::Bool(b) => Value::Boolean(*b),
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) => Value::Text(ts.date().format("%Y-%m-%d").to_string()),
            None => Value::Real(dt.as_f64()),
        },
        Data::DateTimeIso(s) => Value::Text(s.get(..10).unwrap_or(s).to_string()),
        Data::DurationIso(s) => Value::Text(s.clone()),
    }
}
