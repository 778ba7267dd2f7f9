//! Excel (.xlsx) reader built on calamine.
//!
//! Only the first worksheet is read; its first row is the header.

use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;

use super::delimited::parse_date;
use super::{is_missing_marker, normalize_headers};
use crate::error::{LoadResult, ParseError};
use crate::models::{Cell, Column, Table};

/// Parse the first worksheet of an xlsx workbook held in memory.
pub fn parse_workbook(bytes: &[u8]) -> LoadResult<Table> {
    if bytes.is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| ParseError::Excel(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ParseError::NoSheets)?
        .map_err(|e| ParseError::Excel(e.to_string()))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or(ParseError::EmptyFile)?;
    let headers = normalize_headers(header.iter().map(header_name));

    let mut values: Vec<Vec<Cell>> = vec![Vec::new(); headers.len()];
    let mut row_count = 0;

    for row in rows {
        if row.iter().all(|d| matches!(d, Data::Empty)) {
            continue;
        }
        for (i, column) in values.iter_mut().enumerate() {
            column.push(row.get(i).map_or(Cell::Missing, to_cell));
        }
        row_count += 1;
    }

    let columns = headers
        .into_iter()
        .zip(values)
        .map(|(name, cells)| Column::new(name, cells))
        .collect();

    Ok(Table::new(columns, row_count))
}

fn header_name(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Map a worksheet cell to a table cell. Errors and blanks are missing.
fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) if f.is_finite() => Cell::Number(*f),
        Data::Float(_) => Cell::Missing,
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) if is_missing_marker(s) => Cell::Missing,
        Data::String(s) => Cell::Text(s.clone()),
        Data::DateTime(dt) => dt.as_datetime().map_or(Cell::Missing, Cell::Date),
        Data::DateTimeIso(s) => parse_date(s).unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}
