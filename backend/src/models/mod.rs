//! Domain models for the conversion pipeline.
//!
//! - [`Table`] - Ordered named columns sharing one row count
//! - [`Column`] - A named vector of cells with an inferred [`ColumnKind`]
//! - [`Cell`] - A single value (number, boolean, date, text or missing)
//! - [`SourceFormat`] / [`ExportFormat`] - What a file is read from and written to

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::str::FromStr;

// =============================================================================
// Cell
// =============================================================================

/// A single table value.
///
/// Missing values have their own variant, so a `Number` is always finite.
#[derive(Debug, Clone)]
pub enum Cell {
    Missing,
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
    Text(String),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Kind this cell would give a column on its own. `None` for missing.
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            Cell::Missing => None,
            Cell::Number(_) => Some(ColumnKind::Numeric),
            Cell::Bool(_) => Some(ColumnKind::Boolean),
            Cell::Date(_) => Some(ColumnKind::Date),
            Cell::Text(_) => Some(ColumnKind::Text),
        }
    }
}

/// `0.0` and `-0.0` compare equal, so they must hash the same.
fn number_bits(n: f64) -> u64 {
    if n == 0.0 {
        0.0f64.to_bits()
    } else {
        n.to_bits()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Missing, Cell::Missing) => true,
            (Cell::Number(a), Cell::Number(b)) => number_bits(*a) == number_bits(*b),
            (Cell::Bool(a), Cell::Bool(b)) => a == b,
            (Cell::Date(a), Cell::Date(b)) => a == b,
            (Cell::Text(a), Cell::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Cell::Missing => {}
            Cell::Number(n) => number_bits(*n).hash(state),
            Cell::Bool(b) => b.hash(state),
            Cell::Date(d) => d.hash(state),
            Cell::Text(s) => s.hash(state),
        }
    }
}

/// Renders the cell the way it is written to CSV.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Number(n) => f.write_str(&format_number(*n)),
            Cell::Bool(true) => f.write_str("True"),
            Cell::Bool(false) => f.write_str("False"),
            Cell::Date(d) => f.write_str(&format_date(d)),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Missing => serializer.serialize_none(),
            Cell::Number(n) => serializer.serialize_f64(*n),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::Date(d) => serializer.serialize_str(&format_date(d)),
            Cell::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Integral values print without a fractional part (`1`, not `1.0`).
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A datetime at exactly midnight is treated as a plain date.
pub fn is_date_only(d: &NaiveDateTime) -> bool {
    d.hour() == 0 && d.minute() == 0 && d.second() == 0 && d.nanosecond() == 0
}

/// Dates at midnight print as `YYYY-MM-DD`, everything else with the time.
pub fn format_date(d: &NaiveDateTime) -> String {
    if is_date_only(d) {
        d.format("%Y-%m-%d").to_string()
    } else {
        d.format("%Y-%m-%d %H:%M:%S%.f").to_string()
    }
}

// =============================================================================
// Column
// =============================================================================

/// Type of a column, resolved once when the file is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Boolean,
    Date,
    Text,
    /// Cells of incompatible kinds in one column.
    Unknown,
}

impl ColumnKind {
    /// Resolve the kind shared by all non-missing cells.
    ///
    /// A column with no values at all counts as numeric.
    pub fn infer(cells: &[Cell]) -> Self {
        let mut resolved = None;
        for kind in cells.iter().filter_map(Cell::kind) {
            match resolved {
                None => resolved = Some(kind),
                Some(previous) if previous == kind => {}
                Some(_) => return ColumnKind::Unknown,
            }
        }
        resolved.unwrap_or(ColumnKind::Numeric)
    }

    pub fn is_numeric(self) -> bool {
        self == ColumnKind::Numeric
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Boolean => "boolean",
            ColumnKind::Date => "date",
            ColumnKind::Text => "text",
            ColumnKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<Cell>,
}

impl Column {
    /// Build a column and infer its kind from the values.
    pub fn new(name: impl Into<String>, values: Vec<Cell>) -> Self {
        let kind = ColumnKind::infer(&values);
        Self {
            name: name.into(),
            kind,
            values,
        }
    }

    /// Same name and kind, new values.
    pub fn with_values(&self, values: Vec<Cell>) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            values,
        }
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|c| c.is_missing()).count()
    }
}

// =============================================================================
// Table
// =============================================================================

/// Rows × named columns.
///
/// The row count is stored on its own so that a table with every column
/// deselected still knows how many rows it has.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Create a table from columns that all hold `row_count` values.
    pub fn new(columns: Vec<Column>, row_count: usize) -> Self {
        debug_assert!(
            columns.iter().all(|c| c.values.len() == row_count),
            "every column must hold {} values",
            row_count
        );
        Self { columns, row_count }
    }

    /// Build a table row by row. Short rows are padded with missing cells,
    /// cells beyond the header are dropped.
    pub fn from_rows<S: Into<String>>(headers: Vec<S>, rows: Vec<Vec<Cell>>) -> Self {
        let row_count = rows.len();
        let mut values: Vec<Vec<Cell>> = headers.iter().map(|_| Vec::with_capacity(row_count)).collect();

        for row in rows {
            let mut cells = row.into_iter();
            for column in values.iter_mut() {
                column.push(cells.next().unwrap_or(Cell::Missing));
            }
        }

        let columns = headers
            .into_iter()
            .zip(values)
            .map(|(name, cells)| Column::new(name, cells))
            .collect();

        Self::new(columns, row_count)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Cells of row `index`, one per column.
    pub fn row(&self, index: usize) -> Vec<&Cell> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&Cell>> + '_ {
        (0..self.row_count).map(move |i| self.row(i))
    }

    /// Columns whose kind is numeric, in table order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.kind.is_numeric())
    }

    /// A new table made of the given rows, in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| c.with_values(indices.iter().map(|&i| c.values[i].clone()).collect()))
            .collect();
        Table::new(columns, indices.len())
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Table {
        let indices: Vec<usize> = (0..n.min(self.row_count)).collect();
        self.take_rows(&indices)
    }
}

// =============================================================================
// Formats
// =============================================================================

/// Format of an uploaded file, chosen from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Excel,
}

impl SourceFormat {
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("csv") {
            Some(SourceFormat::Csv)
        } else if ext.eq_ignore_ascii_case("xlsx") {
            Some(SourceFormat::Excel)
        } else {
            None
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Csv => f.write_str("CSV"),
            SourceFormat::Excel => f.write_str("Excel"),
        }
    }
}

/// Target format of an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    #[serde(alias = "xlsx", alias = "Excel")]
    Excel,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => f.write_str("csv"),
            ExportFormat::Excel => f.write_str("excel"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            other => Err(format!("unknown export format '{}' (expected csv or excel)", other)),
        }
    }
}
