//! Loading uploaded files into a [`Table`].
//!
//! The extension picks the reader:
//!
//! - `.csv` → [`delimited`] (encoding and delimiter auto-detection)
//! - `.xlsx` → [`spreadsheet`] (first worksheet)
//!
//! Column kinds are resolved here, once, and never re-inferred downstream.

pub mod delimited;
pub mod spreadsheet;

use std::path::Path;

use crate::error::{LoadResult, ParseError};
use crate::models::{SourceFormat, Table};

pub use delimited::{decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_str, CsvError, ParsedCsv};
pub use spreadsheet::parse_workbook;

/// Values read as missing, after trimming.
pub const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "NaN", "nan", "-NaN", "NULL", "null", "None", "#N/A", "<NA>",
];

pub fn is_missing_marker(value: &str) -> bool {
    MISSING_MARKERS.contains(&value.trim())
}

/// A loaded file with what was detected while reading it.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub file_name: String,
    pub format: SourceFormat,
    pub table: Table,
    /// Detected encoding (CSV only)
    pub encoding: Option<String>,
    /// Detected delimiter (CSV only)
    pub delimiter: Option<char>,
}

/// Parse `bytes` according to the extension of `file_name`.
///
/// # Example
/// ```ignore
/// let loaded = tabconv::parser::load(b"a,b\n1,2\n", "data.csv")?;
/// assert_eq!(loaded.table.column_names(), vec!["a", "b"]);
/// ```
pub fn load(bytes: &[u8], file_name: &str) -> LoadResult<LoadedFile> {
    let format = SourceFormat::from_file_name(file_name)
        .ok_or_else(|| ParseError::UnsupportedFormat(file_name.to_string()))?;

    match format {
        SourceFormat::Csv => {
            let parsed = parse_bytes_auto(bytes)?;
            Ok(LoadedFile {
                file_name: file_name.to_string(),
                format,
                table: parsed.table,
                encoding: Some(parsed.encoding),
                delimiter: Some(parsed.delimiter),
            })
        }
        SourceFormat::Excel => Ok(LoadedFile {
            file_name: file_name.to_string(),
            format,
            table: parse_workbook(bytes)?,
            encoding: None,
            delimiter: None,
        }),
    }
}

/// Read a file from disk and [`load`] it.
pub fn load_file<P: AsRef<Path>>(path: P) -> LoadResult<LoadedFile> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ParseError::UnsupportedFormat(path.display().to_string()))?;

    // Reject by extension before reading anything.
    if SourceFormat::from_file_name(file_name).is_none() {
        return Err(ParseError::UnsupportedFormat(file_name.to_string()));
    }

    let bytes = std::fs::read(path)?;
    load(&bytes, file_name)
}

/// Make header names usable as unique keys.
///
/// Blank names become `Unnamed: <position>`, repeats get `.1`, `.2`, ...
/// Other names are kept as written, surrounding whitespace included.
pub fn normalize_headers<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut headers: Vec<String> = Vec::new();

    for (position, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {}", position)
        } else {
            name
        };

        let mut unique = base.clone();
        let mut suffix = 0;
        while headers.contains(&unique) {
            suffix += 1;
            unique = format!("{}.{}", base, suffix);
        }
        headers.push(unique);
    }

    headers
}
