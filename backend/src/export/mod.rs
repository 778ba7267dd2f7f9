//! Serializing the working table into a downloadable buffer.

pub mod delimited;
pub mod spreadsheet;

use serde::Serialize;
use std::path::Path;

use crate::error::ExportResult;
use crate::models::{ExportFormat, Table};

pub use delimited::write_csv;
pub use spreadsheet::write_excel;

/// An in-memory export, ready to be offered as a download.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBuffer {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: &'static str,
    pub format: ExportFormat,
}

impl ExportBuffer {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Serialize `table` to `format`, naming the result after `original_name`.
pub fn export(table: &Table, format: ExportFormat, original_name: &str) -> ExportResult<ExportBuffer> {
    let bytes = match format {
        ExportFormat::Csv => write_csv(table)?,
        ExportFormat::Excel => write_excel(table)?,
    };

    Ok(ExportBuffer {
        bytes,
        file_name: output_file_name(original_name, format),
        mime: format.mime_type(),
        format,
    })
}

/// Replace the last extension of `original` with the one of `format`.
///
/// ```ignore
/// assert_eq!(output_file_name("sales.2024.xlsx", ExportFormat::Csv), "sales.2024.csv");
/// ```
pub fn output_file_name(original: &str, format: ExportFormat) -> String {
    let stem = match Path::new(original).extension() {
        Some(ext) => &original[..original.len() - ext.len() - 1],
        None => original,
    };
    format!("{}.{}", stem, format.extension())
}
