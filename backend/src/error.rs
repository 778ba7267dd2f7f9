//! Error types for the conversion pipeline.
//!
//! - [`ParseError`] - Loading CSV / Excel input
//! - [`ExportError`] - Serializing a table to CSV / Excel
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ConfigError`] - Invalid environment configuration
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

pub use crate::parser::delimited::CsvError;

// =============================================================================
// Parse Errors
// =============================================================================

/// Errors while loading an uploaded file. No partial table is produced.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Extension is neither `.csv` nor `.xlsx`.
    #[error("Unsupported file type '{0}' (expected .csv or .xlsx)")]
    UnsupportedFormat(String),

    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed delimited text.
    #[error("Invalid CSV format: {0}")]
    Csv(#[from] CsvError),

    /// Bytes are not a readable xlsx workbook.
    #[error("Invalid Excel workbook: {0}")]
    Excel(String),

    /// Workbook without any worksheet.
    #[error("Workbook contains no worksheet")]
    NoSheets,

    /// Nothing to read, not even a header.
    #[error("File is empty")]
    EmptyFile,
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while serializing the working table.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel write error: {0}")]
    Excel(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Table does not fit in a worksheet.
    #[error("Table too large for a worksheet: {0}")]
    SheetLimits(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors, returned by [`crate::transform::pipeline::transform`]
/// and [`crate::transform::pipeline::process_bytes`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Selected column does not exist in the table.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
}

// =============================================================================
// Config Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type LoadResult<T> = Result<T, ParseError>;

pub type ExportResult<T> = Result<T, ExportError>;

pub type PipelineResult<T> = Result<T, PipelineError>;

pub type ServerResult<T> = Result<T, ServerError>;
