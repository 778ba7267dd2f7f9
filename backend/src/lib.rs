//! # tabconv - CSV and Excel converter and cleaner
//!
//! tabconv loads CSV or Excel files, applies optional cleaning steps and
//! exports the result as CSV or Excel.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────────┐     ┌─────────────┐
//! │ CSV / XLSX  │────▶│   Parser    │────▶│      Transform       │────▶│   Export    │
//! │   (bytes)   │     │ (auto-enc)  │     │ dedup, fill, select  │     │ CSV / XLSX  │
//! └─────────────┘     └─────────────┘     └──────────────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tabconv::{process_bytes, TransformOptions};
//!
//! let options = TransformOptions { remove_duplicates: true, ..Default::default() };
//! let result = process_bytes(&bytes, "sales.xlsx", &options)?;
//! std::fs::write(&result.export.file_name, &result.export.bytes)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Table, columns, cells and formats
//! - [`parser`] - CSV and Excel loading with type inference
//! - [`transform`] - Cleaning steps, chart data and pipeline
//! - [`export`] - CSV and Excel serialization
//! - [`config`] - Defaults and environment configuration
//! - [`api`] - HTTP API server and log streaming

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Loading
pub mod parser;

// Transformation
pub mod transform;

// Serialization
pub mod export;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{ConfigError, CsvError, ExportError, ParseError, PipelineError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, Column, ColumnKind, ExportFormat, SourceFormat, Table};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{detect_delimiter, detect_encoding, load, load_file, LoadedFile};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    extract_chart, fill_missing_with_mean, process_bytes, process_file, remove_duplicates,
    select_columns, transform, ChartData, PipelineStep, ProcessResult, SourceInfo, StepPreview,
    TransformOptions, Transformed,
};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{export, output_file_name, ExportBuffer};

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::ServerConfig;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
