//! High-level pipeline API: load → deduplicate → fill → select → chart → export.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabconv::transform::pipeline::{process_bytes, TransformOptions};
//! use tabconv::models::ExportFormat;
//!
//! let options = TransformOptions {
//!     remove_duplicates: true,
//!     fill_missing_numeric: true,
//!     export_format: ExportFormat::Excel,
//!     ..TransformOptions::default()
//! };
//! let result = process_bytes(b"a,b\n1,2\n1,2\n3,\n", "data.csv", &options)?;
//! assert_eq!(result.export.file_name, "data.xlsx");
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::chart::{extract_chart, ChartData};
use super::steps::{fill_missing_with_mean, remove_duplicates, select_columns};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::config::{CHART_MAX_SERIES, PREVIEW_ROWS};
use crate::error::PipelineResult;
use crate::export::{export, ExportBuffer};
use crate::models::{ExportFormat, SourceFormat, Table};
use crate::parser::{load, load_file, LoadedFile};

/// Options for one file, all independent of each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// Drop rows equal to an earlier row
    pub remove_duplicates: bool,

    /// Fill missing numeric values with the column mean
    pub fill_missing_numeric: bool,

    /// Columns to keep; `None` keeps all of them
    pub selected_columns: Option<Vec<String>>,

    /// Extract bar chart data for the first numeric columns
    pub show_chart: bool,

    /// Target format of the export
    pub export_format: ExportFormat,

    /// Number of rows in each preview
    pub preview_rows: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            remove_duplicates: false,
            fill_missing_numeric: false,
            selected_columns: None,
            show_chart: false,
            export_format: ExportFormat::Csv,
            preview_rows: PREVIEW_ROWS,
        }
    }
}

/// Step after which a preview was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineStep {
    Loaded,
    DuplicatesRemoved,
    MissingFilled,
    ColumnsSelected,
}

/// First rows of the working table after a step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepPreview {
    pub step: PipelineStep,
    pub preview: Table,
    /// Row count of the whole working table at that point
    pub total_rows: usize,
}

impl StepPreview {
    fn capture(step: PipelineStep, table: &Table, rows: usize) -> Self {
        Self {
            step,
            preview: table.head(rows),
            total_rows: table.row_count(),
        }
    }
}

/// Output of [`transform`].
#[derive(Debug, Clone)]
pub struct Transformed {
    /// Working table after the last step
    pub table: Table,
    /// One preview after loading and one per applied step
    pub previews: Vec<StepPreview>,
    /// Present when a chart was requested
    pub chart: Option<ChartData>,
}

impl Transformed {
    /// First rows of the final working table.
    pub fn preview(&self) -> Option<&Table> {
        self.previews.last().map(|p| &p.preview)
    }
}

/// What was read from the uploaded file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub file_name: String,
    pub format: SourceFormat,
    pub encoding: Option<String>,
    pub delimiter: Option<char>,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl From<&LoadedFile> for SourceInfo {
    fn from(loaded: &LoadedFile) -> Self {
        Self {
            file_name: loaded.file_name.clone(),
            format: loaded.format,
            encoding: loaded.encoding.clone(),
            delimiter: loaded.delimiter,
            row_count: loaded.table.row_count(),
            columns: loaded.table.column_names().into_iter().map(String::from).collect(),
        }
    }
}

/// Result of a complete load → transform → export run.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub source: SourceInfo,
    pub transformed: Transformed,
    pub export: ExportBuffer,
}

/// Apply the cleaning steps selected in `options`, in fixed order.
///
/// 1. Remove duplicates
/// 2. Fill missing numeric values with the mean
/// 3. Select columns
/// 4. Extract chart data (display only)
pub fn transform(table: Table, options: &TransformOptions) -> PipelineResult<Transformed> {
    let rows = options.preview_rows;
    let mut previews = vec![StepPreview::capture(PipelineStep::Loaded, &table, rows)];
    let mut working = table;

    if options.remove_duplicates {
        let before = working.row_count();
        working = remove_duplicates(&working);
        log_success(format!(
            "Duplicates removed ({} rows dropped, {} remaining)",
            before - working.row_count(),
            working.row_count()
        ));
        previews.push(StepPreview::capture(PipelineStep::DuplicatesRemoved, &working, rows));
    }

    if options.fill_missing_numeric {
        let missing_before = count_numeric_missing(&working);
        working = fill_missing_with_mean(&working);
        let still_missing = count_numeric_missing(&working);
        log_success(format!(
            "Missing values filled with mean ({} cells filled)",
            missing_before - still_missing
        ));
        if still_missing > 0 {
            log_warning(format!(
                "{} cells left missing in numeric columns without any value",
                still_missing
            ));
        }
        previews.push(StepPreview::capture(PipelineStep::MissingFilled, &working, rows));
    }

    if let Some(selection) = &options.selected_columns {
        working = select_columns(&working, selection)?;
        log_info(format!("Keeping {} of the columns", working.column_count()));
        previews.push(StepPreview::capture(PipelineStep::ColumnsSelected, &working, rows));
    }

    let chart = options.show_chart.then(|| {
        let chart = extract_chart(&working, CHART_MAX_SERIES);
        if chart.is_empty() {
            log_warning("No numeric columns to show in chart");
        }
        chart
    });

    Ok(Transformed {
        table: working,
        previews,
        chart,
    })
}

/// Load, transform and export an uploaded file.
pub fn process_bytes(
    bytes: &[u8],
    file_name: &str,
    options: &TransformOptions,
) -> PipelineResult<ProcessResult> {
    log_info(format!("📖 Reading {} ({} bytes)...", file_name, bytes.len()));
    let loaded = load(bytes, file_name)?;
    process_loaded(loaded, options)
}

/// Same as [`process_bytes`], reading the file from disk.
pub fn process_file(path: &Path, options: &TransformOptions) -> PipelineResult<ProcessResult> {
    log_info(format!("📖 Reading {}...", path.display()));
    let loaded = load_file(path)?;
    process_loaded(loaded, options)
}

fn process_loaded(loaded: LoadedFile, options: &TransformOptions) -> PipelineResult<ProcessResult> {
    let source = SourceInfo::from(&loaded);
    print_source_info(&source);

    let transformed = transform(loaded.table, options)?;

    log_info(format!("💾 Exporting as {}...", options.export_format));
    let buffer = export(&transformed.table, options.export_format, &source.file_name)?;
    log_success(format!("{} ready ({} bytes)", buffer.file_name, buffer.len()));

    Ok(ProcessResult {
        source,
        transformed,
        export: buffer,
    })
}

/// Log what was detected while loading.
pub fn print_source_info(source: &SourceInfo) {
    if let Some(ref encoding) = source.encoding {
        log_success(format!("Detected encoding: {}", encoding));
    }
    if let Some(delimiter) = source.delimiter {
        log_success(format!("Detected separator: '{}'", format_delimiter(delimiter)));
    }
    log_success(format!("Read {} rows", source.row_count));

    log_info(format!("📋 {} has {} columns:", source.format, source.columns.len()));
    for (i, col) in source.columns.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

fn count_numeric_missing(table: &Table) -> usize {
    table.numeric_columns().map(|c| c.missing_count()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineError, ParseError};
    use crate::models::Cell;

    const SAMPLE: &[u8] = b"a,b\n1,2\n1,2\n3,\n";

    fn sample_table() -> Table {
        load(SAMPLE, "sample.csv").unwrap().table
    }

    #[test]
    fn test_default_options() {
        let opts = TransformOptions::default();
        assert!(!opts.remove_duplicates);
        assert!(!opts.fill_missing_numeric);
        assert!(opts.selected_columns.is_none());
        assert_eq!(opts.export_format, ExportFormat::Csv);
        assert_eq!(opts.preview_rows, 5);
    }

    #[test]
    fn test_options_from_partial_json() {
        let opts: TransformOptions = serde_json::from_str(
            r#"{"removeDuplicates": true, "selectedColumns": ["a"], "exportFormat": "excel"}"#,
        )
        .unwrap();

        assert!(opts.remove_duplicates);
        assert!(!opts.show_chart);
        assert_eq!(opts.selected_columns, Some(vec!["a".to_string()]));
        assert_eq!(opts.export_format, ExportFormat::Excel);
        assert_eq!(opts.preview_rows, 5);
    }

    #[test]
    fn test_no_options_is_identity() {
        let table = sample_table();
        let result = transform(table.clone(), &TransformOptions::default()).unwrap();

        assert_eq!(result.table, table);
        assert_eq!(result.previews.len(), 1);
        assert_eq!(result.previews[0].step, PipelineStep::Loaded);
        assert!(result.chart.is_none());
    }

    #[test]
    fn test_full_pipeline() {
        let options = TransformOptions {
            remove_duplicates: true,
            fill_missing_numeric: true,
            selected_columns: Some(vec!["a".into(), "b".into()]),
            show_chart: true,
            ..TransformOptions::default()
        };
        let result = transform(sample_table(), &options).unwrap();

        assert_eq!(result.table.row_count(), 2);
        assert_eq!(result.table.row(0), vec![&Cell::Number(1.0), &Cell::Number(2.0)]);
        assert_eq!(result.table.row(1), vec![&Cell::Number(3.0), &Cell::Number(2.0)]);

        let steps: Vec<PipelineStep> = result.previews.iter().map(|p| p.step).collect();
        assert_eq!(
            steps,
            vec![
                PipelineStep::Loaded,
                PipelineStep::DuplicatesRemoved,
                PipelineStep::MissingFilled,
                PipelineStep::ColumnsSelected,
            ]
        );
        assert!(matches!(result.chart, Some(ChartData::Bar(_))));
    }

    #[test]
    fn test_previews_are_capped() {
        let csv: String = std::iter::once("n".to_string())
            .chain((0..20).map(|i| i.to_string()))
            .collect::<Vec<_>>()
            .join("\n");
        let table = load(csv.as_bytes(), "n.csv").unwrap().table;

        let result = transform(table, &TransformOptions::default()).unwrap();
        let preview = result.preview().unwrap();
        assert_eq!(preview.row_count(), 5);
        assert_eq!(result.previews[0].total_rows, 20);
    }

    #[test]
    fn test_chart_without_numeric_columns() {
        let table = load(b"name\nann\nbob\n", "names.csv").unwrap().table;
        let options = TransformOptions {
            show_chart: true,
            ..TransformOptions::default()
        };

        let result = transform(table, &options).unwrap();
        assert_eq!(result.chart, Some(ChartData::NothingToChart));
    }

    #[test]
    fn test_unknown_column_fails() {
        let options = TransformOptions {
            selected_columns: Some(vec!["missing".into()]),
            ..TransformOptions::default()
        };
        let err = transform(sample_table(), &options).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownColumn(_)));
    }

    #[test]
    fn test_process_bytes_to_csv() {
        let options = TransformOptions {
            remove_duplicates: true,
            fill_missing_numeric: true,
            selected_columns: Some(vec!["a".into()]),
            ..TransformOptions::default()
        };
        let result = process_bytes(SAMPLE, "sample.csv", &options).unwrap();

        assert_eq!(result.source.row_count, 3);
        assert_eq!(result.source.delimiter, Some(','));
        assert_eq!(result.export.file_name, "sample.csv");
        assert_eq!(result.export.bytes, b"a\n1\n3\n");
    }

    #[test]
    fn test_process_bytes_to_excel_round_trip() {
        let options = TransformOptions {
            fill_missing_numeric: true,
            export_format: ExportFormat::Excel,
            ..TransformOptions::default()
        };
        let result = process_bytes(SAMPLE, "sample.csv", &options).unwrap();
        assert_eq!(result.export.file_name, "sample.xlsx");

        let reloaded = load(&result.export.bytes, &result.export.file_name).unwrap();
        assert_eq!(reloaded.table, result.transformed.table);
    }

    #[test]
    fn test_process_bytes_parse_error() {
        let err = process_bytes(b"a,b\n1,2,3\n", "bad.csv", &TransformOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(ParseError::Csv(_))));
    }

    #[test]
    fn test_process_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let result = process_file(&path, &TransformOptions::default()).unwrap();
        assert_eq!(result.export.bytes, b"a,b\n1,2\n1,2\n3,\n");
    }

    #[test]
    fn test_format_delimiter() {
        assert_eq!(format_delimiter('\t'), "TAB");
        assert_eq!(format_delimiter(';'), ";");
    }
}
