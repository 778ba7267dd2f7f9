//! REST API types for frontend integration.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::export::ExportBuffer;
use crate::models::{Cell, ColumnKind, Table};
use crate::parser::LoadedFile;
use crate::transform::pipeline::{PipelineStep, ProcessResult, SourceInfo, StepPreview};
use crate::transform::ChartData;

/// Column header shown above a preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
    pub missing: usize,
}

/// First rows of a table, ready for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePreview {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<Cell>>,
    /// Rows in the whole table, not only the preview
    pub total_rows: usize,
}

impl TablePreview {
    /// Preview of `preview`, a head of a table holding `total_rows` rows.
    pub fn new(preview: &Table, total_rows: usize) -> Self {
        Self {
            columns: preview
                .columns()
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name.clone(),
                    kind: c.kind,
                    missing: c.missing_count(),
                })
                .collect(),
            rows: preview
                .rows()
                .map(|row| row.into_iter().cloned().collect())
                .collect(),
            total_rows,
        }
    }

    pub fn of(table: &Table, rows: usize) -> Self {
        Self::new(&table.head(rows), table.row_count())
    }
}

/// Response of `POST /api/preview`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub job_id: String,
    pub status: String,
    pub source: SourceInfo,
    pub preview: TablePreview,
}

impl PreviewResponse {
    pub fn new(loaded: &LoadedFile, rows: usize) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            status: "ready".to_string(),
            source: SourceInfo::from(loaded),
            preview: TablePreview::of(&loaded.table, rows),
        }
    }
}

/// Preview taken after one pipeline step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResponse {
    pub step: PipelineStep,
    pub preview: TablePreview,
}

impl From<&StepPreview> for StepResponse {
    fn from(step: &StepPreview) -> Self {
        Self {
            step: step.step,
            preview: TablePreview::new(&step.preview, step.total_rows),
        }
    }
}

/// Response of `POST /api/transform`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    pub job_id: String,
    /// "ready", or "warning" when a chart was asked for but nothing could be drawn
    pub status: String,
    pub source: SourceInfo,
    pub steps: Vec<StepResponse>,
    pub chart: Option<ChartData>,
    pub export: ExportBuffer,
}

impl From<&ProcessResult> for TransformResponse {
    fn from(result: &ProcessResult) -> Self {
        let chart = result.transformed.chart.clone();
        let warning = chart.as_ref().is_some_and(ChartData::is_empty);

        Self {
            job_id: Uuid::new_v4().to_string(),
            status: if warning { "warning" } else { "ready" }.to_string(),
            source: result.source.clone(),
            steps: result.transformed.previews.iter().map(StepResponse::from).collect(),
            chart,
            export: result.export.clone(),
        }
    }
}

/// A file of a batch that could not be processed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    pub file_name: String,
    pub status: String,
    pub error: String,
}

/// Result for one uploaded file.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FileOutcome<T> {
    Done(T),
    Failed(FileFailure),
}

impl<T> FileOutcome<T> {
    pub fn failed(file_name: impl Into<String>, error: impl Into<String>) -> Self {
        FileOutcome::Failed(FileFailure {
            file_name: file_name.into(),
            status: "error".to_string(),
            error: error.into(),
        })
    }

    pub fn is_done(&self) -> bool {
        matches!(self, FileOutcome::Done(_))
    }
}

/// Response of the endpoints that take several files, in upload order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse<T> {
    pub job_id: String,
    /// "ready", "partial" when some files failed, "error" when all did
    pub status: String,
    pub files: Vec<FileOutcome<T>>,
}

impl<T> BatchResponse<T> {
    pub fn new(files: Vec<FileOutcome<T>>) -> Self {
        let done = files.iter().filter(|f| f.is_done()).count();
        let status = match done {
            0 => "error",
            n if n == files.len() => "ready",
            _ => "partial",
        };

        Self {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            files,
        }
    }
}

/// `Content-Disposition` value offering `file_name` as a download.
pub fn attachment_header(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}
