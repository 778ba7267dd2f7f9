//! HTTP Server for the tabconv API.
//!
//! Every request carries its own file; nothing is kept between requests.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                                  |
//! |--------|-------------------|----------------------------------------------|
//! | GET    | `/health`         | Health check                                 |
//! | POST   | `/api/preview`    | Upload files, get columns and first rows     |
//! | POST   | `/api/transform`  | Upload files + options, get step previews    |
//! | POST   | `/api/export`     | Upload a file + options, download the result |
//!
//! `preview` and `transform` accept several `file` fields and answer with
//! one entry per file; a file that fails does not affect the others.
//! | GET    | `/api/logs`       | SSE stream for real-time logs                |

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{
    attachment_header, error_response, BatchResponse, FileOutcome, PreviewResponse,
    TransformResponse,
};
use crate::config::ServerConfig;
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::parser::load;
use crate::transform::pipeline::{
    print_source_info, process_bytes, SourceInfo, TransformOptions,
};

/// Read-only settings shared by the handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<ServerConfig>,
}

/// One `file` field of a multipart upload.
struct UploadedFile {
    file_name: String,
    bytes: Vec<u8>,
}

/// A multipart upload: one or more `file` fields and the optional `options` field.
struct Upload {
    files: Vec<UploadedFile>,
    options: TransformOptions,
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Parse(_)) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::UnknownColumn(_)) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Export(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        log_error(self.to_string());
        (self.status_code(), Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the router. Split from [`start_server`] so it can be mounted elsewhere.
pub fn router(config: ServerConfig) -> Router {
    // Permissive CORS, the front end is served from anywhere
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    let body_limit = config.max_upload_bytes;
    let static_dir = config.static_dir.clone();
    let state = AppState {
        config: Arc::new(config),
    };

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/api/preview", post(preview))
        .route("/api/transform", post(transform))
        .route("/api/export", post(export))
        .route("/api/logs", get(sse_logs));

    app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app.route("/", get(health)),
    };

    app.layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    println!("🚀 tabconv server running on http://localhost:{}", config.port);
    println!("   POST /api/preview   - Upload CSV or Excel files");
    println!("   POST /api/transform - Clean files and preview each step");
    println!("   POST /api/export    - Clean a file and download it");
    println!("   GET  /api/logs      - SSE log stream");
    println!("   GET  /health        - Health check");
    if let Some(ref dir) = config.static_dir {
        println!("   Serving front end from {}", dir.display());
    }
    println!();

    let app = router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "tabconv",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "preview": "POST /api/preview",
            "transform": "POST /api/transform",
            "export": "POST /api/export",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Load each file and return its columns and first rows
async fn preview(State(state): State<AppState>, multipart: Multipart) -> ServerResult<Response> {
    let upload = read_upload(multipart, state.config.preview_rows).await?;
    let rows = upload.options.preview_rows;

    let mut outcomes = Vec::with_capacity(upload.files.len());
    for file in upload.files {
        print_upload_banner(&file);
        let file_name = file.file_name.clone();
        let outcome = run_blocking(move || {
            let loaded = load(&file.bytes, &file.file_name).map_err(PipelineError::from)?;
            print_source_info(&SourceInfo::from(&loaded));
            Ok(PreviewResponse::new(&loaded, rows))
        })
        .await;
        outcomes.push((file_name, outcome));
    }

    Ok(batch_response(outcomes))
}

/// Run the pipeline on each file and return the previews, chart data and export metadata
async fn transform(State(state): State<AppState>, multipart: Multipart) -> ServerResult<Response> {
    let upload = read_upload(multipart, state.config.preview_rows).await?;
    let options = Arc::new(upload.options);

    let mut outcomes = Vec::with_capacity(upload.files.len());
    for file in upload.files {
        print_upload_banner(&file);
        let file_name = file.file_name.clone();
        let options = Arc::clone(&options);
        let outcome = run_blocking(move || {
            let result = process_bytes(&file.bytes, &file.file_name, &options)?;
            Ok(TransformResponse::from(&result))
        })
        .await;
        outcomes.push((file_name, outcome));
    }

    Ok(batch_response(outcomes))
}

/// Run the pipeline and return the exported file
async fn export(State(state): State<AppState>, multipart: Multipart) -> ServerResult<Response> {
    let upload = read_upload(multipart, state.config.preview_rows).await?;
    let options = upload.options;
    let file = match <[UploadedFile; 1]>::try_from(upload.files) {
        Ok([file]) => file,
        Err(files) => {
            return Err(ServerError::BadRequest(format!(
                "Export takes exactly one file, got {}",
                files.len()
            )))
        }
    };
    print_upload_banner(&file);

    let result =
        run_blocking(move || Ok(process_bytes(&file.bytes, &file.file_name, &options)?)).await?;
    let buffer = result.export;

    let disposition = HeaderValue::from_str(&attachment_header(&buffer.file_name))
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(buffer.mime)),
        (header::CONTENT_DISPOSITION, disposition),
    ];

    Ok((headers, buffer.bytes).into_response())
}

/// Run CPU-bound parsing and export off the async workers.
async fn run_blocking<T, F>(job: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
}

/// One entry per file. 200 when at least one file went through, otherwise
/// the most severe status among the failures.
fn batch_response<T: serde::Serialize>(outcomes: Vec<(String, ServerResult<T>)>) -> Response {
    let status = if outcomes.iter().any(|(_, outcome)| outcome.is_ok()) {
        StatusCode::OK
    } else {
        outcomes
            .iter()
            .filter_map(|(_, outcome)| outcome.as_ref().err())
            .map(ServerError::status_code)
            .max()
            .unwrap_or(StatusCode::BAD_REQUEST)
    };

    let files = outcomes
        .into_iter()
        .map(|(file_name, outcome)| match outcome {
            Ok(response) => FileOutcome::Done(response),
            Err(e) => {
                log_error(format!("{}: {}", file_name, e));
                FileOutcome::failed(file_name, e.to_string())
            }
        })
        .collect();

    (status, Json(BatchResponse::new(files))).into_response()
}

/// Collect the `file` and `options` fields of a multipart body.
async fn read_upload(mut multipart: Multipart, preview_rows: usize) -> ServerResult<Upload> {
    let mut files = Vec::new();
    let mut options = parse_options("", preview_rows)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| ServerError::BadRequest("File field has no file name".into()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                files.push(UploadedFile {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            "options" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                options = parse_options(&text, preview_rows)?;
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(ServerError::BadRequest("No file provided".into()));
    }

    Ok(Upload { files, options })
}

/// Parse the `options` field. `previewRows` defaults to the server setting.
fn parse_options(text: &str, preview_rows: usize) -> ServerResult<TransformOptions> {
    let invalid = |e: serde_json::Error| ServerError::BadRequest(format!("Invalid options: {}", e));

    let mut value: Value = if text.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(text).map_err(invalid)?
    };

    if let Some(fields) = value.as_object_mut() {
        fields.entry("previewRows").or_insert(json!(preview_rows));
    }

    serde_json::from_value(value).map_err(invalid)
}

fn print_upload_banner(file: &UploadedFile) {
    println!("\n{}", "=".repeat(70));
    println!("📄 NEW UPLOAD: {} ({} bytes)", file.file_name, file.bytes.len());
    println!("{}\n", "=".repeat(70));
}
