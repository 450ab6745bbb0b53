//! REST API handlers for serve mode.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use sqlgraph_core::{
    resolve_and_assemble, InputError, ParseError, SqlFile, WorkflowError, WorkflowResponse,
};
use tracing::{info, warn};

use super::state::AppState;
use crate::input;

/// Build the API router with all endpoints.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/config", get(config))
        .route("/workflow", post(workflow))
}

// === Request/Response types ===

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ConfigResponse {
    max_archive_bytes: u64,
    max_files: usize,
    max_file_bytes: Option<u64>,
    request_timeout_secs: u64,
    has_catalog: bool,
}

/// Structured failure body: `{kind, detail}`.
#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    detail: String,
}

type ApiFailure = (StatusCode, Json<ErrorBody>);

fn failure(err: WorkflowError) -> ApiFailure {
    let status = match &err {
        WorkflowError::Input(InputError::ArchiveTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
        WorkflowError::Input(_) => StatusCode::BAD_REQUEST,
        WorkflowError::Cycle(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
    };
    (
        status,
        Json(ErrorBody {
            kind: err.kind(),
            detail: err.to_string(),
        }),
    )
}

/// A crashed worker task, not a property of the request.
fn internal(detail: String) -> ApiFailure {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            kind: "InternalError",
            detail,
        }),
    )
}

// === Handlers ===

/// GET /api/health - Health check with version
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/config - Effective limits and defaults
async fn config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        max_archive_bytes: state.config.limits.max_archive_bytes,
        max_files: state.config.limits.max_files,
        max_file_bytes: state.config.options.max_file_bytes,
        request_timeout_secs: state.config.request_timeout_secs,
        has_catalog: state.config.options.catalog.is_some(),
    })
}

/// POST /api/workflow - Upload a zip of SQL scripts, get the inferred workflow
async fn workflow(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiFailure> {
    let (file_name, bytes) = read_upload(&mut multipart).await?;

    let deadline = Duration::from_secs(state.config.request_timeout_secs);
    let timeout_secs = state.config.request_timeout_secs;

    match tokio::time::timeout(deadline, process_archive(state, file_name, bytes)).await {
        Ok(Ok(response)) => {
            info!(
                jobs = response.spec.jobs.len(),
                warnings = response.warnings.len(),
                "workflow assembled"
            );
            Ok(Json(response))
        }
        Ok(Err(err)) => {
            warn!(kind = err.1.kind, detail = %err.1.detail, "workflow inference failed");
            Err(err)
        }
        // Partial results are discarded rather than returned inconsistently.
        Err(_elapsed) => Err(failure(WorkflowError::Timeout(timeout_secs))),
    }
}

/// Pulls the uploaded archive out of the multipart body.
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiFailure> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        failure(WorkflowError::Input(InputError::NotAnArchive(
            e.to_string(),
        )))
    })? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|e| {
            failure(WorkflowError::Input(InputError::NotAnArchive(
                e.to_string(),
            )))
        })?;
        return Ok((file_name, bytes.to_vec()));
    }
    Err(failure(WorkflowError::Input(InputError::NotAnArchive(
        "missing file field".to_string(),
    ))))
}

/// Extraction and inference, fanned out per file.
async fn process_archive(
    state: Arc<AppState>,
    file_name: String,
    bytes: Vec<u8>,
) -> Result<WorkflowResponse, ApiFailure> {
    let limits = state.config.limits;
    let name_for_extract = file_name.clone();
    let files = tokio::task::spawn_blocking(move || {
        input::extract_archive(&name_for_extract, &bytes, &limits)
    })
    .await
    .map_err(|e| internal(e.to_string()))?
    .map_err(|e| failure(e.into()))?;

    // Parsing is independent per file; fan out across blocking workers and
    // join before resolution, which needs the complete job set.
    let mut handles = Vec::with_capacity(files.len());
    for file in files {
        let options = state.config.options.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            sqlgraph_core::extract_file(&file, &options)
        }));
    }

    let mut lineages = Vec::new();
    let mut warnings: Vec<ParseError> = Vec::new();
    for handle in handles {
        match handle.await.map_err(|e| internal(e.to_string()))? {
            Ok(lineage) => lineages.push(lineage),
            Err(warning) => warnings.push(warning),
        }
    }

    let workflow_name = workflow_name_from(&file_name);
    let schedule = state.config.options.schedule.clone().unwrap_or_default();
    resolve_and_assemble(&workflow_name, lineages, warnings, &schedule).map_err(failure)
}

/// Workflow name from the uploaded archive name: stem of the last segment.
fn workflow_name_from(file_name: &str) -> String {
    SqlFile::new(file_name, "").job_name()
}
