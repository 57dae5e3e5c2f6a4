use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::errors::{ReaderError, RunError, StoreError};
use crate::pipeline::{Coordinator, ResultReader, Scope};
use crate::store::BlobStore;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub coordinator: Coordinator,
    pub reader: ResultReader,
    pub store: Arc<dyn BlobStore>,
}

pub type SharedState = Arc<AppState>;

// ── Payload types ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub repo_url: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub run_id: String,
    pub reports_bucket: String,
    pub region: String,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {}", msg),
            ),
        };
        (
            status,
            Json(serde_json::json!({"status": "error", "message": message})),
        )
            .into_response()
    }
}

impl From<RunError> for ApiError {
    fn from(e: RunError) -> Self {
        match e {
            RunError::InvalidInput { .. } => ApiError::BadRequest(e.to_string()),
            RunError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { key } => {
                ApiError::NotFound(format!("Object not found: {}", key))
            }
            StoreError::InvalidKey { .. } => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ReaderError> for ApiError {
    fn from(e: ReaderError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/api/runs/latest", get(latest_run))
        .route("/api/runs/{run_id}", get(run_status))
        .route("/reports/{name}", get(serve_report))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn analyze(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: AnalyzeRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;

    let receipt = state.coordinator.start_run(&request.repo_url).await?;
    Ok(Json(AnalyzeResponse {
        status: "success",
        message: "Analysis started asynchronously.",
        run_id: receipt.run_id,
        reports_bucket: receipt.bucket,
        region: receipt.region,
    }))
}

async fn run_status(
    State(state): State<SharedState>,
    Path(run_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.reader.snapshot(&Scope::Run(run_id)).await?;
    Ok(Json(snapshot))
}

async fn latest_run(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.reader.snapshot(&Scope::Latest).await?;
    Ok(Json(snapshot))
}

/// Serve a stored report with the content type and cache directive it was written with.
async fn serve_report(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let key = format!("reports/{}", name);
    let body = state.store.get(&key).await?;
    let meta = state.store.head(&key).await?;

    let mut headers = HeaderMap::new();
    if let Some(meta) = meta {
        if let Ok(value) = HeaderValue::from_str(&meta.content_type) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        if let Some(cache) = meta.cache.header_value() {
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache));
        }
    }
    Ok((StatusCode::OK, headers, body))
}
