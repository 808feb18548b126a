//! HTTP API handlers for cluster control, benchmark runs and results.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use mpi_bench::{build_report, csv_file_name, csv_table, BenchError, BenchmarkRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::state::DashboardState;

/// Response for health check endpoint.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Error response structure.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    fn no_current_result() -> Self {
        Self {
            error: "No benchmark result yet. Run a benchmark or load a saved result.".to_string(),
            code: "NO_CURRENT_RESULT".to_string(),
        }
    }
}

impl From<BenchError> for ErrorResponse {
    fn from(e: BenchError) -> Self {
        Self {
            error: e.to_string(),
            code: e.code().to_string(),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "NOT_FOUND" | "NODE_NOT_FOUND" | "NO_CURRENT_RESULT" => StatusCode::NOT_FOUND,
            "INVALID_REQUEST" | "INVALID_NAME" => StatusCode::BAD_REQUEST,
            "RUNTIME_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
            "READINESS_TIMEOUT" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct StartQuery {
    /// Nodes including the head; the full cluster when absent
    pub nodes: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub tail: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub node: String,
    pub logs: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveQuery {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub file: String,
    pub path: String,
}

/// Health check handler.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub async fn cluster_status_handler(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    Json(state.controller.report().await)
}

pub async fn start_cluster_handler(
    State(state): State<Arc<DashboardState>>,
    Query(params): Query<StartQuery>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let nodes = params
        .nodes
        .unwrap_or_else(|| state.controller.node_names().len());
    let results = state.controller.start_cluster(nodes).await.map_err(|e| {
        tracing::warn!("Cluster start failed: {}", e);
        ErrorResponse::from(e)
    })?;
    Ok(Json(results))
}

pub async fn stop_cluster_handler(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    Json(state.controller.stop_cluster().await)
}

pub async fn logs_handler(
    State(state): State<Arc<DashboardState>>,
    Path(node): Path<String>,
    Query(params): Query<LogsQuery>,
) -> impl IntoResponse {
    let logs = state.controller.logs(&node, params.tail.unwrap_or(50)).await;
    Json(LogsResponse { node, logs })
}

/// Runs a benchmark and makes it the current result.
///
/// Requests queue behind any run already in progress.
pub async fn run_benchmark_handler(
    State(state): State<Arc<DashboardState>>,
    Json(request): Json<BenchmarkRequest>,
) -> Result<impl IntoResponse, ErrorResponse> {
    request.validate()?;

    let document = {
        let _guard = state.lock_run().await;
        state.runner.execute(request).await?
    };
    state.set_current(document.clone()).await;
    Ok(Json(document))
}

pub async fn current_result_handler(
    State(state): State<Arc<DashboardState>>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let document = state
        .current()
        .await
        .ok_or_else(ErrorResponse::no_current_result)?;
    Ok(Json(document))
}

pub async fn current_report_handler(
    State(state): State<Arc<DashboardState>>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let document = state
        .current()
        .await
        .ok_or_else(ErrorResponse::no_current_result)?;
    Ok(Json(build_report(&document)))
}

pub async fn current_csv_handler(
    State(state): State<Arc<DashboardState>>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let document = state
        .current()
        .await
        .ok_or_else(ErrorResponse::no_current_result)?;
    let csv = csv_table(&document)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        csv_file_name(document.matrix_size())
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

pub async fn save_current_handler(
    State(state): State<Arc<DashboardState>>,
    Query(params): Query<SaveQuery>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let document = state
        .current()
        .await
        .ok_or_else(ErrorResponse::no_current_result)?;
    let path = state.store.save(&document, params.name.as_deref())?;

    Ok(Json(SaveResponse {
        file: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: path.display().to_string(),
    }))
}

pub async fn list_results_handler(
    State(state): State<Arc<DashboardState>>,
) -> Result<impl IntoResponse, ErrorResponse> {
    Ok(Json(state.store.list_saved()?))
}

/// Loads a saved result and makes it the current one.
pub async fn load_result_handler(
    State(state): State<Arc<DashboardState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ErrorResponse> {
    let document = state.store.load(&name)?;
    state.set_current(document.clone()).await;
    Ok(Json(document))
}
