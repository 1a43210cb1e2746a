use std::collections::HashMap;
use std::time::Duration;

use axum::{Json, extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, response::Response};
use http_body_util::{BodyExt, Limited};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{
    models::{DownloadPayload, HealthResponse},
    respond::respond,
    state::AppState,
};
use crate::api::error::ApiError;
use crate::job::{InfrastructureError, JobError};

/// Bulk download endpoint (POST /api/download)
///
/// Runs the whole job inside the request and answers with the archive.
///
/// ## Flow:
/// 1. Validate Content-Type, read the (already decompressed) body and
///    enforce the size limit
/// 2. Deserialize `{"urls": [...]}`
/// 3. Run the job on its own task, bounded by `jobs.timeout_secs`
/// 4. Stream the archive back; the workspace goes away with the body
///
/// If the client disconnects the job is cancelled: running items finish,
/// nothing new starts and the workspace is released.
pub async fn download_videos(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<Response, ApiError> {
    super::utils::require_json(&headers)?;

    let max_payload = state.config.server.api.max_payload_bytes.as_u64() as usize;
    let body_bytes = read_body(body, max_payload).await?;
    let payload: DownloadPayload = serde_json::from_slice(&body_bytes)?;

    info!(urls = payload.urls.len(), "Download requested");

    // Fires when this handler is dropped, i.e. the connection went away
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let bundler = state.bundler.clone();
    let job_cancel = cancel.clone();
    let mut job = tokio::spawn(async move { bundler.bundle(&payload.urls, &job_cancel).await });

    let limit = state.config.jobs.timeout_secs;
    let outcome = match tokio::time::timeout(Duration::from_secs(limit), &mut job).await {
        Ok(joined) => joined.unwrap_or_else(|e| Err(InfrastructureError::Task(e.to_string()).into())),
        Err(_) => {
            // The job task winds down and cleans up on its own
            warn!(timeout_secs = limit, "Job timed out, cancelling");
            cancel.cancel();
            Err(JobError::from(InfrastructureError::TimedOut(limit)))
        }
    };

    let bundle = outcome?;
    respond(bundle, &state.config.archive.filename_prefix).await
}

/// Reads request body, stopping as soon as it exceeds `max_size`
///
/// Note: Decompression is handled transparently by RequestDecompressionLayer middleware,
/// so the limit applies to the decompressed bytes.
async fn read_body(body: axum::body::Body, max_size: usize) -> Result<Vec<u8>, ApiError> {
    let data = Limited::new(body, max_size)
        .collect()
        .await
        .map_err(|err| super::utils::body_read_error(err, max_size))?
        .to_bytes()
        .to_vec();

    Ok(data)
}

/// Health check endpoint (GET /health)
///
/// Components:
/// - api: Axum HTTP server
/// - retriever: whether the download tool is usable
///
/// Returns 503 Service Unavailable if any component is unhealthy.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());

    let retriever_status = if state.retriever.is_available() {
        "healthy"
    } else {
        "unavailable"
    };
    components.insert("retriever".to_string(), retriever_status.to_string());

    let all_healthy = components.values().all(|status| status == "healthy");
    let (overall_status, status_code) = if all_healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}
