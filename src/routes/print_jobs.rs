use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::job::PrintJob;
use crate::models::print_job::{
    CompleteJobRequest, CompleteJobResponse, HistoryQuery, JobListResponse, PendingQuery,
    QueueStatusResponse,
};
use crate::routes::error::ApiError;
use crate::services::client::API_KEY_HEADER;

/// Check the shared agent key. With no key configured every caller passes.
pub fn authorize(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if provided == Some(expected) {
        Ok(())
    } else {
        tracing::warn!("Rejected print job request with invalid API key");
        Err(ApiError::Unauthorized)
    }
}

// Body and query rejections surface only after `authorize` has passed.

/// GET /api/print-jobs: pending jobs, with payload unless `include_payload=false`.
pub async fn list_pending(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PendingQuery>, QueryRejection>,
) -> Result<Json<JobListResponse>, ApiError> {
    authorize(&headers, state.config.api_key())?;
    let Query(query) = query?;
    let jobs = state.queue.list_pending(query.include_payload).await;
    Ok(Json(jobs.into()))
}

/// GET /api/print-jobs/all: job history without payloads, newest first.
pub async fn list_all(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<JobListResponse>, ApiError> {
    authorize(&headers, state.config.api_key())?;
    let Query(query) = query?;
    let jobs = state.queue.list_all(query.limit).await;
    Ok(Json(jobs.into()))
}

/// GET /api/print-jobs/{id}: a single job without payload.
pub async fn get_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Result<Json<PrintJob>, ApiError> {
    authorize(&headers, state.config.api_key())?;
    Ok(Json(state.queue.get(&job_id, false).await?))
}

/// POST /api/print-jobs/{id}/complete: agent reports the outcome of a job.
pub async fn complete_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
    body: Result<Json<CompleteJobRequest>, JsonRejection>,
) -> Result<Json<CompleteJobResponse>, ApiError> {
    authorize(&headers, state.config.api_key())?;
    let Json(req) = body?;
    req.validate()?;

    tracing::debug!(
        job_id = %job_id,
        success = req.success,
        printer = ?req.printer,
        "Completion reported"
    );

    let status = state.queue.complete(&job_id, req.into()).await?;

    Ok(Json(CompleteJobResponse {
        success: true,
        job_id,
        status,
    }))
}

/// GET /api/print-jobs/status: open endpoint for dashboards and agents.
pub async fn queue_status(State(state): State<AppState>) -> Json<QueueStatusResponse> {
    Json(QueueStatusResponse {
        pending_count: state.queue.pending_count().await,
        remote_printing_enabled: state.remote_printing(),
    })
}
