//! Operator interface served by the print agent on localhost.
//!
//! Failures come back as JSON `{success: false, message}` so the page can
//! show them as notifications; the affected label is left where it was.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::app_state::AgentState;
use crate::models::label::LabelRecord;
use crate::routes::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ArchivedQuery {
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LabelListResponse {
    pub labels: Vec<LabelRecord>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

pub fn router(state: AgentState) -> Router {
    Router::new()
        .route("/labels", get(list_labels))
        .route("/labels/file/{*path}", get(view_label))
        .route("/labels/print/{*path}", post(print_label))
        .route("/labels/archive/{*path}", post(archive_label))
        .route("/labels/restore/{*path}", post(restore_label))
        .with_state(state)
}

/// GET /labels?archived=bool
async fn list_labels(
    State(state): State<AgentState>,
    Query(query): Query<ArchivedQuery>,
) -> Result<Json<LabelListResponse>, ApiError> {
    let labels = state.storage.list(query.archived).await?;
    Ok(Json(LabelListResponse {
        count: labels.len(),
        labels,
    }))
}

/// GET /labels/file/{path}?archived=bool
async fn view_label(
    State(state): State<AgentState>,
    Path(path): Path<String>,
    Query(query): Query<ArchivedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.storage.read(&path, query.archived).await?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], bytes))
}

/// POST /labels/print/{path}?archived=bool
async fn print_label(
    State(state): State<AgentState>,
    Path(path): Path<String>,
    Query(query): Query<ArchivedQuery>,
) -> Result<Json<ActionResponse>, ApiError> {
    let file = state.storage.locate(&path, query.archived).await?;
    state.printer.print(&file).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: format!("Printed {path} on {}", state.printer.name()),
    }))
}

/// POST /labels/archive/{path}
async fn archive_label(
    State(state): State<AgentState>,
    Path(path): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    state.storage.archive(&path).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: format!("Archived {path}"),
    }))
}

/// POST /labels/restore/{path}
async fn restore_label(
    State(state): State<AgentState>,
    Path(path): Path<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    state.storage.restore(&path).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: format!("Restored {path}"),
    }))
}
