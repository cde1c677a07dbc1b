pub mod error;
pub mod health;
pub mod labels;
pub mod local;
pub mod metrics;
pub mod print_jobs;

use axum::routing::{get, post};
use axum::Router;

use crate::app_state::AppState;

/// Queue server API routes.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/labels", post(labels::upload_label))
        .route("/api/print-jobs", get(print_jobs::list_pending))
        .route("/api/print-jobs/all", get(print_jobs::list_all))
        .route("/api/print-jobs/status", get(print_jobs::queue_status))
        .route("/api/print-jobs/{job_id}", get(print_jobs::get_job))
        .route(
            "/api/print-jobs/{job_id}/complete",
            post(print_jobs::complete_job),
        )
        .with_state(state)
}
