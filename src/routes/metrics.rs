use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Register descriptions for the queue metrics recorded by the job store.
pub fn describe_queue_metrics() {
    metrics::describe_counter!("print_jobs_created_total", "Print jobs queued");
    metrics::describe_counter!(
        "print_jobs_completed_total",
        "Print jobs reported handled by an agent"
    );
    metrics::describe_counter!(
        "print_jobs_failed_total",
        "Print jobs reported failed by an agent"
    );
    metrics::describe_counter!(
        "print_jobs_purged_total",
        "Terminal print jobs removed by purge"
    );
    metrics::describe_gauge!("print_jobs_pending", "Print jobs waiting for an agent");
}

/// GET /metrics: Prometheus text exposition.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}
