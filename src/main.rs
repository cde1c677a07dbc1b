use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use tire_label_queue::{
    app_state::AppState,
    config::ServerConfig,
    routes,
    services::queue::{spawn_purge_task, JobStore},
    shutdown,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!(
        remote_printing = config.remote_printing,
        api_key_configured = config.api_key().is_some(),
        labels_dir = %config.labels_dir.display(),
        "Initializing label queue server"
    );

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe_queue_metrics();

    let cancel = shutdown::install_shutdown_handler();
    let queue = Arc::new(JobStore::new());

    // Terminal jobs are swept periodically; pending jobs stay until completed.
    let purge_task = config.purge_interval().map(|every| {
        spawn_purge_task(queue.clone(), every, config.purge_max_age(), cancel.clone())
    });

    let bind_addr = config.bind_addr.clone();
    let body_limit = config.max_upload_bytes;
    let state = AppState::new(config, queue);

    let app = routes::api_router(state)
        // Prometheus metrics endpoint (separate state)
        .merge(
            Router::new()
                .route("/metrics", get(routes::metrics::prometheus_metrics))
                .with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    let shutdown_signal = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_signal.cancelled().await })
        .await
        .expect("Server error");

    cancel.cancel();
    if let Some(task) = purge_task {
        let _ = task.await;
    }
    tracing::info!("Server stopped");
}
