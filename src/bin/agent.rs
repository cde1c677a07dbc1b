use std::net::SocketAddr;
use std::sync::Arc;

use tire_label_queue::{
    app_state::AgentState,
    config::AgentConfig,
    routes,
    services::{
        agent::PollAgent,
        client::QueueClient,
        printer::{LpPrinter, Printer},
        storage::LabelStorage,
    },
    shutdown,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting print agent");

    let config = AgentConfig::from_env().expect("Failed to load configuration");

    tracing::info!(
        server = %config.server_url,
        printer = %config.printer_name,
        poll_interval_secs = config.poll_interval,
        mode = ?config.print_mode,
        api_key_configured = config.print_agent_api_key.as_deref().is_some_and(|k| !k.is_empty()),
        labels_root = %config.labels_root.display(),
        "Print agent configuration"
    );

    let storage = Arc::new(
        LabelStorage::new(&config.labels_root)
            .await
            .expect("Failed to initialize labels directory"),
    );

    let lp = LpPrinter::new(
        config.printer_name.clone(),
        LpPrinter::parse_options(&config.print_options),
    );
    if lp.check_available().await {
        tracing::info!(printer = %config.printer_name, "Printer is available");
    } else {
        tracing::warn!(printer = %config.printer_name, "Printer not found or disabled");
    }
    let printer: Arc<dyn Printer> = Arc::new(lp);

    let client = QueueClient::new(
        &config.server_url,
        config.print_agent_api_key.clone(),
        config.request_timeout(),
    )
    .expect("Failed to initialize HTTP client");

    let cancel = shutdown::install_shutdown_handler();

    // Local operator interface runs alongside the polling loop.
    let local_server = if config.local_port != 0 {
        let addr = SocketAddr::from(([127, 0, 0, 1], config.local_port));
        let app = routes::local::router(AgentState::new(storage.clone(), printer.clone()))
            .layer(TraceLayer::new_for_http());
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind local interface");
        tracing::info!("Local interface listening on http://{}", addr);

        let stop = cancel.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await
            {
                tracing::error!(error = %e, "Local interface stopped with error");
            }
        }))
    } else {
        None
    };

    let agent = PollAgent::new(
        client,
        storage,
        printer,
        config.print_mode,
        config.poll_interval(),
    );
    agent.run(cancel.clone()).await;

    if let Some(server) = local_server {
        let _ = server.await;
    }
}
