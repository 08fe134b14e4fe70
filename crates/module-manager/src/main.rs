use axum::extract::Request;
use axum::ServiceExt;
use module_manager::{ManagerConfig, ManagerSystem};
use tracing::{error, info};
use worker_framework::tracing::setup_tracing;

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = ManagerConfig::load().map_err(|e| e.to_string())?;
    setup_tracing(&config.logger.level);

    let system = ManagerSystem::new(&config).map_err(|e| {
        error!(error = %e, "Failed to build manager system");
        e.to_string()
    })?;

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr)
        .await
        .map_err(|e| format!("binding {}: {e}", config.server.listen_addr))?;
    info!(addr = %config.server.listen_addr, "Listening");

    let app = ServiceExt::<Request>::into_make_service(system.router());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| e.to_string())?;

    system.shutdown().await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Ctrl-C received");
}
