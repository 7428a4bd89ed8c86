use anyhow::Context;
use tracing::info;

use affiliate_gateway::{app_config, build_router, init_tracing, initialize_app_state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loads .env before reading the environment
    let config = app_config::config();
    init_tracing(config);

    info!(
        "Starting affiliate gateway ({}) on {}",
        config.server.environment, config.server.bind_address
    );

    let state = initialize_app_state(config).context("Failed to initialize services")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
