// Library exports for the affiliate gateway
// This file exposes modules and functions for library consumers

pub mod app;
pub mod app_config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, CONFIG};
pub use services::{
    ArticleStore, ClickRecorder, CloudClient, LinkStore, PageRenderer, RedirectResolver,
    RedirectSession, StoreError,
};

use axum::{routing::get, Router};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use services::{
    article_store::{CloudArticleStore, InMemoryArticleStore},
    cloud_client::CloudClientConfig,
    link_store::{CloudLinkStore, InMemoryLinkStore},
    pages::{PageError, SiteSettings},
};

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Cloud client: {0}")]
    Cloud(#[from] StoreError),

    #[error("Page templates: {0}")]
    Pages(#[from] PageError),
}

/// Install the global tracing subscriber; JSON lines when LOG_JSON=true
pub fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.server.rust_log.clone().into());

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.server.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        eprintln!("Tracing already initialized: {}", e);
    }
}

/// Build the stores and services described by the configuration
pub fn initialize_app_state(config: &AppConfig) -> Result<AppState, InitError> {
    let pages = PageRenderer::new(SiteSettings::from_config(config))?;

    if !config.cloud.sync_enabled {
        info!("Cloud sync disabled, using in-memory stores");
        return Ok(AppState::new(
            config.clone(),
            Arc::new(InMemoryLinkStore::new()),
            Arc::new(InMemoryArticleStore::new()),
            pages,
        ));
    }

    info!("Connecting to cloud backend at {}", config.cloud.api_url);
    let client = CloudClient::new(CloudClientConfig::from_app_config(config))?;

    Ok(AppState::new(
        config.clone(),
        Arc::new(CloudLinkStore::new(client.clone())),
        Arc::new(CloudArticleStore::new(client)),
        pages,
    ))
}

/// Full application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest(
            "/api/affiliate-links",
            handlers::admin_link_routes(state.clone()),
        )
        .merge(handlers::redirect_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::dynamic_cors_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
