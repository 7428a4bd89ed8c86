// Health check handler

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::time::{Duration, Instant};

use crate::app::AppState;

/// Upper bound on the store probe so a hung backend still yields an answer
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let started = Instant::now();

    let probe = tokio::time::timeout(PROBE_TIMEOUT, state.link_store.health()).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let (link_store_healthy, link_store_error) = match probe {
        Ok(Ok(())) => (true, None),
        Ok(Err(e)) => (false, Some(format!("Link store check failed: {}", e))),
        Err(_) => (
            false,
            Some(format!(
                "Link store did not answer within {}s",
                PROBE_TIMEOUT.as_secs()
            )),
        ),
    };

    let response = serde_json::json!({
        "status": if link_store_healthy { "healthy" } else { "degraded" },
        "service": "affiliate-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.server.environment.to_string(),
        "timestamp": timestamp,
        "components": {
            "link_store": {
                "status": if link_store_healthy { "healthy" } else { "unhealthy" },
                "backend": if state.config.cloud.sync_enabled { "cloud" } else { "memory" },
                "latency_ms": latency_ms,
                "error": link_store_error
            }
        }
    });

    if link_store_healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
