// Admin API gate
// Static bearer token from ADMIN_API_TOKEN, compared in constant time

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::app::AppState;

/// Rejects admin requests without the configured bearer token
pub async fn admin_auth_middleware(
    State(app_state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = app_state.config.security.admin_api_token.as_deref() else {
        warn!("Admin API called but ADMIN_API_TOKEN is not configured");
        return unauthorized("Admin API is disabled");
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token.trim(),
        None => return unauthorized("Missing or invalid authorization header"),
    };

    if !token_matches(token, expected) {
        warn!("Rejected admin request with invalid token");
        return unauthorized("Invalid admin token");
    }

    next.run(request).await
}

fn token_matches(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "message": message
        })),
    )
        .into_response()
}
