// Affiliate link admin API
// Thin layer over the link store; every route sits behind admin_auth_middleware

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::{
    app::AppState,
    models::affiliate_link::{AffiliateLinkUpdate, NewAffiliateLink},
    utils::{service_error::ServiceError, url_validator::normalize_destination},
};

// =============================================================================
// LINK HANDLERS
// =============================================================================

/// List all affiliate links
/// GET /api/affiliate-links
pub async fn list_links(State(state): State<AppState>) -> impl IntoResponse {
    match state.link_store.list_all().await {
        Ok(links) => Json(json!({
            "success": true,
            "data": links,
            "total": links.len()
        }))
        .into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}

/// Create an affiliate link
/// POST /api/affiliate-links
pub async fn create_link(
    State(state): State<AppState>,
    Json(mut request): Json<NewAffiliateLink>,
) -> impl IntoResponse {
    request.sanitize();

    if let Err(e) = request.validate() {
        return ServiceError::from(e).into_response();
    }
    // Reject destinations the redirect flow would refuse to follow
    if let Err(e) = normalize_destination(&request.destination_url) {
        return ServiceError::from(e).into_response();
    }

    match state.link_store.create(request).await {
        Ok(link) => {
            info!("Admin created affiliate link {}", link.slug);
            (
                StatusCode::CREATED,
                Json(json!({ "success": true, "data": link })),
            )
                .into_response()
        },
        Err(e) => ServiceError::from(e).into_response(),
    }
}

/// Update an affiliate link
/// PUT /api/affiliate-links/{id}
pub async fn update_link(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
    Json(mut request): Json<AffiliateLinkUpdate>,
) -> impl IntoResponse {
    request.slug = request.slug.map(|s| s.trim().to_string());
    request.destination_url = request.destination_url.map(|u| u.trim().to_string());

    if let Err(e) = request.validate() {
        return ServiceError::from(e).into_response();
    }
    if let Some(destination) = request.destination_url.as_deref() {
        if let Err(e) = normalize_destination(destination) {
            return ServiceError::from(e).into_response();
        }
    }

    match state.link_store.update(&link_id, request).await {
        Ok(link) => Json(json!({ "success": true, "data": link })).into_response(),
        Err(e) => ServiceError::from(e).into_response(),
    }
}

/// Delete an affiliate link
/// DELETE /api/affiliate-links/{id}
pub async fn delete_link(
    State(state): State<AppState>,
    Path(link_id): Path<String>,
) -> impl IntoResponse {
    match state.link_store.delete(&link_id).await {
        Ok(()) => {
            info!("Admin deleted affiliate link {}", link_id);
            StatusCode::NO_CONTENT.into_response()
        },
        Err(e) => ServiceError::from(e).into_response(),
    }
}
