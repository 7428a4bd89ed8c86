// HTTP-facing error type for the admin API and health endpoints
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{services::cloud_client::StoreError, utils::url_validator::UrlValidationError};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found")]
    NotFound,

    #[error("Slug already exists: {0}")]
    SlugAlreadyExists(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error")]
    InternalError,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ServiceError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ServiceError::NotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
            ServiceError::SlugAlreadyExists(slug) => (
                StatusCode::CONFLICT,
                format!("Slug '{}' is already in use", slug),
            ),
            ServiceError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ServiceError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ServiceError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

// Conversion from various error types
impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::SlugConflict(slug) => ServiceError::SlugAlreadyExists(slug),
            StoreError::Backend { status: 409, message } => ServiceError::SlugAlreadyExists(message),
            StoreError::Backend { status: 400, message } => ServiceError::ValidationError(message),
            StoreError::Network(_) | StoreError::Timeout(_) => {
                error!("Link store unreachable: {}", error);
                ServiceError::Unavailable("Link store is unreachable".to_string())
            },
            StoreError::Backend { .. } | StoreError::Decode(_) => {
                error!("Link store failed: {}", error);
                ServiceError::Upstream("Link store returned an error".to_string())
            },
            StoreError::Config(_) => {
                error!("Link store misconfigured: {}", error);
                ServiceError::InternalError
            },
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(error: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(error.to_string())
    }
}

impl From<UrlValidationError> for ServiceError {
    fn from(error: UrlValidationError) -> Self {
        ServiceError::ValidationError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            ServiceError::from(StoreError::NotFound),
            ServiceError::NotFound
        ));
        assert!(matches!(
            ServiceError::from(StoreError::SlugConflict("promo".into())),
            ServiceError::SlugAlreadyExists(slug) if slug == "promo"
        ));
        assert!(matches!(
            ServiceError::from(StoreError::Timeout(8000)),
            ServiceError::Unavailable(_)
        ));
        assert!(matches!(
            ServiceError::from(StoreError::Backend {
                status: 500,
                message: "boom".into()
            }),
            ServiceError::Upstream(_)
        ));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServiceError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::SlugAlreadyExists("x".into())
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Upstream("x".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
