// Utility modules for the affiliate gateway

pub mod service_error;
pub mod url_validator;

pub use service_error::ServiceError;
pub use url_validator::{is_valid_slug, normalize_destination, UrlValidationError};
