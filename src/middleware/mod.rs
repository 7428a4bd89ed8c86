// Middleware modules for the affiliate gateway

pub mod auth;
pub mod cors;

pub use auth::admin_auth_middleware;
pub use cors::dynamic_cors_middleware;
