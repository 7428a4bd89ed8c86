// HTTP handlers
// Public slug routes, the admin link API and health

pub mod health;
pub mod links;
pub mod redirect;

use crate::{app::AppState, middleware::admin_auth_middleware};
use axum::{
    middleware,
    routing::{get, put},
    Router,
};

// Public slug routes
pub fn redirect_routes() -> Router<AppState> {
    Router::new()
        .route("/article/{slug}", get(redirect::legacy_article_redirect))
        .route("/{slug}", get(redirect::redirect_to_slug))
        .route("/{slug}/go", get(redirect::go_to_destination))
}

// Admin routes, nested under /api/affiliate-links
pub fn admin_link_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(links::list_links).post(links::create_link))
        .route("/{id}", put(links::update_link).delete(links::delete_link))
        .route_layer(middleware::from_fn_with_state(
            state,
            admin_auth_middleware,
        ))
}
