// Public slug routes
// A visit runs one RedirectSession; the navigation it records becomes the HTTP response

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

use crate::{
    app::AppState,
    models::affiliate_link::AffiliateLink,
    services::{
        click_recorder::VisitContext,
        pages::PageError,
        redirect::{Navigation, RecordingNavigator, RedirectPlan, RedirectSession, SessionOutcome},
    },
    utils::url_validator::is_valid_slug,
};

// =============================================================================
// REDIRECT HANDLERS
// =============================================================================

/// Resolve a slug: affiliate link, then article, then not-found
/// GET /{slug}
pub async fn redirect_to_slug(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Response {
    if !is_valid_slug(&slug) {
        return not_found(&state, &slug);
    }

    let navigator = Arc::new(RecordingNavigator::new());
    let session = new_session(&state, &slug, &headers, navigator.clone());

    match session.start(&state.resolver).await {
        SessionOutcome::Redirected { destination, .. } => {
            follow(&state, &slug, navigator.last(), &destination)
        },
        SessionOutcome::NavigationFailed { link, plan } => interstitial(&state, &link, &plan),
        SessionOutcome::Landing { link, plan } => interstitial(&state, &link, &plan),
        SessionOutcome::Article(article) => {
            render_page(StatusCode::OK, state.pages.article(&article))
        },
        SessionOutcome::NotFound => not_found(&state, &slug),
        other => {
            error!("Unexpected session outcome for {}: {:?}", slug, other);
            not_found(&state, &slug)
        },
    }
}

/// Primary action of the landing page: record the click and leave the site
/// GET /{slug}/go
pub async fn go_to_destination(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Response {
    if !is_valid_slug(&slug) {
        return not_found(&state, &slug);
    }

    let navigator = Arc::new(RecordingNavigator::new());
    let session = new_session(&state, &slug, &headers, navigator.clone());

    match session.start(&state.resolver).await {
        SessionOutcome::Landing { link, plan } => {
            if session.trigger() {
                follow(&state, &slug, navigator.last(), plan.destination())
            } else {
                interstitial(&state, &link, &plan)
            }
        },
        SessionOutcome::Redirected { destination, .. } => {
            follow(&state, &slug, navigator.last(), &destination)
        },
        SessionOutcome::NavigationFailed { link, plan } => interstitial(&state, &link, &plan),
        // Slug now belongs to an article
        SessionOutcome::Article(_) => Redirect::to(&format!("/{}", slug)).into_response(),
        SessionOutcome::NotFound => not_found(&state, &slug),
        other => {
            error!("Unexpected session outcome for {}/go: {:?}", slug, other);
            not_found(&state, &slug)
        },
    }
}

/// Legacy article URLs moved to the flat slug namespace
/// GET /article/{slug}
pub async fn legacy_article_redirect(Path(slug): Path<String>) -> Redirect {
    Redirect::permanent(&format!("/{}", slug))
}

// =============================================================================
// HELPERS
// =============================================================================

fn new_session(
    state: &AppState,
    slug: &str,
    headers: &HeaderMap,
    navigator: Arc<RecordingNavigator>,
) -> RedirectSession {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let referrer = headers.get(header::REFERER).and_then(|v| v.to_str().ok());

    RedirectSession::new(
        slug,
        navigator,
        Arc::new(state.click_recorder.clone()),
        VisitContext::new(user_agent, referrer),
        state.session_settings.clone(),
    )
}

/// Turn the recorded navigation into a 302
fn follow(state: &AppState, slug: &str, navigation: Option<Navigation>, fallback: &str) -> Response {
    let url = navigation
        .map(|n| n.url)
        .unwrap_or_else(|| fallback.to_string());

    match location_header(&url) {
        Some(location) => {
            info!("Sending {} to {}", slug, url);
            (
                StatusCode::FOUND,
                [
                    (header::LOCATION, location),
                    (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
                ],
            )
                .into_response()
        },
        None => {
            warn!("Destination for {} is not a valid Location header: {}", slug, url);
            not_found(state, slug)
        },
    }
}

/// Destinations are stored as typed by editors; re-serialize through `Url`
/// when they contain characters a header cannot carry
fn location_header(url: &str) -> Option<HeaderValue> {
    if url.bytes().all(|b| b.is_ascii_graphic()) {
        return HeaderValue::from_str(url).ok();
    }
    let parsed = Url::parse(url).ok()?;
    HeaderValue::from_str(parsed.as_str()).ok()
}

fn interstitial(state: &AppState, link: &AffiliateLink, plan: &RedirectPlan) -> Response {
    let mut response = render_page(StatusCode::OK, state.pages.interstitial(link, plan));
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn not_found(state: &AppState, slug: &str) -> Response {
    render_page(StatusCode::NOT_FOUND, state.pages.not_found(slug))
}

fn render_page(status: StatusCode, page: Result<String, PageError>) -> Response {
    match page {
        Ok(html) => (
            status,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            html,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to render page: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred processing your request",
            )
                .into_response()
        },
    }
}
