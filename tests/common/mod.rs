// Common test utilities
// Shared across all test files to avoid duplication

#![allow(dead_code)]

use affiliate_gateway::{
    app::AppState,
    app_config::AppConfig,
    build_router,
    models::{AffiliateLink, Article, ClickEvent},
    services::{
        article_store::InMemoryArticleStore,
        link_store::InMemoryLinkStore,
        pages::{PageRenderer, SiteSettings},
    },
};
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, Response, StatusCode},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

pub const ADMIN_TOKEN: &str = "test-admin-token-0123456789";

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub links: Arc<InMemoryLinkStore>,
    pub articles: Arc<InMemoryArticleStore>,
}

impl TestApp {
    pub fn get(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "GET", uri)
    }

    pub fn post(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "POST", uri)
    }

    pub fn put(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "PUT", uri)
    }

    pub fn delete(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "DELETE", uri)
    }

    /// Wait for background click writes to land in the store
    pub async fn wait_for_clicks(&self, expected: usize) -> Vec<ClickEvent> {
        for _ in 0..200 {
            let clicks = self.links.clicks().await;
            if clicks.len() >= expected {
                return clicks;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        self.links.clicks().await
    }

    /// Give stray background tasks a chance to run
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Test request builder
pub struct TestRequest<'a> {
    app: &'a TestApp,
    builder: axum::http::request::Builder,
    body: Body,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: &str, uri: &str) -> Self {
        Self {
            app,
            builder: Request::builder().method(method).uri(uri),
            body: Body::empty(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        let value = format!("Bearer {}", token);
        self.header("authorization", &value)
    }

    pub fn admin(self) -> Self {
        self.bearer(ADMIN_TOKEN)
    }

    /// Add JSON body to request
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        self.builder = self.builder.header("content-type", "application/json");
        self.body = Body::from(serde_json::to_vec(body).unwrap());
        self
    }

    pub async fn send(self) -> TestResponse {
        let request = self.builder.body(self.body).unwrap();
        let response = self.app.app.clone().oneshot(request).await.unwrap();
        TestResponse { response }
    }
}

/// Test response wrapper
pub struct TestResponse {
    response: Response<Body>,
}

impl TestResponse {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    pub fn location(&self) -> Option<String> {
        self.header(header::LOCATION.as_str())
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Parse JSON response
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> T {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    /// Get response body as text
    pub async fn text(self) -> String {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }
}

pub fn affiliate_link(value: serde_json::Value) -> AffiliateLink {
    serde_json::from_value(value).unwrap()
}

pub fn article(slug: &str, title: &str) -> Article {
    Article {
        slug: slug.to_string(),
        title: title.to_string(),
        summary: Some("Everything you need to know".to_string()),
        body: "Drink when thirsty.\n\nEat your vegetables.".to_string(),
        published_at: None,
    }
}

/// Links and articles used across the HTTP tests
pub fn seed_links() -> Vec<AffiliateLink> {
    vec![
        affiliate_link(serde_json::json!({
            "id": "lnk_x",
            "slug": "promo-x",
            "redirectType": "direct",
            "destinationUrl": "shop.example.com/x",
            "isActive": true
        })),
        affiliate_link(serde_json::json!({
            "id": "lnk_y",
            "slug": "promo-y",
            "redirectType": "landing",
            "autoRedirect": true,
            "destinationUrl": "https://shop.example.com/y",
            "title": "Insulated Bottle",
            "price": "$24.99"
        })),
        affiliate_link(serde_json::json!({
            "id": "lnk_m",
            "slug": "promo-m",
            "redirectType": "landing",
            "autoRedirect": false,
            "destinationUrl": "https://shop.example.com/m",
            "title": "Yoga Mat"
        })),
        affiliate_link(serde_json::json!({
            "id": "lnk_z",
            "slug": "promo-z",
            "redirectType": "direct",
            "destinationUrl": ""
        })),
        affiliate_link(serde_json::json!({
            "id": "lnk_old",
            "slug": "old-promo",
            "redirectType": "direct",
            "destinationUrl": "https://shop.example.com/old",
            "isActive": false
        })),
    ]
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.site.name = "Healthy Habits".to_string();
    config.site.url = "https://healthy.example.com".to_string();
    config.security.admin_api_token = Some(ADMIN_TOKEN.to_string());
    config
}

/// Setup test application on in-memory stores
pub fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config())
}

pub fn setup_test_app_with(config: AppConfig) -> TestApp {
    let links = Arc::new(InMemoryLinkStore::with_links(seed_links()));
    let articles = Arc::new(InMemoryArticleStore::with_articles([
        article("hydration", "How Much Water Do You Need?"),
        article("old-promo", "Our Favourite Gear"),
    ]));

    let pages = PageRenderer::new(SiteSettings::from_config(&config)).unwrap();
    let state = AppState::new(config, links.clone(), articles.clone(), pages);

    TestApp {
        app: build_router(state),
        links,
        articles,
    }
}
