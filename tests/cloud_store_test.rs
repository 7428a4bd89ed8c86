// Cloud-backed stores against a local fake backend

use affiliate_gateway::{
    models::{ClickEvent, NewAffiliateLink, RedirectType},
    services::{
        article_store::{ArticleStore, CloudArticleStore},
        cloud_client::{CloudClient, CloudClientConfig, StoreError},
        link_store::{CloudLinkStore, LinkStore},
    },
};
use axum::{
    extract::{OriginalUri, Path, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    project_id: Option<String>,
    authorization: Option<String>,
    body: String,
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Recorded>>>);

impl Recorder {
    fn push(&self, method: Method, uri: &Uri, headers: &HeaderMap, body: String) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.0.lock().unwrap().push(Recorded {
            method,
            path: uri.path().to_string(),
            project_id: header("x-project-id"),
            authorization: header("authorization"),
            body,
        });
    }

    fn all(&self) -> Vec<Recorded> {
        self.0.lock().unwrap().clone()
    }
}

async fn link_by_slug(
    State(recorder): State<Recorder>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    recorder.push(method, &uri, &headers, String::new());

    match slug.as_str() {
        "promo-x" => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "id": "lnk_x",
                    "slug": "promo-x",
                    "destinationUrl": "shop.example.com/x",
                    "redirectType": "direct",
                    "isActive": true
                }
            })),
        )
            .into_response(),
        "retired" => (
            StatusCode::OK,
            Json(json!({
                "id": "lnk_r",
                "slug": "retired",
                "destinationUrl": "https://shop.example.com/r",
                "isActive": false
            })),
        )
            .into_response(),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "database on fire").into_response(),
        "broken-unicode" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}é and more", "a".repeat(511)),
        )
            .into_response(),
        "garbled" => (StatusCode::OK, "<html>not json</html>").into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::NOT_FOUND.into_response()
        },
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "not found" })),
        )
            .into_response(),
    }
}

async fn increment_clicks(
    State(recorder): State<Recorder>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    recorder.push(method, &uri, &headers, String::new());
    if id == "missing" {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({ "success": true, "data": { "clickCount": 8 } })).into_response()
}

async fn click_analytics(
    State(recorder): State<Recorder>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    recorder.push(method, &uri, &headers, body);
    (StatusCode::CREATED, Json(json!({ "success": true, "data": {} })))
}

async fn create_link(
    State(recorder): State<Recorder>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    recorder.push(method, &uri, &headers, body.clone());

    let request: serde_json::Value = serde_json::from_str(&body).unwrap();
    if request["slug"] == "taken" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "success": false, "error": "slug exists" })),
        )
            .into_response();
    }

    let mut record = request.clone();
    record["id"] = json!("lnk_new");
    record["clickCount"] = json!(0);
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": record })),
    )
        .into_response()
}

async fn article_by_slug(Path(slug): Path<String>) -> impl IntoResponse {
    if slug == "hydration" {
        Json(json!({
            "slug": "hydration",
            "title": "How Much Water Do You Need?",
            "body": "Drink when thirsty."
        }))
        .into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Start the fake backend under /api on an ephemeral port
async fn spawn_backend() -> (String, Recorder) {
    let recorder = Recorder::default();

    let api = Router::new()
        .route("/affiliate-links", post(create_link))
        .route("/affiliate-links/slug/{slug}", get(link_by_slug))
        .route("/affiliate-links/{id}/increment-clicks", patch(increment_clicks))
        .route("/click-analytics", post(click_analytics))
        .route("/articles/slug/{slug}", get(article_by_slug))
        .route("/health", get(|| async { "ok" }))
        .with_state(recorder.clone());
    let app = Router::new().nest("/api", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/api", addr), recorder)
}

fn client(base_url: &str, timeout: Duration) -> CloudClient {
    CloudClient::new(CloudClientConfig {
        base_url: base_url.to_string(),
        api_key: "secret-key".to_string(),
        project_id: "proj_test".to_string(),
        timeout,
    })
    .unwrap()
}

#[tokio::test]
async fn test_lookup_by_slug() {
    let (base_url, recorder) = spawn_backend().await;
    let store = CloudLinkStore::new(client(&base_url, Duration::from_secs(2)));

    let link = store.lookup_by_slug("promo-x").await.unwrap().unwrap();
    assert_eq!(link.id, "lnk_x");
    assert_eq!(link.redirect_type, RedirectType::Direct);

    // Missing and inactive links are both "not found"
    assert!(store.lookup_by_slug("nothing").await.unwrap().is_none());
    assert!(store.lookup_by_slug("retired").await.unwrap().is_none());

    let requests = recorder.all();
    assert_eq!(requests[0].path, "/api/affiliate-links/slug/promo-x");
    assert_eq!(requests[0].project_id.as_deref(), Some("proj_test"));
    // Reads are not authenticated
    assert!(requests[0].authorization.is_none());
}

#[tokio::test]
async fn test_lookup_failures_are_distinct_from_not_found() {
    let (base_url, _recorder) = spawn_backend().await;
    let store = CloudLinkStore::new(client(&base_url, Duration::from_millis(300)));

    match store.lookup_by_slug("broken").await {
        Err(StoreError::Backend { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "database on fire");
        },
        other => panic!("unexpected: {:?}", other),
    }

    let garbled = store.lookup_by_slug("garbled").await.unwrap_err();
    assert!(matches!(garbled, StoreError::Decode(_)));

    let slow = store.lookup_by_slug("slow").await.unwrap_err();
    assert!(matches!(slow, StoreError::Network(_)));
    assert!(slow.is_unavailable());
}

#[tokio::test]
async fn test_long_multibyte_error_body_is_truncated_safely() {
    let (base_url, _recorder) = spawn_backend().await;
    let store = CloudLinkStore::new(client(&base_url, Duration::from_secs(2)));

    match store.lookup_by_slug("broken-unicode").await {
        Err(StoreError::Backend { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "a".repeat(511));
        },
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_backend() {
    // Nothing listens on port 9 locally
    let store = CloudLinkStore::new(client("http://127.0.0.1:9/api", Duration::from_secs(1)));

    let err = store.lookup_by_slug("promo-x").await.unwrap_err();
    assert!(err.is_unavailable());
    assert!(store.health().await.is_err());
}

#[tokio::test]
async fn test_click_writes_are_authenticated() {
    let (base_url, recorder) = spawn_backend().await;
    let store = CloudLinkStore::new(client(&base_url, Duration::from_secs(2)));

    let event = ClickEvent::new("lnk_x", "Mozilla/5.0 (iPad)", "https://blog.example.com");
    store.record_click(&event).await.unwrap();
    store.increment_click_count("lnk_x").await.unwrap();
    assert!(matches!(
        store.increment_click_count("missing").await,
        Err(StoreError::NotFound)
    ));

    let requests = recorder.all();
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[0].path, "/api/click-analytics");
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer secret-key"));

    let posted: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(posted["linkId"], "lnk_x");
    assert_eq!(posted["deviceType"], "tablet");
    assert_eq!(posted["converted"], false);

    assert_eq!(requests[1].method, Method::PATCH);
    assert_eq!(requests[1].path, "/api/affiliate-links/lnk_x/increment-clicks");
    assert_eq!(requests[1].project_id.as_deref(), Some("proj_test"));
}

#[tokio::test]
async fn test_create_link() {
    let (base_url, _recorder) = spawn_backend().await;
    let store = CloudLinkStore::new(client(&base_url, Duration::from_secs(2)));

    let request = |slug: &str| NewAffiliateLink {
        slug: slug.to_string(),
        destination_url: "https://shop.example.com/new".to_string(),
        redirect_type: RedirectType::Landing,
        auto_redirect: true,
        is_active: true,
        title: "New".to_string(),
        description: None,
        image_url: None,
        price: None,
        tags: vec![],
        trust_badges: vec![],
    };

    let created = store.create(request("fresh")).await.unwrap();
    assert_eq!(created.id, "lnk_new");
    assert!(created.auto_redirect);

    match store.create(request("taken")).await {
        Err(StoreError::Backend { status, .. }) => assert_eq!(status, 409),
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn test_article_store() {
    let (base_url, _recorder) = spawn_backend().await;
    let store = CloudArticleStore::new(client(&base_url, Duration::from_secs(2)));

    let article = store.get_by_slug("hydration").await.unwrap().unwrap();
    assert_eq!(article.title, "How Much Water Do You Need?");
    assert!(store.get_by_slug("promo-x").await.unwrap().is_none());
}

#[tokio::test]
async fn test_health() {
    let (base_url, _recorder) = spawn_backend().await;
    let store = CloudLinkStore::new(client(&base_url, Duration::from_secs(2)));

    assert!(store.health().await.is_ok());
}
