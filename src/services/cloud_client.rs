// Cloud key-value backend transport
// Shared by the affiliate link store, the article store and click analytics

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::app_config::AppConfig;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Slug already in use: {0}")]
    SlugConflict(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("Invalid cloud configuration: {0}")]
    Config(String),
}

impl StoreError {
    /// True when the backend could not give an answer at all.
    /// Lookups treat these like a miss but log them separately.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Network(_)
                | StoreError::Backend { .. }
                | StoreError::Decode(_)
                | StoreError::Timeout(_)
        )
    }
}

// =============================================================================
// RESPONSE ENVELOPE
// =============================================================================

/// The backend wraps payloads as `{"success": .., "data": .., "error": ..}`;
/// older endpoints answer with the bare payload.
#[derive(Deserialize)]
#[serde(untagged)]
enum Payload<T> {
    Envelope {
        success: bool,
        data: Option<T>,
        error: Option<String>,
    },
    Bare(T),
}

fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, StoreError> {
    let payload: Payload<T> =
        serde_json::from_str(body).map_err(|e| StoreError::Decode(e.to_string()))?;

    match payload {
        Payload::Envelope {
            success: true,
            data: Some(data),
            ..
        } => Ok(data),
        Payload::Envelope {
            success: true,
            data: None,
            ..
        } => Err(StoreError::Decode("envelope without data".to_string())),
        Payload::Envelope { error, .. } => Err(StoreError::Backend {
            status: status.as_u16(),
            message: error.unwrap_or_else(|| "request was not successful".to_string()),
        }),
        Payload::Bare(data) => Ok(data),
    }
}

/// Longest backend error body kept in a `StoreError`, in bytes
const MAX_ERROR_MESSAGE_LEN: usize = 512;

/// Cut an error body down without splitting a UTF-8 character
fn truncate_message(mut message: String) -> String {
    if message.len() > MAX_ERROR_MESSAGE_LEN {
        let cut = (0..=MAX_ERROR_MESSAGE_LEN)
            .rev()
            .find(|&i| message.is_char_boundary(i))
            .unwrap_or(0);
        message.truncate(cut);
    }
    message
}

// =============================================================================
// CLIENT
// =============================================================================

/// Connection settings for the cloud backend
#[derive(Debug, Clone)]
pub struct CloudClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub project_id: String,
    pub timeout: Duration,
}

impl CloudClientConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.cloud.api_url.clone(),
            api_key: config.cloud.api_key.clone(),
            project_id: config.cloud.project_id.clone(),
            timeout: Duration::from_millis(config.cloud.request_timeout_ms),
        }
    }
}

#[derive(Clone)]
pub struct CloudClient {
    http: Client,
    base_url: Url,
    api_key: String,
    project_id: String,
}

impl CloudClient {
    pub fn new(config: CloudClientConfig) -> Result<Self, StoreError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| StoreError::Config(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Config(format!(
                "{} cannot be used as a base URL",
                config.base_url
            )));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .user_agent(concat!("affiliate-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
            project_id: config.project_id,
        })
    }

    /// Build an endpoint URL; every segment is percent-encoded
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str], authenticated: bool) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, self.endpoint(segments))
            .header("X-Project-Id", &self.project_id);

        if authenticated && !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        builder
    }

    /// Send and read the body. 404 maps to `None`, other failures to errors.
    async fn execute(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<(StatusCode, String)>, StoreError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::Backend {
                status: status.as_u16(),
                message: truncate_message(body),
            });
        }

        Ok(Some((status, body)))
    }

    /// GET a resource, `None` when the backend answers 404
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<Option<T>, StoreError> {
        let builder = self.request(Method::GET, segments, false);
        match self.execute(builder).await? {
            Some((status, body)) => decode(status, &body).map(Some),
            None => {
                debug!("Cloud resource not found: {:?}", segments);
                Ok(None)
            },
        }
    }

    /// Authenticated write returning a payload
    #[instrument(skip(self, body))]
    pub async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, StoreError> {
        let mut builder = self.request(method, segments, true);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        match self.execute(builder).await? {
            Some((status, body)) => decode(status, &body),
            None => Err(StoreError::NotFound),
        }
    }

    /// Authenticated write whose response body is ignored
    #[instrument(skip(self, body))]
    pub async fn send_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<(), StoreError> {
        let mut builder = self.request(method, segments, true);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        match self.execute(builder).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }

    /// GET /health
    pub async fn health(&self) -> Result<(), StoreError> {
        let builder = self.request(Method::GET, &["health"], false);
        match self.execute(builder).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }
}
