// Centralized configuration management for the affiliate gateway
// Load ALL env vars ONCE at startup

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Global application configuration loaded once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    dotenv::dotenv().ok();

    AppConfig::from_env().expect("Failed to load configuration")
});

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 8000;
const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 8000;
const DEFAULT_COUNTDOWN_SECONDS: u32 = 5;
const DEFAULT_POPUP_FALLBACK_DELAY_MS: u64 = 100;
const DEFAULT_SITE_NAME: &str = "Affiliate Gateway";
const MIN_ADMIN_TOKEN_LENGTH: usize = 16;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cloud: CloudConfig,
    pub redirect: RedirectConfig,
    pub site: SiteConfig,
    pub security: SecurityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub environment: Environment,
    pub rust_log: String,
    pub log_json: bool,
}

/// Environment type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Environment {
    Development,
    Test,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Environment::Development,
            "test" => Environment::Test,
            "staging" | "stage" => Environment::Staging,
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Cloud key-value backend holding affiliate links, articles and click analytics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub project_id: String,
    /// When false the service runs on in-memory stores
    pub sync_enabled: bool,
    pub request_timeout_ms: u64,
}

/// Redirect flow timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectConfig {
    pub lookup_timeout_ms: u64,
    pub countdown_seconds: u32,
    pub popup_fallback_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    /// Target of the "return to site" links
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Bearer token for the admin API; the API refuses every request when unset
    #[serde(skip_serializing)]
    pub admin_api_token: Option<String>,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    /// Local development settings: in-memory stores, no admin token
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: DEFAULT_BIND_ADDRESS.to_string(),
                environment: Environment::Development,
                rust_log: "info".to_string(),
                log_json: false,
            },
            cloud: CloudConfig {
                api_url: String::new(),
                api_key: String::new(),
                project_id: String::new(),
                sync_enabled: false,
                request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            },
            redirect: RedirectConfig {
                lookup_timeout_ms: DEFAULT_LOOKUP_TIMEOUT_MS,
                countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
                popup_fallback_delay_ms: DEFAULT_POPUP_FALLBACK_DELAY_MS,
            },
            site: SiteConfig {
                name: DEFAULT_SITE_NAME.to_string(),
                url: "/".to_string(),
            },
            security: SecurityConfig {
                admin_api_token: None,
                cors_allowed_origins: vec!["*".to_string()],
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Helper function to get optional var with default
        let get_or_default =
            |key: &str, default: &str| -> String { lookup(key).unwrap_or_else(|| default.to_string()) };

        // Optional var, empty counts as unset
        let get_optional = |key: &str| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let parse_or_default = |key: &str, default: u32| -> Result<u32, ConfigError> {
            match get_optional(key) {
                Some(value) => value.parse().map_err(|_| {
                    ConfigError::InvalidValue(key.to_string(), "not a valid u32".to_string())
                }),
                None => Ok(default),
            }
        };

        let parse_u64_or_default = |key: &str, default: u64| -> Result<u64, ConfigError> {
            match get_optional(key) {
                Some(value) => value.parse().map_err(|_| {
                    ConfigError::InvalidValue(key.to_string(), "not a valid u64".to_string())
                }),
                None => Ok(default),
            }
        };

        let parse_bool_or_default = |key: &str, default: &str| -> bool {
            get_or_default(key, default).to_lowercase() == "true"
        };

        let bind_address = get_or_default("BIND_ADDRESS", DEFAULT_BIND_ADDRESS);

        let environment = Environment::from(get_or_default("ENVIRONMENT", "development"));

        let server = ServerConfig {
            bind_address,
            environment: environment.clone(),
            rust_log: get_or_default("RUST_LOG", "info"),
            log_json: parse_bool_or_default("LOG_JSON", "false"),
        };

        // Cloud backend
        let sync_enabled = parse_bool_or_default("CLOUD_SYNC_ENABLED", "true");
        let api_url = get_optional("CLOUD_API_URL").unwrap_or_default();
        if sync_enabled && api_url.is_empty() {
            return Err(ConfigError::MissingVar("CLOUD_API_URL".to_string()));
        }

        let request_timeout_ms =
            parse_u64_or_default("CLOUD_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?;
        if request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "CLOUD_REQUEST_TIMEOUT_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let cloud = CloudConfig {
            api_url,
            api_key: get_optional("CLOUD_API_KEY").unwrap_or_default(),
            project_id: get_optional("CLOUD_PROJECT_ID").unwrap_or_default(),
            sync_enabled,
            request_timeout_ms,
        };

        // Redirect timing
        let lookup_timeout_ms =
            parse_u64_or_default("LOOKUP_TIMEOUT_MS", DEFAULT_LOOKUP_TIMEOUT_MS)?;
        if lookup_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "LOOKUP_TIMEOUT_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let countdown_seconds =
            parse_or_default("REDIRECT_COUNTDOWN_SECONDS", DEFAULT_COUNTDOWN_SECONDS)?;
        if countdown_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "REDIRECT_COUNTDOWN_SECONDS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let redirect = RedirectConfig {
            lookup_timeout_ms,
            countdown_seconds,
            popup_fallback_delay_ms: parse_u64_or_default(
                "POPUP_FALLBACK_DELAY_MS",
                DEFAULT_POPUP_FALLBACK_DELAY_MS,
            )?,
        };

        let site = SiteConfig {
            name: get_or_default("SITE_NAME", DEFAULT_SITE_NAME),
            url: get_or_default("SITE_URL", "/"),
        };

        // Admin token validation
        let admin_api_token = get_optional("ADMIN_API_TOKEN");
        match &admin_api_token {
            Some(token) if token.len() < MIN_ADMIN_TOKEN_LENGTH => {
                return Err(ConfigError::InvalidValue(
                    "ADMIN_API_TOKEN".to_string(),
                    format!(
                        "Token must be at least {} characters long",
                        MIN_ADMIN_TOKEN_LENGTH
                    ),
                ));
            },
            None if environment == Environment::Production && sync_enabled => {
                return Err(ConfigError::MissingVar("ADMIN_API_TOKEN".to_string()));
            },
            _ => {},
        }

        let cors_allowed_origins: Vec<String> = get_or_default("CORS_ALLOWED_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let security = SecurityConfig {
            admin_api_token,
            cors_allowed_origins,
        };

        Ok(Self {
            server,
            cloud,
            redirect,
            site,
            security,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.server.environment == Environment::Production
    }
}

/// Get the global configuration instance
/// This is the primary way to access configuration throughout the app
pub fn config() -> &'static AppConfig {
    &CONFIG
}
