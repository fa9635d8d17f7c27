// --- File: crates/bcbooking_config/src/models.rs ---

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::env_vars::is_ephemeral_deployment;

pub const DEFAULT_SCOPE: &str = "https://api.businesscentral.dynamics.com/.default";
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
pub const DEFAULT_API_BASE_URL: &str = "https://api.businesscentral.dynamics.com/v2.0";
pub const DEFAULT_TOKEN_CACHE_PATH: &str = "cache/token_cache.json";
pub const DEFAULT_FALLBACK_LIFETIME_SECS: u64 = 3600;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with the pre-built front-end, served as fallback when set.
    #[serde(default)]
    pub static_dir: Option<String>,
}

// --- Logging Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingConfig {
    pub level: Option<String>,     // trace | debug | info | warn | error
    pub directory: Option<String>, // daily rolling file sink when set
}

// --- Business Central Config ---
// Credentials are usually "secret_from_env" markers in the config files.
// Legacy TENANT_ID / CLIENT_ID / CLIENT_SECRET / SCOPE fill whatever stays unset.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ErpConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scope: Option<String>,
    pub authority_url: Option<String>,
    pub api_base_url: Option<String>,
    pub environment: String, // Mandatory, e.g. "SandboxDev2"
    pub company: String,     // Mandatory
    pub request_timeout_secs: Option<u64>,
    /// Mounts GET /auth/token, which hands the bearer token to any caller.
    #[serde(default)]
    pub expose_token_route: bool,
}

impl ErpConfig {
    pub fn scope_or_default(&self) -> &str {
        non_empty(self.scope.as_deref()).unwrap_or(DEFAULT_SCOPE)
    }

    pub fn authority_url_or_default(&self) -> &str {
        non_empty(self.authority_url.as_deref())
            .unwrap_or(DEFAULT_AUTHORITY_URL)
            .trim_end_matches('/')
    }

    pub fn api_base_url_or_default(&self) -> &str {
        non_empty(self.api_base_url.as_deref())
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// --- Token Cache Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenCacheMode {
    File,
    Memory,
}

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TokenCacheConfig {
    pub mode: Option<TokenCacheMode>,
    pub path: Option<String>,
    /// Lifetime assumed when the issuer omits `expires_in`.
    pub fallback_lifetime_secs: Option<u64>,
}

impl TokenCacheConfig {
    /// Explicit mode wins; otherwise serverless deployments get the in-process cache.
    pub fn resolved_mode(&self) -> TokenCacheMode {
        match self.mode {
            Some(mode) => mode,
            None if is_ephemeral_deployment() => TokenCacheMode::Memory,
            None => TokenCacheMode::File,
        }
    }

    pub fn path_or_default(&self) -> PathBuf {
        PathBuf::from(
            non_empty(self.path.as_deref()).unwrap_or(DEFAULT_TOKEN_CACHE_PATH),
        )
    }

    pub fn fallback_lifetime_secs(&self) -> u64 {
        self.fallback_lifetime_secs
            .unwrap_or(DEFAULT_FALLBACK_LIFETIME_SECS)
    }
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    // Server config is mandatory
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_erp: bool,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub erp: Option<ErpConfig>,
    #[serde(default)]
    pub token_cache: TokenCacheConfig,
}
