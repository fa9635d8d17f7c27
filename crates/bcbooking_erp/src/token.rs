// File: crates/bcbooking_erp/src/token.rs
//! OAuth2 client-credentials token acquisition and caching.
//!
//! [`TokenProvider`] hands out a bearer token for the Business Central API.
//! A valid cached token is returned without touching the network; otherwise
//! one request to the issuer is made while holding `refresh_lock`, so
//! concurrent callers in this process share a single refresh.

use async_trait::async_trait;
use bcbooking_config::{AppConfig, ErpConfig, TokenCacheConfig, TokenCacheMode};
use reqwest::Client;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::ErpError;
use crate::models::{now_millis, CachedToken, TokenEndpointResponse};

/// Where the current token lives between requests.
///
/// Read failures are not errors: an unreadable or corrupt cache is a miss.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns the stored token, expired or not.
    async fn load(&self) -> Option<CachedToken>;

    /// Replaces the stored token.
    async fn save(&self, token: &CachedToken) -> Result<(), ErpError>;

    /// Human readable location, for logs.
    fn describe(&self) -> String;
}

/// JSON file cache. Writes go to a uniquely named sibling that is renamed
/// over the target, so readers never see a half-written file.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "token_cache.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()))
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Option<CachedToken> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Cannot read token cache {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice::<CachedToken>(&bytes) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("Ignoring corrupt token cache {}: {}", self.path.display(), e);
                None
            }
        }
    }

    async fn save(&self, token: &CachedToken) -> Result<(), ErpError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ErpError::Cache(format!("create {}: {}", parent.display(), e)))?;
        }

        let json = serde_json::to_vec_pretty(token)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, &json)
            .await
            .map_err(|e| ErpError::Cache(format!("write {}: {}", temp.display(), e)))?;

        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(ErpError::Cache(format!(
                "rename onto {}: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// In-process cache for ephemeral deployments without a writable disk.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<CachedToken>>,
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Option<CachedToken> {
        self.slot.read().await.clone()
    }

    async fn save(&self, token: &CachedToken) -> Result<(), ErpError> {
        *self.slot.write().await = Some(token.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "process memory".to_string()
    }
}

/// Picks the store for the configured (or detected) cache mode.
pub fn build_store(config: &TokenCacheConfig) -> Arc<dyn TokenStore> {
    match config.resolved_mode() {
        TokenCacheMode::File => Arc::new(FileTokenStore::new(config.path_or_default())),
        TokenCacheMode::Memory => Arc::new(MemoryTokenStore::default()),
    }
}

/// The credentials needed for one client-credentials exchange.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
}

impl ClientCredentials {
    pub fn from_config(config: &ErpConfig) -> Result<Self, ErpError> {
        Ok(Self {
            tenant_id: required(config.tenant_id.as_deref(), "tenant_id")?,
            client_id: required(config.client_id.as_deref(), "client_id")?,
            client_secret: required(config.client_secret.as_deref(), "client_secret")?,
            scope: config.scope_or_default().to_string(),
        })
    }
}

fn required(value: Option<&str>, name: &'static str) -> Result<String, ErpError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ErpError::MissingConfig(name))
}

pub struct TokenProvider {
    client: Client,
    config: ErpConfig,
    store: Arc<dyn TokenStore>,
    fallback_lifetime_secs: u64,
    refresh_lock: Mutex<()>,
}

impl TokenProvider {
    pub fn new(
        client: Client,
        config: ErpConfig,
        store: Arc<dyn TokenStore>,
        fallback_lifetime_secs: u64,
    ) -> Self {
        Self {
            client,
            config,
            store,
            fallback_lifetime_secs,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Builds the provider from the `[erp]` and `[token_cache]` sections.
    pub fn from_config(client: Client, app: &AppConfig) -> Result<Self, ErpError> {
        let erp = app.erp.clone().ok_or(ErpError::MissingConfig("erp section"))?;
        let store = build_store(&app.token_cache);
        info!("Business Central tokens cached in {}", store.describe());
        Ok(Self::new(
            client,
            erp,
            store,
            app.token_cache.fallback_lifetime_secs(),
        ))
    }

    /// `{authority}/{tenant}/oauth2/v2.0/token`
    pub fn token_url(&self, tenant_id: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.authority_url_or_default(),
            tenant_id
        )
    }

    /// Returns a valid access token, fetching a new one only on a cache miss.
    pub async fn get_token(&self) -> Result<String, ErpError> {
        let credentials = ClientCredentials::from_config(&self.config)?;

        if let Some(token) = self.usable_cached().await {
            debug!("Token cache hit ({})", self.store.describe());
            return Ok(token.access_token);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(token) = self.usable_cached().await {
            debug!("Token refreshed by a concurrent request");
            return Ok(token.access_token);
        }
        self.fetch_and_store(&credentials).await
    }

    /// Replaces a token the API rejected.
    ///
    /// Skips the cache unless it already holds a different, still valid token
    /// (written by a concurrent refresh), in which case that one is returned.
    pub async fn refresh_token(&self, rejected: &str) -> Result<String, ErpError> {
        let credentials = ClientCredentials::from_config(&self.config)?;

        let _guard = self.refresh_lock.lock().await;
        if let Some(token) = self.usable_cached().await {
            if token.access_token != rejected {
                debug!("Rejected token already replaced by a concurrent request");
                return Ok(token.access_token);
            }
        }
        self.fetch_and_store(&credentials).await
    }

    async fn usable_cached(&self) -> Option<CachedToken> {
        self.store.load().await.filter(CachedToken::is_usable)
    }

    async fn fetch_and_store(&self, credentials: &ClientCredentials) -> Result<String, ErpError> {
        let url = self.token_url(&credentials.tenant_id);
        info!("Requesting new Business Central access token");

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("scope", credentials.scope.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Token endpoint returned {}: {}", status, body);
            return Err(ErpError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let payload: TokenEndpointResponse = serde_json::from_slice(&bytes)?;
        let access_token = payload
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(ErpError::InvalidTokenResponse)?;

        let lifetime = payload
            .expires_in
            .unwrap_or(self.fallback_lifetime_secs as i64);
        debug!(
            "Issued {} token valid for {}s",
            payload.token_type.as_deref().unwrap_or("bearer"),
            lifetime
        );
        let cached = CachedToken::from_lifetime(access_token, lifetime, now_millis());

        // Best effort: a failed write only costs another exchange later.
        if let Err(e) = self.store.save(&cached).await {
            warn!("Could not persist token to {}: {}", self.store.describe(), e);
        }
        Ok(cached.access_token)
    }
}
