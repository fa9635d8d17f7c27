// --- File: crates/bcbooking_erp/src/models.rs ---
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A row from Business Central. The shape is owned by the upstream system,
/// so fields stay untyped (`Code`, `Description`, `Location`, ...).
pub type UpstreamRecord = Map<String, Value>;

/// Subtracted from the issuer-reported lifetime so a token is never used
/// in its final minute.
pub const TOKEN_SAFETY_MARGIN_MS: i64 = 60_000;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// The persisted token cache entry. Same JSON shape as the cache file:
/// `{"access_token": "...", "expires_at": 1735689600000}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    /// Epoch milliseconds; the token is expired from this instant on.
    pub expires_at: i64,
}

impl CachedToken {
    /// Builds a cache entry for a token issued at `now_ms` that the issuer
    /// says lives `lifetime_secs`.
    pub fn from_lifetime(access_token: String, lifetime_secs: i64, now_ms: i64) -> Self {
        Self {
            access_token,
            expires_at: now_ms
                .saturating_add(lifetime_secs.saturating_mul(1000))
                .saturating_sub(TOKEN_SAFETY_MARGIN_MS),
        }
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Usable means non-empty and not expired.
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }
}

/// The part of the OAuth2 token endpoint response we rely on.
#[derive(Debug, Deserialize)]
pub struct TokenEndpointResponse {
    pub access_token: Option<String>,
    /// Seconds. Some issuers send it as a string.
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Seconds>::deserialize(deserializer)? {
        Some(Seconds::Number(n)) => Some(n),
        Some(Seconds::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Body of `GET /auth/token`.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// Body of `GET /booking/setup-list`.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SetupListResponse {
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<Object>))]
    pub value: Vec<UpstreamRecord>,
}

/// Query of `GET /booking/setup`.
#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct BranchQuery {
    /// Booking setup code of the branch
    pub branch: Option<String>,
}
