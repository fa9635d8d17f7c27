// --- File: crates/bcbooking_erp/src/error.rs ---
use bcbooking_common::{
    config_error, external_service_error, internal_error, BookingError, HttpStatusCode,
};
use thiserror::Error;

/// Business Central specific error types.
#[derive(Error, Debug)]
pub enum ErpError {
    /// A required configuration value (tenant, client id, secret, section) is absent
    #[error("Missing Business Central configuration: {0}")]
    MissingConfig(&'static str),

    /// Transport failure talking to the issuer or the OData API
    #[error("Business Central request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The token endpoint answered with a non-success status
    #[error("Failed to fetch token (status {status}): {body}")]
    TokenEndpoint { status: u16, body: String },

    /// The token endpoint answered 2xx without an access token
    #[error("Invalid token response: no access_token in issuer payload")]
    InvalidTokenResponse,

    /// The API still refused the request after one token refresh
    #[error("Business Central rejected the refreshed token (status {status})")]
    Unauthorized { status: u16, body: String },

    /// The API answered with any other non-success status
    #[error("Failed request (status {status})")]
    Upstream { status: u16, body: String },

    /// The API answered 2xx with a body missing the expected envelope
    #[error("Invalid JSON from Business Central: {0}")]
    InvalidPayload(String),

    /// The API answered 2xx with a body that is not JSON
    #[error("Failed to parse Business Central response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Reading or writing the token cache failed
    #[error("Token cache error: {0}")]
    Cache(String),
}

/// Convert ErpError to BookingError
impl From<ErpError> for BookingError {
    fn from(err: ErpError) -> Self {
        match err {
            ErpError::MissingConfig(what) => {
                config_error(format!("Missing Business Central configuration: {}", what))
            }
            ErpError::Request(e) => BookingError::from(e),
            ErpError::TokenEndpoint { status, body } => external_service_error(
                "Token endpoint",
                format!("Failed to fetch token (status {}): {}", status, body),
            ),
            ErpError::InvalidTokenResponse => {
                BookingError::AuthError("Invalid token response".to_string())
            }
            ErpError::Unauthorized { status, body } => {
                BookingError::UpstreamResponse { status, body }
            }
            ErpError::Upstream { status, body } => BookingError::UpstreamResponse { status, body },
            ErpError::InvalidPayload(msg) => external_service_error("Business Central", msg),
            ErpError::Parse(e) => external_service_error(
                "Business Central",
                format!("response is not valid JSON: {}", e),
            ),
            ErpError::Cache(msg) => internal_error(format!("Token cache error: {}", msg)),
        }
    }
}

/// Implement HttpStatusCode for ErpError so callers can branch on the
/// status without converting first.
impl HttpStatusCode for ErpError {
    fn status_code(&self) -> u16 {
        match self {
            ErpError::MissingConfig(_) => 500,
            ErpError::Request(e) if e.is_timeout() => 504,
            ErpError::Request(_) => 502,
            ErpError::TokenEndpoint { .. } => 502,
            ErpError::InvalidTokenResponse => 401,
            ErpError::Unauthorized { status, .. } => *status,
            ErpError::Upstream { status, .. } => *status,
            ErpError::InvalidPayload(_) => 502,
            ErpError::Parse(_) => 502,
            ErpError::Cache(_) => 500,
        }
    }
}
