// --- File: crates/bcbooking_common/src/http.rs ---
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::{BookingError, HttpStatusCode};

// Include the client module
pub mod client;

/// Extension trait for BookingError to convert it to an Axum HTTP response.
pub trait IntoHttpResponse {
    /// Converts the error into an Axum HTTP response.
    fn into_http_response(self) -> Response;
}

impl IntoHttpResponse for BookingError {
    fn into_http_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);

        let body = match &self {
            // Upstream failures echo the upstream status and body for diagnostics
            BookingError::UpstreamResponse { status, body } => json!({
                "error": self.label(),
                "message": self.to_string(),
                "status": status,
                "response": body,
            }),
            _ => json!({
                "error": self.label(),
                "message": self.to_string(),
            }),
        };

        (status_code, Json(body)).into_response()
    }
}

/// Implement IntoResponse for BookingError so handlers can return it directly.
impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        self.into_http_response()
    }
}

/// Converts a `Result<T, E>` into a JSON handler result, mapping the error
/// through `BookingError`.
pub fn handle_json_result<T, E>(result: Result<T, E>) -> Result<Json<T>, BookingError>
where
    T: serde::Serialize,
    E: Into<BookingError>,
{
    result.map(Json).map_err(Into::into)
}
