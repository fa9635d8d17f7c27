// --- File: crates/bcbooking_common/src/routes.rs ---

use axum::{routing::get, Router};

/// Creates a router with the routes every deployment exposes.
pub fn routes() -> Router {
    Router::new().route("/health", get(|| async { "ok" }))
}
