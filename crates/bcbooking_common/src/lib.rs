// --- File: crates/bcbooking_common/src/lib.rs ---

// Declare modules within this crate
pub mod error;    // Error handling
pub mod features; // Feature flag handling
pub mod http;     // HTTP utilities
pub mod logging;  // Logging utilities
pub mod routes;   // Route definitions

// Re-export the routes function to be used by the main backend service
pub use routes::routes;

// Re-export error types and utilities for easier access
pub use error::{
    BookingError,
    HttpStatusCode,
    Context,
    config_error,
    validation_error,
    external_service_error,
    internal_error,
};

// Re-export HTTP utilities for easier access
pub use http::{
    IntoHttpResponse,
    handle_json_result,
    client::{HTTP_CLIENT, create_client},
};

// Re-export logging utilities for easier access
pub use logging::{init, init_with_level, init_from_config, log_error, log_result, LogGuard};

// Re-export feature flag handling utilities for easier access
pub use features::is_feature_enabled;

#[cfg(feature = "erp")]
pub use features::is_erp_enabled;
