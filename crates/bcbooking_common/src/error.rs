use axum::extract::rejection::{FormRejection, JsonRejection, QueryRejection};
use std::fmt;
use thiserror::Error;

/// The base error type shared by all booking gateway crates.
///
/// Feature crates define their own error enums and implement
/// `From<TheirError> for BookingError`; handlers return `BookingError`
/// so every failure reaches the client as the same JSON shape.
#[derive(Error, Debug)]
pub enum BookingError {
    /// Transport-level failure of an outbound HTTP request
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Inbound data could not be parsed
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Authentication or authorization failed
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Request validation failed
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// An external service misbehaved (bad payload, token endpoint failure)
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    /// An external service answered with a non-success status; its body is echoed
    #[error("Upstream request failed with status {status}")]
    UpstreamResponse { status: u16, body: String },

    /// An outbound call timed out
    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// Anything else that went wrong on our side
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl BookingError {
    /// Short label used as the `error` field of the JSON response.
    pub fn label(&self) -> &'static str {
        match self {
            BookingError::HttpError(_) => "Upstream unreachable",
            BookingError::ParseError(_) => "Invalid request",
            BookingError::ConfigError(_) => "Configuration error",
            BookingError::AuthError(_) => "Unauthorized",
            BookingError::ValidationError(_) => "Invalid request",
            BookingError::ExternalServiceError { .. } => "Upstream error",
            BookingError::UpstreamResponse { .. } => "Failed request",
            BookingError::TimeoutError(_) => "Upstream timeout",
            BookingError::InternalError(_) => "Server error",
        }
    }
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for BookingError {
    fn status_code(&self) -> u16 {
        match self {
            BookingError::HttpError(_) => 502,
            BookingError::ParseError(_) => 400,
            BookingError::ConfigError(_) => 500,
            BookingError::AuthError(_) => 401,
            BookingError::ValidationError(_) => 400,
            BookingError::ExternalServiceError { .. } => 502,
            BookingError::UpstreamResponse { status, .. } => *status,
            BookingError::TimeoutError(_) => 504,
            BookingError::InternalError(_) => 500,
        }
    }
}

/// A trait for adding context to errors.
pub trait Context<T, E> {
    /// Adds context to an error.
    fn context<C>(self, context: C) -> Result<T, BookingError>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Adds context to an error with a lazy context provider.
    fn with_context<C, F>(self, f: F) -> Result<T, BookingError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E: std::error::Error + Send + Sync + 'static> Context<T, E> for Result<T, E> {
    fn context<C>(self, context: C) -> Result<T, BookingError>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|error| BookingError::InternalError(format!("{}: {}", context, error)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, BookingError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|error| BookingError::InternalError(format!("{}: {}", f(), error)))
    }
}

// Common error conversions
impl From<reqwest::Error> for BookingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BookingError::TimeoutError(err.to_string())
        } else {
            BookingError::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BookingError {
    fn from(err: serde_json::Error) -> Self {
        BookingError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for BookingError {
    fn from(err: std::io::Error) -> Self {
        BookingError::InternalError(err.to_string())
    }
}

// Extractor rejections, so malformed requests get the JSON error body too
impl From<JsonRejection> for BookingError {
    fn from(rejection: JsonRejection) -> Self {
        BookingError::ParseError(rejection.body_text())
    }
}

impl From<FormRejection> for BookingError {
    fn from(rejection: FormRejection) -> Self {
        BookingError::ParseError(rejection.body_text())
    }
}

impl From<QueryRejection> for BookingError {
    fn from(rejection: QueryRejection) -> Self {
        BookingError::ValidationError(rejection.body_text())
    }
}

// Utility functions for error handling
pub fn config_error<T: fmt::Display>(message: T) -> BookingError {
    BookingError::ConfigError(message.to_string())
}

pub fn validation_error<T: fmt::Display>(message: T) -> BookingError {
    BookingError::ValidationError(message.to_string())
}

pub fn external_service_error<T: fmt::Display>(service_name: &str, message: T) -> BookingError {
    BookingError::ExternalServiceError {
        service_name: service_name.to_string(),
        message: message.to_string(),
    }
}

pub fn internal_error<T: fmt::Display>(message: T) -> BookingError {
    BookingError::InternalError(message.to_string())
}
