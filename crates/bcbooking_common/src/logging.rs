//! Logging utilities for the booking gateway.
//!
//! Every binary and test harness goes through [`init_with_level`] or
//! [`init_from_config`] so all crates share one subscriber setup.

use bcbooking_config::LoggingConfig;
use std::str::FromStr;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Keeps the non-blocking file writer alive; drop it last.
pub type LogGuard = tracing_appender::non_blocking::WorkerGuard;

/// Targets that get the configured level regardless of `RUST_LOG`.
const CRATE_TARGETS: [&str; 4] = [
    "bcbooking_backend",
    "bcbooking_common",
    "bcbooking_config",
    "bcbooking_erp",
];

/// File name prefix for the rolling log files.
const LOG_FILE_PREFIX: &str = "bcbooking.log";

/// Initialize the tracing subscriber at INFO.
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific log level.
///
/// Uses `try_init`, so calling this twice (tests, embedded use) is harmless.
pub fn init_with_level(level: Level) {
    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .with(build_filter(level))
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}

/// Initialize logging from the `[logging]` config section.
///
/// With `directory` set, a daily rolling file sink is added next to stdout and
/// the returned guard must be held for the lifetime of the process.
pub fn init_from_config(config: &LoggingConfig) -> Option<LogGuard> {
    let level = parse_level(config.level.as_deref());

    let Some(directory) = config.directory.as_deref() else {
        init_with_level(level);
        return None;
    };

    let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true),
        )
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(build_filter(level))
        .try_init();

    if result.is_ok() {
        info!(
            "Logging initialized at level: {} (files in {})",
            level, directory
        );
    }
    Some(guard)
}

/// Parses a level name, falling back to INFO.
pub fn parse_level(level: Option<&str>) -> Level {
    level
        .and_then(|name| Level::from_str(name.trim()).ok())
        .unwrap_or(Level::INFO)
}

fn build_filter(level: Level) -> EnvFilter {
    CRATE_TARGETS
        .iter()
        .fold(EnvFilter::from_default_env(), |filter, target| {
            match format!("{}={}", target, level).parse() {
                Ok(directive) => filter.add_directive(directive),
                Err(_) => filter,
            }
        })
}

/// Log an error with context at the ERROR level.
pub fn log_error<E: std::fmt::Display>(error: E, context: &str) {
    error!("{}: {}", context, error);
}

/// Log a result, with different messages for success and error cases.
///
/// Returns the original result, allowing this function to be used in a chain.
pub fn log_result<T, E: std::fmt::Display>(
    result: Result<T, E>,
    success_message: &str,
    error_context: &str,
) -> Result<T, E> {
    match &result {
        Ok(_) => info!("{}", success_message),
        Err(e) => error!("{}: {}", error_context, e),
    }
    result
}
