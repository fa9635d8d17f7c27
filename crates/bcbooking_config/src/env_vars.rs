//! Environment variable handling for the booking gateway.
//!
//! Secrets never live in the config files. A config value of
//! `"secret_from_env"` is resolved here, first through the prefixed name
//! (`BCBOOKING_SECRET_ERP_CLIENT_SECRET`) and then through the short name
//! (`ERP_CLIENT_SECRET`).

use serde_json::Value;
use std::env;
use tracing::warn;

/// The prefix for layered configuration environment variables
pub const DEFAULT_PREFIX: &str = "BCBOOKING";

/// The prefix for secret environment variables
pub const SECRET_PREFIX: &str = "BCBOOKING_SECRET";

/// The separator for secret environment variables
pub const SECRET_SEPARATOR: &str = "_";

/// Marker value that asks for a secret to be read from the environment
pub const SECRET_MARKER: &str = "secret_from_env";

/// Variables whose presence means the process runs on an ephemeral/serverless host.
pub const EPHEMERAL_MARKERS: [&str; 3] = ["VERCEL", "AWS_LAMBDA_FUNCTION_NAME", "BCBOOKING_EPHEMERAL"];

/// Get the prefix for configuration environment variables
pub fn get_config_prefix() -> String {
    env::var("PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string())
}

/// Convert a secret path to an environment variable name
///
/// `erp.client_secret` becomes `BCBOOKING_SECRET_ERP_CLIENT_SECRET`.
pub fn secret_path_to_env_var(path: &str) -> String {
    let path = path.replace('.', SECRET_SEPARATOR);
    format!("{}{}{}", SECRET_PREFIX, SECRET_SEPARATOR, path).to_uppercase()
}

/// Convert a secret path to its short, unprefixed environment variable name
///
/// `erp.client_secret` becomes `ERP_CLIENT_SECRET`.
pub fn legacy_secret_path_to_env_var(path: &str) -> String {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.len() < 2 {
        return path.to_uppercase();
    }

    let service = parts[0];
    let key = parts[1..].join(SECRET_SEPARATOR);
    format!("{}_{}", service, key).to_uppercase()
}

/// Get an environment variable for a secret path, prefixed name first.
pub fn get_secret_env_var(path: &str) -> Option<String> {
    if let Some(value) = non_empty_env(&secret_path_to_env_var(path)) {
        return Some(value);
    }
    non_empty_env(&legacy_secret_path_to_env_var(path))
}

/// Read a variable, treating an empty value as absent.
pub fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Check if a path is a secret path
///
/// Paths containing "secret", "key", "password" or "token" are considered secret.
pub fn is_secret_path(path: &str) -> bool {
    let path_lower = path.to_lowercase();
    path_lower.contains("secret")
        || path_lower.contains("key")
        || path_lower.contains("password")
        || path_lower.contains("token")
}

/// True when one of the [`EPHEMERAL_MARKERS`] is set.
pub fn is_ephemeral_deployment() -> bool {
    EPHEMERAL_MARKERS.iter().any(|name| env::var_os(name).is_some())
}

/// Replace every `"secret_from_env"` marker with its environment value.
///
/// Markers without a matching variable become `null`, so optional fields
/// deserialize as `None` and the missing secret is reported where it is used.
/// Returns `true` if any marker was resolved.
pub fn inject_env_vars(value: &mut Value) -> bool {
    fn walk(path: Vec<String>, obj: &mut Value) -> bool {
        let mut replaced = false;

        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    let mut new_path = path.clone();
                    new_path.push(k.to_string());
                    replaced |= walk(new_path, v);
                }
            }
            Value::Array(arr) => {
                for (i, v) in arr.iter_mut().enumerate() {
                    let mut new_path = path.clone();
                    new_path.push(i.to_string());
                    replaced |= walk(new_path, v);
                }
            }
            Value::String(s) if s == SECRET_MARKER => {
                let path_str = path.join(".");
                if let Some(env_val) = get_secret_env_var(&path_str) {
                    *obj = Value::String(env_val);
                    replaced = true;
                } else {
                    warn!(
                        "No environment value for {} (tried {} and {})",
                        path_str,
                        secret_path_to_env_var(&path_str),
                        legacy_secret_path_to_env_var(&path_str)
                    );
                    *obj = Value::Null;
                }
            }
            _ => {}
        }

        replaced
    }

    walk(vec![], value)
}

/// Mask every string stored under a secret-looking key, for logging a loaded config.
pub fn redact_secrets(value: &mut Value) {
    fn walk(path: &str, obj: &mut Value) {
        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    let child = if path.is_empty() {
                        k.to_string()
                    } else {
                        format!("{}.{}", path, k)
                    };
                    walk(&child, v);
                }
            }
            Value::String(s) if is_secret_path(path) && !s.is_empty() => {
                *s = "***".to_string();
            }
            _ => {}
        }
    }

    walk("", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_secret_path_to_env_var() {
        assert_eq!(
            secret_path_to_env_var("erp.client_secret"),
            "BCBOOKING_SECRET_ERP_CLIENT_SECRET"
        );
        assert_eq!(
            secret_path_to_env_var("erp.tenant_id"),
            "BCBOOKING_SECRET_ERP_TENANT_ID"
        );
    }

    #[test]
    fn test_legacy_secret_path_to_env_var() {
        assert_eq!(
            legacy_secret_path_to_env_var("erp.client_secret"),
            "ERP_CLIENT_SECRET"
        );
        assert_eq!(legacy_secret_path_to_env_var("scope"), "SCOPE");
    }

    #[test]
    fn test_is_secret_path() {
        assert!(is_secret_path("erp.client_secret"));
        assert!(is_secret_path("token_cache.access_token"));
        assert!(!is_secret_path("erp.tenant_id"));
        assert!(!is_secret_path("server.host"));
    }

    #[test]
    fn test_inject_env_vars_resolves_marker() {
        env::set_var("BCBOOKING_SECRET_INJECTTEST_CLIENT_SECRET", "s3cr3t");
        let mut value = json!({ "injecttest": { "client_secret": "secret_from_env", "company": "ACME" } });

        assert!(inject_env_vars(&mut value));
        assert_eq!(value["injecttest"]["client_secret"], "s3cr3t");
        assert_eq!(value["injecttest"]["company"], "ACME");
        env::remove_var("BCBOOKING_SECRET_INJECTTEST_CLIENT_SECRET");
    }

    #[test]
    fn test_inject_env_vars_falls_back_to_short_name() {
        env::set_var("FALLBACKTEST_TENANT_ID", "tenant-123");
        let mut value = json!({ "fallbacktest": { "tenant_id": "secret_from_env" } });

        assert!(inject_env_vars(&mut value));
        assert_eq!(value["fallbacktest"]["tenant_id"], "tenant-123");
        env::remove_var("FALLBACKTEST_TENANT_ID");
    }

    #[test]
    fn test_inject_env_vars_unresolved_marker_becomes_null() {
        let mut value = json!({ "unsetsvc": { "client_id": "secret_from_env" } });

        assert!(!inject_env_vars(&mut value));
        assert!(value["unsetsvc"]["client_id"].is_null());
    }

    #[test]
    fn test_redact_secrets() {
        let mut value = json!({ "erp": { "client_secret": "abc", "company": "ACME" } });
        redact_secrets(&mut value);
        assert_eq!(value["erp"]["client_secret"], "***");
        assert_eq!(value["erp"]["company"], "ACME");
    }
}
