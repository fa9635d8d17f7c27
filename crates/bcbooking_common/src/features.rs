//! Feature flag handling.
//!
//! Features are switched in two places: at compile time through Cargo
//! features (`erp`), and at runtime through `use_*` flags in the config.
//! A feature is live only when its flag is set *and* its config section exists.

use bcbooking_config::AppConfig;

/// Check if a feature is enabled at runtime based on configuration.
pub fn is_feature_enabled<T>(use_feature: bool, feature_config: Option<&T>) -> bool {
    use_feature && feature_config.is_some()
}

/// Check if the Business Central gateway is enabled at runtime.
#[cfg(feature = "erp")]
pub fn is_erp_enabled(config: &AppConfig) -> bool {
    is_feature_enabled(config.use_erp, config.erp.as_ref())
}

/// Names of the runtime features that are switched on, for the startup log.
pub fn enabled_features(config: &AppConfig) -> Vec<&'static str> {
    let mut enabled = Vec::new();
    if is_feature_enabled(config.use_erp, config.erp.as_ref()) {
        enabled.push("erp");
    }
    enabled
}
