// --- File: crates/services/bcbooking_backend/src/app_state.rs ---
use bcbooking_config::AppConfig;
use std::sync::Arc;

#[cfg(feature = "erp")]
use bcbooking_erp::{ErpError, ErpState};

/// Application state that is shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// The configuration loaded at startup.
    pub config: Arc<AppConfig>,

    /// Business Central state, present when `use_erp` is set and `[erp]` exists.
    #[cfg(feature = "erp")]
    pub erp_state: Option<Arc<ErpState>>,
}

impl AppState {
    #[cfg(feature = "erp")]
    pub fn new(config: Arc<AppConfig>) -> Result<Self, ErpError> {
        let erp_state = if bcbooking_common::is_erp_enabled(&config) {
            Some(Arc::new(ErpState::from_config(config.clone())?))
        } else {
            if config.use_erp {
                tracing::warn!("use_erp is set but the [erp] section is missing");
            }
            None
        };

        Ok(Self { config, erp_state })
    }

    #[cfg(not(feature = "erp"))]
    pub fn new(config: Arc<AppConfig>) -> Result<Self, std::convert::Infallible> {
        Ok(Self { config })
    }
}
