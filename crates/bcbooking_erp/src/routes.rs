// --- File: crates/bcbooking_erp/src/routes.rs ---

use axum::{
    routing::{get, post},
    Router,
};
use bcbooking_config::AppConfig;
use std::sync::Arc;
use tracing::info;

use crate::error::ErpError;
use crate::handlers::{
    get_branch_setup_handler, get_setup_list_handler, get_token_handler,
    grid_setup_list_handler, post_time_slots_handler, ErpState,
};

/// Creates a router containing all routes for the Business Central feature.
/// Fails when the `[erp]` section is missing.
pub fn routes(config: Arc<AppConfig>) -> Result<Router, ErpError> {
    let state = Arc::new(ErpState::from_config(config)?);
    Ok(router(state))
}

/// Same routes over an already built state.
pub fn router(state: Arc<ErpState>) -> Router {
    let expose_token = state
        .config
        .erp
        .as_ref()
        .is_some_and(|erp| erp.expose_token_route);

    let router = Router::new()
        .route(
            "/booking/setup-list",
            get(get_setup_list_handler).post(grid_setup_list_handler),
        )
        .route("/booking/setup", get(get_branch_setup_handler))
        .route("/booking/time-slots", post(post_time_slots_handler));

    let router = if expose_token {
        info!("Exposing /auth/token");
        router.route("/auth/token", get(get_token_handler))
    } else {
        router
    };

    router.with_state(state)
}
