// File: crates/bcbooking_erp/src/handlers.rs
use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection, QueryRejection},
        Form, Query, State,
    },
    response::Json,
};
use bcbooking_common::{
    create_client, handle_json_result, log_error, validation_error, BookingError, HTTP_CLIENT,
};
use bcbooking_config::AppConfig;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ErpError;
use crate::gateway::ErpGateway;
use crate::grid::{apply_grid, GridForm, GridRequest, GridResponse};
use crate::models::{AccessTokenResponse, BranchQuery, SetupListResponse};
use crate::token::TokenProvider;

// Shared state for the Business Central handlers
#[derive(Clone)]
pub struct ErpState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<ErpGateway>,
    pub tokens: Arc<TokenProvider>,
}

impl ErpState {
    /// Wires the token provider and gateway from the `[erp]` section.
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self, ErpError> {
        let erp = config
            .erp
            .clone()
            .ok_or(ErpError::MissingConfig("erp section"))?;

        let client = create_client(erp.request_timeout_secs(), true).unwrap_or_else(|e| {
            warn!("Falling back to the shared HTTP client: {}", e);
            HTTP_CLIENT.clone()
        });

        let tokens = Arc::new(TokenProvider::from_config(client.clone(), &config)?);
        let gateway = Arc::new(ErpGateway::new(client, erp, tokens.clone()));
        Ok(Self {
            config,
            gateway,
            tokens,
        })
    }
}

/// Handler returning a valid Business Central access token.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/auth/token",
    responses(
        (status = 200, description = "Cached or freshly issued access token", body = AccessTokenResponse),
        (status = 500, description = "Business Central credentials missing"),
        (status = 502, description = "Token endpoint refused the credentials")
    ),
    tag = "Business Central"
))]
pub async fn get_token_handler(
    State(state): State<Arc<ErpState>>,
) -> Result<Json<AccessTokenResponse>, BookingError> {
    let result = state
        .tokens
        .get_token()
        .await
        .map(|access_token| AccessTokenResponse { access_token })
        .inspect_err(|e| log_error(e, "Token request failed"));
    handle_json_result(result)
}

/// Handler listing every booking setup.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/booking/setup-list",
    responses(
        (status = 200, description = "All booking setups", body = SetupListResponse),
        (status = 500, description = "Configuration missing"),
        (status = 502, description = "Business Central unreachable or sent an invalid payload")
    ),
    tag = "Business Central"
))]
pub async fn get_setup_list_handler(
    State(state): State<Arc<ErpState>>,
) -> Result<Json<SetupListResponse>, BookingError> {
    let result = state
        .gateway
        .fetch_setup_list()
        .await
        .map(|value| SetupListResponse { value })
        .inspect_err(|e| log_error(e, "Setup list request failed"));
    handle_json_result(result)
}

/// DataTables server-side processing over the setup list.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/booking/setup-list",
    request_body(content = GridForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "One page of booking setups", body = GridResponse),
        (status = 400, description = "Body is not a form"),
        (status = 500, description = "Configuration missing"),
        (status = 502, description = "Business Central unreachable or sent an invalid payload")
    ),
    tag = "Business Central"
))]
pub async fn grid_setup_list_handler(
    State(state): State<Arc<ErpState>>,
    form: Result<Form<GridForm>, FormRejection>,
) -> Result<Json<GridResponse>, BookingError> {
    let Form(form) = form?;
    let request = GridRequest::from(form);
    let records = state
        .gateway
        .fetch_setup_list()
        .await
        .inspect_err(|e| log_error(e, "Setup grid request failed"))?;

    let response = apply_grid(&request, records);
    info!(
        "Grid draw {}: {} of {} setups match, returning {}",
        response.draw,
        response.records_filtered,
        response.records_total,
        response.data.len()
    );
    Ok(Json(response))
}

/// Handler returning the setup of one branch.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/booking/setup",
    params(BranchQuery),
    responses(
        (status = 200, description = "Branch setup as returned by Business Central", body = Object),
        (status = 400, description = "Branch parameter is required"),
        (status = 500, description = "Configuration missing")
    ),
    tag = "Business Central"
))]
pub async fn get_branch_setup_handler(
    State(state): State<Arc<ErpState>>,
    query: Result<Query<BranchQuery>, QueryRejection>,
) -> Result<Json<Value>, BookingError> {
    let Query(query) = query?;
    let branch = query
        .branch
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .ok_or_else(|| validation_error("Branch parameter is required"))?;

    let result = state
        .gateway
        .fetch_branch_setup(branch)
        .await
        .inspect_err(|e| log_error(e, "Branch setup request failed"));
    handle_json_result(result)
}

/// Forwards a time-slot query to Business Central.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/booking/time-slots",
    request_body(content = Object, description = "Passed to Business Central unchanged"),
    responses(
        (status = 200, description = "Available time slots as returned by Business Central", body = Object),
        (status = 400, description = "Body is not valid JSON"),
        (status = 500, description = "Configuration missing")
    ),
    tag = "Business Central"
))]
pub async fn post_time_slots_handler(
    State(state): State<Arc<ErpState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, BookingError> {
    let Json(body) = body?;
    let result = state
        .gateway
        .fetch_time_slots(&body)
        .await
        .inspect_err(|e| log_error(e, "Time slot request failed"));
    handle_json_result(result)
}
