// File: crates/bcbooking_erp/src/doc.rs

#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::grid::{GridForm, GridResponse};
use crate::models::{AccessTokenResponse, SetupListResponse};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::get_token_handler,
        crate::handlers::get_setup_list_handler,
        crate::handlers::grid_setup_list_handler,
        crate::handlers::get_branch_setup_handler,
        crate::handlers::post_time_slots_handler,
    ),
    components(schemas(AccessTokenResponse, SetupListResponse, GridForm, GridResponse)),
    tags(
        (name = "Business Central", description = "Booking setups and time slots from Business Central")
    )
)]
pub struct ErpApiDoc;
