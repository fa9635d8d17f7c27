// File: services/bcbooking_backend/src/main.rs
use axum::{routing::get, Router};
use bcbooking_common::{config_error, log_result, BookingError, Context};
use bcbooking_config::{env_vars::redact_secrets, load_config};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, info};

mod app_state;
use app_state::AppState;

/// Builds the full application router from the shared state.
fn build_app(state: &AppState) -> Router {
    let api_router = Router::new()
        .route("/", get(|| async { "Business Central booking gateway" }))
        .merge(bcbooking_common::routes());

    #[allow(unused_mut)] // for the features it needs to be mutable
    let mut api_router = api_router;
    #[cfg(feature = "erp")]
    {
        if let Some(erp_state) = state.erp_state.clone() {
            api_router = api_router.merge(bcbooking_erp::router(erp_state));
        }
    }

    let mut app = Router::new().nest("/api", api_router);

    // Conditionally add Swagger UI and JSON endpoint if openapi feature enabled
    #[cfg(feature = "openapi")]
    {
        #[cfg(feature = "erp")]
        use bcbooking_erp::doc::ErpApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "Booking Gateway API",
                version = "0.1.0",
                description = "Business Central appointment booking gateway",
                license(name = "MIT", url = "https://opensource.org/licenses/MIT")
            ),
            servers( (url = "/api", description = "Main API Prefix")),
        )]
        struct ApiDoc;

        #[allow(unused_mut)]
        let mut openapi_doc = ApiDoc::openapi();
        #[cfg(feature = "erp")]
        openapi_doc.merge(ErpApiDoc::openapi());
        info!("Adding Swagger UI at /api/docs");

        let swagger_ui = SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc);
        app = app.merge(swagger_ui);
    }

    if let Some(static_dir) = state.config.server.static_dir.as_deref() {
        info!("Serving static files from {}", static_dir);
        app = app.fallback_service(ServeDir::new(static_dir));
    }

    app.layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> Result<(), BookingError> {
    let config = load_config().map_err(|e| config_error(format!("Failed to load config: {}", e)))?;
    let _log_guard = bcbooking_common::init_from_config(&config.logging);

    if let Ok(mut dump) = serde_json::to_value(&config) {
        redact_secrets(&mut dump);
        debug!("Loaded config: {}", dump);
    }

    let config = Arc::new(config);
    info!(
        "Enabled features: {:?}",
        bcbooking_common::features::enabled_features(&config)
    );
    let state = log_result(
        AppState::new(config.clone()),
        "Application state ready",
        "Application state failed",
    )
    .context("Failed to initialize application state")?;
    let app = build_app(&state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service())
        .await
        .context("Server error")
}
