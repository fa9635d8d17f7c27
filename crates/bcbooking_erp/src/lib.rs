// --- File: crates/bcbooking_erp/src/lib.rs ---
// Declare modules within this crate
pub mod doc;
pub mod error;
pub mod gateway;
pub mod grid;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod token;

// Re-export for main backend
pub use error::ErpError;
pub use gateway::{unwrap_envelope, ErpFunction, ErpGateway};
pub use grid::{apply_grid, GridForm, GridRequest, GridResponse, SortDirection};
pub use handlers::ErpState;
pub use models::{CachedToken, UpstreamRecord};
pub use routes::{router, routes};
pub use token::{FileTokenStore, MemoryTokenStore, TokenProvider, TokenStore};
