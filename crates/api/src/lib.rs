//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes over the account and ledger services
//! - The JSON error envelope shared by every handler
//! - Request and response bodies

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use payvault_db::{AccountOperations, LedgerOperations, Services};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Postings, transfers and journal reads.
    pub ledger: Arc<dyn LedgerOperations>,
    /// Account lifecycle.
    pub accounts: Arc<dyn AccountOperations>,
}

impl From<Services> for AppState {
    fn from(services: Services) -> Self {
        Self {
            ledger: services.ledger,
            accounts: services.accounts,
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
