//! API route definitions.

use std::str::FromStr;

use axum::Router;

use crate::{AppState, error::ApiError};

pub mod accounts;
pub mod health;
pub mod transactions;
pub mod transfers;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(accounts::routes())
        .merge(transactions::routes())
        .merge(transfers::routes())
}

/// Parses an identifier taken from the path, rejecting it as malformed on failure.
pub(crate) fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    raw.trim().parse().map_err(|_| ApiError::malformed_id(raw))
}
