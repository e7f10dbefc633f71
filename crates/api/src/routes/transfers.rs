//! Transfer route.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use payvault_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use super::parse_id;
use crate::{AppState, error::ApiError};

/// Creates the transfer routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/transfer", post(create_transfer))
}

/// Request body for a transfer.
///
/// Ids are taken as strings so a malformed one is reported as such rather
/// than as a generic body error.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    /// Account to debit.
    pub from_account_id: String,
    /// Account to credit.
    pub to_account_id: String,
    /// Positive amount.
    pub amount: Decimal,
}

/// POST /transfer
async fn create_transfer(
    State(state): State<AppState>,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let from: AccountId = parse_id(&payload.from_account_id)?;
    let to: AccountId = parse_id(&payload.to_account_id)?;

    let result = state.ledger.transfer(from, to, payload.amount).await?;

    info!(
        from = %result.from_account_id,
        to = %result.to_account_id,
        amount = %result.amount,
        "Transfer completed via API"
    );
    Ok((StatusCode::CREATED, Json(result)))
}
