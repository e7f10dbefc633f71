//! Transaction routes: post a deposit or withdrawal, read the journal.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use payvault_core::ledger::{JournalEntry, TransactionType};
use payvault_shared::types::{AccountId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::parse_id;
use crate::{AppState, error::ApiError};

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts/{account_id}/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route("/transactions/{transaction_id}", get(get_transaction))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for posting a transaction.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// `deposit` or `withdrawal`.
    #[serde(rename = "type")]
    pub transaction_type: String,
    /// Positive amount.
    pub amount: Decimal,
}

/// One journal entry.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Entry ID.
    pub id: TransactionId,
    /// Affected account.
    pub account_id: AccountId,
    /// `deposit` or `withdrawal`.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Positive amount.
    pub amount: Decimal,
    /// When the entry was written.
    pub timestamp: DateTime<Utc>,
}

impl From<JournalEntry> for TransactionResponse {
    fn from(entry: JournalEntry) -> Self {
        Self {
            id: entry.id,
            account_id: entry.account_id,
            transaction_type: entry.kind,
            amount: entry.amount,
            timestamp: entry.timestamp,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /accounts/{account_id}/transactions
async fn create_transaction(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    payload: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id: AccountId = parse_id(&account_id)?;
    let Json(payload) = payload?;
    let kind: TransactionType = payload.transaction_type.parse()?;

    let entry = state.ledger.create(id, kind, payload.amount).await?;
    Ok((StatusCode::CREATED, Json(TransactionResponse::from(entry))))
}

/// GET /accounts/{account_id}/transactions
async fn list_transactions(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: AccountId = parse_id(&account_id)?;
    let entries = state.ledger.list_by_account(id).await?;
    let transactions: Vec<TransactionResponse> =
        entries.into_iter().map(TransactionResponse::from).collect();
    Ok(Json(json!({ "transactions": transactions })))
}

/// GET /transactions/{transaction_id}
async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: TransactionId = parse_id(&transaction_id)?;
    let entry = state.ledger.get_by_id(id).await?;
    Ok(Json(TransactionResponse::from(entry)))
}
