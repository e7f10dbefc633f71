//! Account routes: open, read, list, reconcile.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use payvault_core::ledger::{Account, Reconciliation};
use payvault_shared::types::{AccountId, PageRequest};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::parse_id;
use crate::{AppState, error::ApiError};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/{account_id}", get(get_account))
        .route("/accounts/{account_id}/reconciliation", get(reconcile_account))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for opening an account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// Unique owner name, 2 to 72 characters after trimming.
    pub owner: String,
    /// Opening balance (default: 0).
    #[serde(default)]
    pub initial_balance: Decimal,
}

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account ID.
    pub id: AccountId,
    /// Owner name.
    pub owner: String,
    /// Current balance.
    pub balance: Decimal,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            owner: account.owner,
            balance: account.balance,
        }
    }
}

/// Reconciliation report for one account.
#[derive(Debug, Serialize)]
pub struct ReconciliationResponse {
    /// Account ID.
    pub account_id: AccountId,
    /// Stored balance.
    pub balance: Decimal,
    /// Deposits minus withdrawals over the whole journal.
    pub journal_balance: Decimal,
    /// Sum of deposits.
    pub total_deposits: Decimal,
    /// Sum of withdrawals.
    pub total_withdrawals: Decimal,
    /// Number of journal entries.
    pub entry_count: usize,
    /// Whether the stored balance matches the journal.
    pub consistent: bool,
}

impl From<Reconciliation> for ReconciliationResponse {
    fn from(report: Reconciliation) -> Self {
        let consistent = report.is_consistent();
        Self {
            account_id: report.account_id,
            balance: report.balance,
            journal_balance: report.journal_balance,
            total_deposits: report.total_deposits,
            total_withdrawals: report.total_withdrawals,
            entry_count: report.entry_count,
            consistent,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /accounts
async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let account = state
        .accounts
        .create(&payload.owner, payload.initial_balance)
        .await?;

    info!(account_id = %account.id, "Account opened via API");
    Ok((StatusCode::CREATED, Json(AccountResponse::from(account))))
}

/// GET /accounts
async fn list_accounts(
    State(state): State<AppState>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(page) = query?;
    let accounts = state.accounts.list(page).await?;
    Ok(Json(accounts.map(AccountResponse::from)))
}

/// GET /accounts/{account_id}
async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: AccountId = parse_id(&account_id)?;
    let account = state.accounts.get(id).await?;
    Ok(Json(AccountResponse::from(account)))
}

/// GET /accounts/{account_id}/reconciliation
async fn reconcile_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: AccountId = parse_id(&account_id)?;
    let report = state.ledger.reconcile(id).await?;
    Ok(Json(ReconciliationResponse::from(report)))
}
