//! Storage error classification.
//!
//! Backends report failures as [`StoreError`]. The ledger maps each variant to
//! exactly one [`LedgerError`] kind so callers can decide whether to retry.

use payvault_core::ledger::LedgerError;
use payvault_shared::types::AccountId;
use sea_orm::{DbErr, RuntimeErr, SqlErr};

/// `lock_not_available`: `lock_timeout` elapsed while waiting on a row lock.
const SQLSTATE_LOCK_NOT_AVAILABLE: &str = "55P03";
/// `deadlock_detected`.
const SQLSTATE_DEADLOCK_DETECTED: &str = "40P01";
/// `serialization_failure`.
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";
/// `query_canceled`, raised when `statement_timeout` fires.
const SQLSTATE_QUERY_CANCELED: &str = "57014";

/// Errors raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No account row with this id.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Unique constraint violated.
    #[error("Duplicate value: {0}")]
    Duplicate(String),

    /// Stored data breaks an invariant the schema should guarantee.
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// Row lock not acquired in time, or the engine aborted a lock cycle.
    #[error("Lock not acquired: {0}")]
    LockTimeout(String),

    /// Connection could not be obtained.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Session tried to write an account row it never locked.
    #[error("Account {0} is not locked by this session")]
    NotLocked(AccountId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(DbErr),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return Self::Duplicate(detail);
        }

        let lock_failure = sqlstate(&err).is_some_and(|code| {
            matches!(
                code.as_str(),
                SQLSTATE_LOCK_NOT_AVAILABLE
                    | SQLSTATE_DEADLOCK_DETECTED
                    | SQLSTATE_SERIALIZATION_FAILURE
                    | SQLSTATE_QUERY_CANCELED
            )
        });
        if lock_failure {
            return Self::LockTimeout(err.to_string());
        }

        match err {
            DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => Self::Unavailable(err.to_string()),
            other => Self::Database(other),
        }
    }
}

/// Extracts the SQLSTATE code from a driver error, if there is one.
fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e)) => e
            .as_database_error()
            .and_then(|db| db.code())
            .map(std::borrow::Cow::into_owned),
        _ => None,
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(id) => Self::AccountNotFound(id),
            StoreError::Duplicate(detail) | StoreError::Integrity(detail) => {
                tracing::error!(detail = %detail, "storage integrity fault");
                Self::Conflict(detail)
            }
            StoreError::LockTimeout(detail) | StoreError::Unavailable(detail) => {
                Self::Unavailable(detail)
            }
            StoreError::NotLocked(id) => {
                tracing::error!(account_id = %id, "write attempted without row lock");
                Self::Internal(format!("account {id} written without lock"))
            }
            StoreError::Database(db) => {
                tracing::error!(error = %db, "database error");
                Self::Internal(db.to_string())
            }
        }
    }
}
