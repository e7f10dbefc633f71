//! Ledger error taxonomy.
//!
//! Every failure a ledger operation can report falls into one of five kinds:
//! invalid input, not found, conflict, unavailable, internal. Only
//! `Unavailable` is safe to retry unchanged; nothing was committed.

use payvault_shared::AppError;
use payvault_shared::types::{AccountId, TransactionId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Broad error class, used by callers that only care about retry/transport semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller error; never retried automatically.
    InvalidInput,
    /// Referenced account or entry does not exist.
    NotFound,
    /// Integrity fault in stored data.
    Conflict,
    /// Lock timeout, deadline or connection loss.
    Unavailable,
    /// Any other storage or programming fault.
    Internal,
}

/// Why a request was rejected as invalid input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// Amount is zero or negative.
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// Amount carries more decimal places than the ledger stores.
    #[error("amount {0} has more than {max} decimal places", max = super::validation::MAX_SCALE)]
    ExcessPrecision(Decimal),

    /// Amount or resulting balance exceeds what the ledger can store.
    #[error("{0} is outside the supported range (max {max})", max = super::validation::MAX_AMOUNT)]
    AmountOutOfRange(Decimal),

    /// Transfer source and destination are the same account.
    #[error("from and to account ids are the same")]
    SameAccount,

    /// Balance does not cover the requested debit.
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance at lock time.
        available: Decimal,
        /// Amount requested.
        requested: Decimal,
    },

    /// Identifier could not be parsed.
    #[error("malformed identifier: {0}")]
    MalformedId(String),

    /// Transaction type is neither deposit nor withdrawal.
    #[error("unknown transaction type: {0}")]
    UnknownType(String),

    /// Owner name fails length rules.
    #[error("owner must be between {min} and {max} characters")]
    InvalidOwner {
        /// Minimum length.
        min: usize,
        /// Maximum length.
        max: usize,
    },

    /// Owner name already taken.
    #[error("account with owner {0} already exists")]
    DuplicateOwner(String),

    /// Opening balance below zero.
    #[error("initial balance cannot be negative")]
    NegativeOpeningBalance,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Request rejected before or during validation.
    #[error("Invalid input: {0}")]
    InvalidInput(Rejection),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Journal entry not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Integrity fault (e.g. duplicate rows for a unique id).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage temporarily unavailable; safe to retry.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<Rejection> for LedgerError {
    fn from(rejection: Rejection) -> Self {
        Self::InvalidInput(rejection)
    }
}

impl LedgerError {
    /// Returns the taxonomy class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::AccountNotFound(_) | Self::TransactionNotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(rejection) => match rejection {
                Rejection::NonPositiveAmount(_) => "INVALID_AMOUNT",
                Rejection::ExcessPrecision(_) => "INVALID_AMOUNT_PRECISION",
                Rejection::AmountOutOfRange(_) => "AMOUNT_OUT_OF_RANGE",
                Rejection::SameAccount => "SAME_ACCOUNT_TRANSFER",
                Rejection::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
                Rejection::MalformedId(_) => "MALFORMED_ID",
                Rejection::UnknownType(_) => "INVALID_TRANSACTION_TYPE",
                Rejection::InvalidOwner { .. } => "INVALID_OWNER",
                Rejection::DuplicateOwner(_) => "DUPLICATE_OWNER",
                Rejection::NegativeOpeningBalance => "INVALID_INITIAL_BALANCE",
            },
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Unavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidInput => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Unavailable => 503,
            ErrorKind::Internal => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Unavailable)
    }

    /// Shorthand for an insufficient-funds rejection.
    #[must_use]
    pub const fn insufficient_funds(available: Decimal, requested: Decimal) -> Self {
        Self::InvalidInput(Rejection::InsufficientFunds {
            available,
            requested,
        })
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidInput(rejection) => Self::Validation(rejection.to_string()),
            LedgerError::AccountNotFound(id) => Self::NotFound(format!("account {id}")),
            LedgerError::TransactionNotFound(id) => Self::NotFound(format!("transaction {id}")),
            // integrity details stay in the logs
            LedgerError::Conflict(_) => Self::Conflict("data integrity conflict".to_string()),
            LedgerError::Unavailable(_) => {
                Self::Unavailable("temporarily unavailable, retry the request".to_string())
            }
            LedgerError::Internal(_) => Self::Internal("internal error".to_string()),
        }
    }
}
