//! Deposit, withdrawal and transfer rules.
//!
//! This module implements the storage-independent half of the ledger:
//! - Domain types (accounts, journal entries, results)
//! - The error taxonomy
//! - Amount/transfer validation and posting arithmetic
//! - Lock ordering for two-account operations
//! - Reconciliation of balances against the journal

pub mod balance;
pub mod error;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use balance::Reconciliation;
pub use error::{ErrorKind, LedgerError, Rejection};
pub use types::{Account, JournalEntry, TransactionType, TransferResult};
pub use validation::{
    MAX_AMOUNT, MAX_SCALE, apply_posting, lock_order, normalize_owner, validate_amount,
    validate_opening_balance, validate_transfer,
};
