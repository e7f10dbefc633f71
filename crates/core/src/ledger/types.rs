//! Ledger domain types shared by every storage backend.
//!
//! These are the values that cross the ledger boundary: accounts as the ledger
//! sees them, journal entries, and the results handed back to callers.

use chrono::{DateTime, Utc};
use payvault_shared::types::{AccountId, TransactionId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::{LedgerError, Rejection};

/// Direction of a journal entry.
///
/// The amount of an entry is always positive; the direction lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming into the account.
    Deposit,
    /// Money leaving the account.
    Withdrawal,
}

impl TransactionType {
    /// Returns the wire/database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
        }
    }

    /// Signed effect of `amount` on a balance.
    #[must_use]
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            Self::Deposit => amount,
            Self::Withdrawal => -amount,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            other => Err(LedgerError::InvalidInput(Rejection::UnknownType(
                other.to_string(),
            ))),
        }
    }
}

/// An account row as seen by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Unique owner name.
    pub owner: String,
    /// Current balance. Never negative after a committed ledger operation.
    pub balance: Decimal,
}

/// One immutable journal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Entry ID, assigned by the store at append time.
    pub id: TransactionId,
    /// The account this entry affects.
    pub account_id: AccountId,
    /// Deposit or withdrawal.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Positive amount.
    pub amount: Decimal,
    /// Insert time, assigned by the store.
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    /// Debited account.
    pub from_account_id: AccountId,
    /// Credited account.
    pub to_account_id: AccountId,
    /// Amount moved.
    pub amount: Decimal,
    /// Withdrawal entry written on the source account.
    pub withdrawal_id: TransactionId,
    /// Deposit entry written on the destination account.
    pub deposit_id: TransactionId,
    /// Source balance after commit.
    pub from_balance: Decimal,
    /// Destination balance after commit.
    pub to_balance: Decimal,
}
