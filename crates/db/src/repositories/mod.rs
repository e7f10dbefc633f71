//! Store abstractions for ledger data.
//!
//! Each store works against a session opened by a [`StorageGateway`]. Writes
//! go through the session; plain reads go straight to committed state.
//!
//! [`StorageGateway`]: crate::gateway::StorageGateway

pub mod account;
pub mod transaction;

use async_trait::async_trait;
use payvault_core::ledger::{Account, JournalEntry, TransactionType};
use payvault_shared::types::{AccountId, PageRequest, TransactionId};
use rust_decimal::Decimal;

use crate::error::StoreError;

pub use account::AccountRepository;
pub use transaction::TransactionRepository;

/// Account rows with exclusive row locking.
#[async_trait]
pub trait AccountLedgerStore: Send + Sync {
    /// Session type of the gateway this store works with.
    type Session: Send;

    /// Reads the account and holds an exclusive lock on it until the session ends.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` when no row exists, `Integrity` when more than one
    /// does, `LockTimeout` when the lock is not granted in time.
    async fn lock_account_by_id(
        &self,
        session: &mut Self::Session,
        id: AccountId,
    ) -> Result<Account, StoreError>;

    /// Overwrites the balance of a row locked by `session`.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` when the row is gone.
    async fn update_balance(
        &self,
        session: &mut Self::Session,
        id: AccountId,
        balance: Decimal,
    ) -> Result<(), StoreError>;

    /// Creates an account inside `session`. The new row is locked by it.
    ///
    /// # Errors
    ///
    /// `Duplicate` when the owner is taken.
    async fn insert(
        &self,
        session: &mut Self::Session,
        owner: &str,
        balance: Decimal,
    ) -> Result<Account, StoreError>;

    /// Non-locking existence check.
    async fn exists(&self, id: AccountId) -> Result<bool, StoreError>;

    /// Non-locking read of a committed row.
    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// One page of accounts ordered by owner.
    async fn list(&self, page: PageRequest) -> Result<Vec<Account>, StoreError>;

    /// Total number of accounts.
    async fn count(&self) -> Result<u64, StoreError>;
}

/// Append-only journal of deposits and withdrawals.
#[async_trait]
pub trait TransactionJournalStore: Send + Sync {
    /// Session type of the gateway this store works with.
    type Session: Send;

    /// Appends an entry inside `session`. The store assigns id and timestamp.
    async fn append(
        &self,
        session: &mut Self::Session,
        account_id: AccountId,
        kind: TransactionType,
        amount: Decimal,
    ) -> Result<JournalEntry, StoreError>;

    /// Committed entries of one account, oldest first.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` when the account does not exist.
    async fn list_by_account(&self, account_id: AccountId)
    -> Result<Vec<JournalEntry>, StoreError>;

    /// Entries of one account as seen by `session`, oldest first.
    ///
    /// Runs on the session's own connection, so a caller holding the account
    /// lock needs no second connection. Includes entries staged by `session`.
    ///
    /// # Errors
    ///
    /// `NotLocked` from stores that track locks when `session` does not hold
    /// the account row.
    async fn list_by_account_locked(
        &self,
        session: &mut Self::Session,
        account_id: AccountId,
    ) -> Result<Vec<JournalEntry>, StoreError>;

    /// Single committed entry.
    async fn get_by_id(&self, id: TransactionId) -> Result<Option<JournalEntry>, StoreError>;
}
