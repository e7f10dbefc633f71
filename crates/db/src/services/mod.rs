//! Ledger and account services.
//!
//! Services are generic over a gateway and its stores. The object-safe
//! [`LedgerOperations`] and [`AccountOperations`] traits erase those
//! parameters so callers can hold an `Arc<dyn ...>` regardless of backend.

pub mod account;
pub mod ledger;

#[cfg(test)]
mod ledger_props;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use payvault_core::ledger::{
    Account, JournalEntry, LedgerError, Reconciliation, TransactionType, TransferResult,
};
use payvault_shared::config::{DatabaseConfig, LedgerConfig};
use payvault_shared::types::{AccountId, PageRequest, PageResponse, TransactionId};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use tracing::warn;

pub use account::AccountService;
pub use ledger::LedgerService;

use crate::gateway::StorageGateway;
use crate::memory::MemoryStore;
use crate::postgres::PostgresGateway;
use crate::repositories::{
    AccountLedgerStore, AccountRepository, TransactionJournalStore, TransactionRepository,
};

/// Balance-changing and journal-reading ledger operations.
#[async_trait]
pub trait LedgerOperations: Send + Sync {
    /// Posts a single deposit or withdrawal.
    ///
    /// Locks the account, checks funds for withdrawals, updates the balance
    /// and appends one journal entry, all in one session.
    async fn create(
        &self,
        account_id: AccountId,
        kind: TransactionType,
        amount: Decimal,
    ) -> Result<JournalEntry, LedgerError>;

    /// Moves `amount` from one account to another atomically.
    ///
    /// Both rows are locked in ascending id order, so opposing transfers
    /// cannot deadlock.
    async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<TransferResult, LedgerError>;

    /// Journal entries of one account, oldest first.
    async fn list_by_account(&self, account_id: AccountId)
    -> Result<Vec<JournalEntry>, LedgerError>;

    /// One journal entry by id.
    async fn get_by_id(&self, id: TransactionId) -> Result<JournalEntry, LedgerError>;

    /// Compares the stored balance with the journal sum under the row lock.
    async fn reconcile(&self, account_id: AccountId) -> Result<Reconciliation, LedgerError>;
}

/// Account lifecycle operations.
#[async_trait]
pub trait AccountOperations: Send + Sync {
    /// Opens an account. A positive opening balance is journaled as a deposit.
    async fn create(&self, owner: &str, initial_balance: Decimal)
    -> Result<Account, LedgerError>;

    /// Reads one account.
    async fn get(&self, id: AccountId) -> Result<Account, LedgerError>;

    /// Lists accounts ordered by owner.
    async fn list(&self, page: PageRequest) -> Result<PageResponse<Account>, LedgerError>;
}

/// Both services wired to one backend, type-erased for sharing.
#[derive(Clone)]
pub struct Services {
    /// Postings, transfers and journal reads.
    pub ledger: Arc<dyn LedgerOperations>,
    /// Account lifecycle.
    pub accounts: Arc<dyn AccountOperations>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

impl Services {
    /// Services backed by Postgres through `db`.
    #[must_use]
    pub fn postgres(
        db: DatabaseConnection,
        database: &DatabaseConfig,
        ledger: &LedgerConfig,
    ) -> Self {
        let gateway =
            PostgresGateway::new(db.clone()).with_lock_timeout(database.lock_timeout());
        let accounts = AccountRepository::new(db.clone());
        let journal = TransactionRepository::new(db);
        Self::wire(gateway, accounts, journal, ledger.operation_timeout())
    }

    /// Services backed by a fresh in-process store.
    #[must_use]
    pub fn memory(database: &DatabaseConfig, ledger: &LedgerConfig) -> Self {
        let store = MemoryStore::new().with_lock_timeout(database.lock_timeout());
        Self::wire(store.clone(), store.clone(), store, ledger.operation_timeout())
    }

    fn wire<G, A, J>(gateway: G, accounts: A, journal: J, deadline: Option<Duration>) -> Self
    where
        G: StorageGateway + Clone + 'static,
        A: AccountLedgerStore<Session = G::Session> + Clone + 'static,
        J: TransactionJournalStore<Session = G::Session> + Clone + 'static,
    {
        let ledger = LedgerService::new(gateway.clone(), accounts.clone(), journal.clone())
            .with_operation_timeout(deadline);
        let account_service =
            AccountService::new(gateway, accounts, journal).with_operation_timeout(deadline);
        Self {
            ledger: Arc::new(ledger),
            accounts: Arc::new(account_service),
        }
    }
}

/// Runs `operation` under an optional deadline.
///
/// When the deadline fires the operation future is dropped, which drops its
/// session and rolls back anything it staged.
pub(crate) async fn with_deadline<T, F>(
    deadline: Option<Duration>,
    operation: &'static str,
    fut: F,
) -> Result<T, LedgerError>
where
    F: Future<Output = Result<T, LedgerError>>,
{
    let Some(limit) = deadline else {
        return fut.await;
    };

    if let Ok(result) = tokio::time::timeout(limit, fut).await {
        result
    } else {
        warn!(operation, ?limit, "ledger operation deadline exceeded");
        Err(LedgerError::Unavailable(format!(
            "{operation} did not finish within {limit:?}"
        )))
    }
}
