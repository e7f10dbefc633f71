//! In-process storage backend.
//!
//! Accounts live in a [`DashMap`]; each account carries its own async mutex
//! standing in for the row lock. A [`MemorySession`] owns the guards of every
//! row it locked and stages its writes. `commit` publishes the staged writes,
//! and dropping the session without committing releases the locks and
//! discards them.
//!
//! Single node only: state is lost on restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use payvault_core::ledger::{Account, JournalEntry, TransactionType};
use payvault_shared::types::{AccountId, PageRequest, TransactionId};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::error::StoreError;
use crate::gateway::StorageGateway;
use crate::repositories::{AccountLedgerStore, TransactionJournalStore};

#[derive(Debug)]
struct AccountSlot {
    owner: String,
    row_lock: Arc<Mutex<()>>,
    balance: RwLock<Decimal>,
}

#[derive(Debug, Default)]
struct MemoryState {
    accounts: DashMap<AccountId, Arc<AccountSlot>>,
    owners: DashMap<String, AccountId>,
    journal: RwLock<Vec<JournalEntry>>,
}

/// A row held by a session, with its staged balance.
#[derive(Debug)]
struct LockedRow {
    slot: Arc<AccountSlot>,
    balance: Decimal,
    dirty: bool,
    _guard: OwnedMutexGuard<()>,
}

/// Session of the in-process backend.
#[derive(Debug)]
pub struct MemorySession {
    state: Arc<MemoryState>,
    locked: HashMap<AccountId, LockedRow>,
    created: Vec<AccountId>,
    entries: Vec<JournalEntry>,
    committed: bool,
}

impl MemorySession {
    fn locked_row(&mut self, id: AccountId) -> Result<&mut LockedRow, StoreError> {
        self.locked.get_mut(&id).ok_or(StoreError::NotLocked(id))
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // release owner names reserved by accounts that never became visible
        for id in &self.created {
            if let Some(row) = self.locked.get(id) {
                self.state
                    .owners
                    .remove_if(&row.slot.owner, |_, reserved| reserved == id);
            }
        }
    }
}

/// In-process gateway, account store, and journal store in one handle.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<MemoryState>,
    lock_timeout: Option<Duration>,
}

impl MemoryStore {
    /// Creates an empty store with unbounded lock waits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds how long a session waits for a row lock.
    #[must_use]
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = Some(lock_timeout);
        self
    }

    async fn acquire(
        &self,
        slot: &AccountSlot,
        id: AccountId,
    ) -> Result<OwnedMutexGuard<()>, StoreError> {
        let lock = Arc::clone(&slot.row_lock).lock_owned();
        match self.lock_timeout {
            Some(limit) => tokio::time::timeout(limit, lock).await.map_err(|_| {
                StoreError::LockTimeout(format!("account {id} still locked after {limit:?}"))
            }),
            None => Ok(lock.await),
        }
    }

    fn slot(&self, id: AccountId) -> Option<Arc<AccountSlot>> {
        self.state.accounts.get(&id).map(|entry| Arc::clone(entry.value()))
    }
}

#[async_trait]
impl StorageGateway for MemoryStore {
    type Session = MemorySession;

    async fn begin(&self) -> Result<MemorySession, StoreError> {
        Ok(MemorySession {
            state: Arc::clone(&self.state),
            locked: HashMap::new(),
            created: Vec::new(),
            entries: Vec::new(),
            committed: false,
        })
    }

    async fn commit(&self, mut session: MemorySession) -> Result<(), StoreError> {
        // take every guard first; a cancelled commit must not publish half its writes
        let mut journal = self.state.journal.write().await;
        let mut balances = Vec::new();
        for row in session.locked.values().filter(|row| row.dirty) {
            balances.push((row.slot.balance.write().await, row.balance));
        }

        for (mut guard, balance) in balances {
            *guard = balance;
        }
        for id in &session.created {
            if let Some(row) = session.locked.get(id) {
                self.state.accounts.insert(*id, Arc::clone(&row.slot));
            }
        }
        journal.append(&mut session.entries);
        drop(journal);

        session.committed = true;
        Ok(())
    }

    async fn rollback(&self, session: MemorySession) -> Result<(), StoreError> {
        drop(session);
        Ok(())
    }
}

#[async_trait]
impl AccountLedgerStore for MemoryStore {
    type Session = MemorySession;

    async fn lock_account_by_id(
        &self,
        session: &mut MemorySession,
        id: AccountId,
    ) -> Result<Account, StoreError> {
        if let Some(row) = session.locked.get(&id) {
            return Ok(Account {
                id,
                owner: row.slot.owner.clone(),
                balance: row.balance,
            });
        }

        let slot = self.slot(id).ok_or(StoreError::AccountNotFound(id))?;
        let guard = self.acquire(&slot, id).await?;
        let balance = *slot.balance.read().await;
        let account = Account {
            id,
            owner: slot.owner.clone(),
            balance,
        };

        session.locked.insert(
            id,
            LockedRow {
                slot,
                balance,
                dirty: false,
                _guard: guard,
            },
        );
        Ok(account)
    }

    async fn update_balance(
        &self,
        session: &mut MemorySession,
        id: AccountId,
        balance: Decimal,
    ) -> Result<(), StoreError> {
        if balance < Decimal::ZERO {
            return Err(StoreError::Integrity(format!(
                "negative balance {balance} for account {id}"
            )));
        }
        let row = session.locked_row(id)?;
        row.balance = balance;
        row.dirty = true;
        Ok(())
    }

    async fn insert(
        &self,
        session: &mut MemorySession,
        owner: &str,
        balance: Decimal,
    ) -> Result<Account, StoreError> {
        if balance < Decimal::ZERO {
            return Err(StoreError::Integrity(format!(
                "negative opening balance {balance}"
            )));
        }

        let id = AccountId::new();
        let row_lock = Arc::new(Mutex::new(()));
        let guard = Arc::clone(&row_lock)
            .try_lock_owned()
            .map_err(|_| StoreError::Integrity(format!("fresh account {id} already locked")))?;

        match self.state.owners.entry(owner.to_string()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Duplicate(format!("owner {owner} already exists")));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(id);
            }
        }

        let slot = Arc::new(AccountSlot {
            owner: owner.to_string(),
            row_lock,
            balance: RwLock::new(balance),
        });

        session.locked.insert(
            id,
            LockedRow {
                slot,
                balance,
                dirty: false,
                _guard: guard,
            },
        );
        session.created.push(id);

        Ok(Account {
            id,
            owner: owner.to_string(),
            balance,
        })
    }

    async fn exists(&self, id: AccountId) -> Result<bool, StoreError> {
        Ok(self.state.accounts.contains_key(&id))
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let Some(slot) = self.slot(id) else {
            return Ok(None);
        };
        let balance = *slot.balance.read().await;
        Ok(Some(Account {
            id,
            owner: slot.owner.clone(),
            balance,
        }))
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<Account>, StoreError> {
        let mut slots: Vec<(AccountId, Arc<AccountSlot>)> = self
            .state
            .accounts
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        slots.sort_by(|(a_id, a), (b_id, b)| a.owner.cmp(&b.owner).then(a_id.cmp(b_id)));

        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);

        let mut accounts = Vec::with_capacity(limit.min(slots.len()));
        for (id, slot) in slots.into_iter().skip(offset).take(limit) {
            let balance = *slot.balance.read().await;
            accounts.push(Account {
                id,
                owner: slot.owner.clone(),
                balance,
            });
        }
        Ok(accounts)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(u64::try_from(self.state.accounts.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl TransactionJournalStore for MemoryStore {
    type Session = MemorySession;

    async fn append(
        &self,
        session: &mut MemorySession,
        account_id: AccountId,
        kind: TransactionType,
        amount: Decimal,
    ) -> Result<JournalEntry, StoreError> {
        if amount <= Decimal::ZERO {
            return Err(StoreError::Integrity(format!(
                "non-positive journal amount {amount}"
            )));
        }
        session.locked_row(account_id)?;

        let entry = JournalEntry {
            id: TransactionId::new(),
            account_id,
            kind,
            amount,
            timestamp: Utc::now(),
        };
        session.entries.push(entry.clone());
        Ok(entry)
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<JournalEntry>, StoreError> {
        if !self.state.accounts.contains_key(&account_id) {
            return Err(StoreError::AccountNotFound(account_id));
        }
        let journal = self.state.journal.read().await;
        Ok(journal
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn list_by_account_locked(
        &self,
        session: &mut MemorySession,
        account_id: AccountId,
    ) -> Result<Vec<JournalEntry>, StoreError> {
        session.locked_row(account_id)?;
        let mut entries: Vec<JournalEntry> = self
            .state
            .journal
            .read()
            .await
            .iter()
            .filter(|entry| entry.account_id == account_id)
            .cloned()
            .collect();
        entries.extend(
            session
                .entries
                .iter()
                .filter(|entry| entry.account_id == account_id)
                .cloned(),
        );
        Ok(entries)
    }

    async fn get_by_id(&self, id: TransactionId) -> Result<Option<JournalEntry>, StoreError> {
        let journal = self.state.journal.read().await;
        Ok(journal.iter().rev().find(|entry| entry.id == id).cloned())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
