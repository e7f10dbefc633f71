//! Ledger service: atomic postings and transfers.
//!
//! Every balance change runs in a single storage session that locks the
//! affected account rows, checks funds against the locked balance, writes the
//! new balance and appends the journal entry. Any failure drops the session,
//! so either all of an operation is committed or none of it is.

use std::time::Duration;

use async_trait::async_trait;
use payvault_core::ledger::{
    ErrorKind, JournalEntry, LedgerError, Reconciliation, TransactionType, TransferResult,
    apply_posting, lock_order, validate_amount, validate_transfer,
};
use payvault_shared::types::{AccountId, TransactionId};
use rust_decimal::Decimal;
use tracing::{Level, error, info, warn};

use super::{LedgerOperations, with_deadline};
use crate::gateway::StorageGateway;
use crate::repositories::{AccountLedgerStore, TransactionJournalStore};

/// Ledger service over a gateway `G`, an account store `A` and a journal `J`
/// sharing one session type.
#[derive(Debug, Clone)]
pub struct LedgerService<G, A, J> {
    gateway: G,
    accounts: A,
    journal: J,
    operation_timeout: Option<Duration>,
}

impl<G, A, J> LedgerService<G, A, J> {
    /// Creates a ledger service without an operation deadline.
    #[must_use]
    pub const fn new(gateway: G, accounts: A, journal: J) -> Self {
        Self {
            gateway,
            accounts,
            journal,
            operation_timeout: None,
        }
    }

    /// Sets the deadline applied to each operation. `None` disables it.
    #[must_use]
    pub fn with_operation_timeout(mut self, operation_timeout: Option<Duration>) -> Self {
        self.operation_timeout = operation_timeout;
        self
    }
}

/// Level a failed operation is logged at: warn for caller-side and transient
/// failures, error for storage faults and integrity conflicts.
fn failure_level(err: &LedgerError) -> Level {
    match err.kind() {
        ErrorKind::InvalidInput | ErrorKind::NotFound | ErrorKind::Unavailable => Level::WARN,
        ErrorKind::Conflict | ErrorKind::Internal => Level::ERROR,
    }
}

/// Logs a failed operation at a level matching its kind.
fn log_failure(operation: &'static str, err: &LedgerError) {
    if failure_level(err) == Level::ERROR {
        error!(operation, error = %err, "ledger operation failed");
    } else if err.is_retryable() {
        warn!(operation, error = %err, "ledger operation unavailable");
    } else {
        warn!(operation, error = %err, "ledger operation rejected");
    }
}

#[async_trait]
impl<G, A, J> LedgerOperations for LedgerService<G, A, J>
where
    G: StorageGateway,
    A: AccountLedgerStore<Session = G::Session> + Clone + 'static,
    J: TransactionJournalStore<Session = G::Session> + Clone + 'static,
{
    async fn create(
        &self,
        account_id: AccountId,
        kind: TransactionType,
        amount: Decimal,
    ) -> Result<JournalEntry, LedgerError> {
        validate_amount(amount).inspect_err(|e| log_failure("create", e))?;

        let accounts = self.accounts.clone();
        let journal = self.journal.clone();
        let posting = self.gateway.with_transaction(move |session| {
            Box::pin(async move {
                let account = accounts.lock_account_by_id(session, account_id).await?;
                let balance = apply_posting(account.balance, kind, amount)?;
                accounts.update_balance(session, account_id, balance).await?;
                let entry = journal.append(session, account_id, kind, amount).await?;
                Ok::<_, LedgerError>((entry, balance))
            })
        });

        let (entry, balance) = with_deadline(self.operation_timeout, "create", posting)
            .await
            .inspect_err(|e| log_failure("create", e))?;

        info!(
            account_id = %account_id,
            transaction_id = %entry.id,
            kind = %kind,
            amount = %amount,
            balance = %balance,
            "Transaction posted"
        );
        Ok(entry)
    }

    async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<TransferResult, LedgerError> {
        validate_transfer(from, to, amount).inspect_err(|e| log_failure("transfer", e))?;

        let accounts = self.accounts.clone();
        let journal = self.journal.clone();
        let moving = self.gateway.with_transaction(move |session| {
            Box::pin(async move {
                // 1. Lock both rows in ascending id order
                let [first, second] = lock_order(from, to);
                let first_row = accounts.lock_account_by_id(session, first).await?;
                let second_row = accounts.lock_account_by_id(session, second).await?;
                let (source, destination) = if first == from {
                    (first_row, second_row)
                } else {
                    (second_row, first_row)
                };

                // 2. Check funds against the locked balance
                let from_balance =
                    apply_posting(source.balance, TransactionType::Withdrawal, amount)?;
                let to_balance =
                    apply_posting(destination.balance, TransactionType::Deposit, amount)?;

                // 3. Write both balances and both journal entries
                accounts.update_balance(session, from, from_balance).await?;
                accounts.update_balance(session, to, to_balance).await?;
                let withdrawal = journal
                    .append(session, from, TransactionType::Withdrawal, amount)
                    .await?;
                let deposit = journal
                    .append(session, to, TransactionType::Deposit, amount)
                    .await?;

                Ok::<_, LedgerError>(TransferResult {
                    from_account_id: from,
                    to_account_id: to,
                    amount,
                    withdrawal_id: withdrawal.id,
                    deposit_id: deposit.id,
                    from_balance,
                    to_balance,
                })
            })
        });

        let result = with_deadline(self.operation_timeout, "transfer", moving)
            .await
            .inspect_err(|e| log_failure("transfer", e))?;

        info!(
            from = %from,
            to = %to,
            amount = %amount,
            withdrawal_id = %result.withdrawal_id,
            deposit_id = %result.deposit_id,
            "Transfer committed"
        );
        Ok(result)
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<JournalEntry>, LedgerError> {
        let listing = async {
            if !self.accounts.exists(account_id).await? {
                return Err(LedgerError::AccountNotFound(account_id));
            }
            Ok(self.journal.list_by_account(account_id).await?)
        };

        with_deadline(self.operation_timeout, "list_by_account", listing)
            .await
            .inspect_err(|e| log_failure("list_by_account", e))
    }

    async fn get_by_id(&self, id: TransactionId) -> Result<JournalEntry, LedgerError> {
        let lookup = async {
            self.journal
                .get_by_id(id)
                .await?
                .ok_or(LedgerError::TransactionNotFound(id))
        };

        with_deadline(self.operation_timeout, "get_by_id", lookup)
            .await
            .inspect_err(|e| log_failure("get_by_id", e))
    }

    async fn reconcile(&self, account_id: AccountId) -> Result<Reconciliation, LedgerError> {
        let accounts = self.accounts.clone();
        let journal = self.journal.clone();
        // the row lock keeps writers out while the journal is summed
        let check = self.gateway.with_transaction(move |session| {
            Box::pin(async move {
                let account = accounts.lock_account_by_id(session, account_id).await?;
                let entries = journal.list_by_account_locked(session, account_id).await?;
                Ok::<_, LedgerError>(Reconciliation::compute(
                    account_id,
                    account.balance,
                    &entries,
                ))
            })
        });

        let report = with_deadline(self.operation_timeout, "reconcile", check)
            .await
            .inspect_err(|e| log_failure("reconcile", e))?;

        if !report.is_consistent() {
            error!(
                account_id = %account_id,
                balance = %report.balance,
                journal_balance = %report.journal_balance,
                drift = %report.drift(),
                "Balance does not match journal"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
