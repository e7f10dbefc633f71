//! Account service: opening, reading and listing accounts.

use std::time::Duration;

use async_trait::async_trait;
use payvault_core::ledger::{
    Account, LedgerError, Rejection, TransactionType, normalize_owner, validate_opening_balance,
};
use payvault_shared::types::{AccountId, PageRequest, PageResponse};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use super::{AccountOperations, with_deadline};
use crate::error::StoreError;
use crate::gateway::StorageGateway;
use crate::repositories::{AccountLedgerStore, TransactionJournalStore};

/// Account service over the same gateway and stores as the ledger.
#[derive(Debug, Clone)]
pub struct AccountService<G, A, J> {
    gateway: G,
    accounts: A,
    journal: J,
    operation_timeout: Option<Duration>,
}

impl<G, A, J> AccountService<G, A, J> {
    /// Creates an account service without an operation deadline.
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

#[async_trait]
impl<G, A, J> AccountOperations for AccountService<G, A, J>
where
    G: StorageGateway,
    A: AccountLedgerStore<Session = G::Session> + Clone + 'static,
    J: TransactionJournalStore<Session = G::Session> + Clone + 'static,
{
    async fn create(&self, owner: &str, initial_balance: Decimal) -> Result<Account, LedgerError> {
        let owner = normalize_owner(owner)
            .and_then(|owner| validate_opening_balance(initial_balance).map(|()| owner))
            .inspect_err(|e| warn!(error = %e, "Account creation rejected"))?;

        let accounts = self.accounts.clone();
        let journal = self.journal.clone();
        let opening = self.gateway.with_transaction(move |session| {
            Box::pin(async move {
                let inserted = accounts.insert(session, &owner, initial_balance).await;
                let account = match inserted {
                    Ok(account) => account,
                    Err(StoreError::Duplicate(_)) => {
                        return Err(Rejection::DuplicateOwner(owner).into());
                    }
                    Err(other) => return Err(other.into()),
                };

                // the opening balance is journaled so the account reconciles from day one
                if initial_balance > Decimal::ZERO {
                    journal
                        .append(session, account.id, TransactionType::Deposit, initial_balance)
                        .await?;
                }
                Ok::<_, LedgerError>(account)
            })
        });

        let account = with_deadline(self.operation_timeout, "create_account", opening)
            .await
            .inspect_err(|e| {
                if matches!(e, LedgerError::InvalidInput(_)) {
                    warn!(error = %e, "Account creation rejected");
                } else {
                    error!(error = %e, "Failed to create account");
                }
            })?;

        info!(
            account_id = %account.id,
            owner = %account.owner,
            balance = %account.balance,
            "Account created"
        );
        Ok(account)
    }

    async fn get(&self, id: AccountId) -> Result<Account, LedgerError> {
        let lookup = async {
            self.accounts
                .get(id)
                .await?
                .ok_or(LedgerError::AccountNotFound(id))
        };
        with_deadline(self.operation_timeout, "get_account", lookup).await
    }

    async fn list(&self, page: PageRequest) -> Result<PageResponse<Account>, LedgerError> {
        let page = page.normalized();
        let listing = async {
            let data = self.accounts.list(page).await?;
            let total = self.accounts.count().await?;
            Ok::<_, LedgerError>(PageResponse::new(data, page, total))
        };
        with_deadline(self.operation_timeout, "list_accounts", listing)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to list accounts"))
    }
}

#[cfg(test)]
#[path = "account_tests.rs"]
mod tests;
