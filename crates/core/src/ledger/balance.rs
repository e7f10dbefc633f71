//! Reconciliation of a materialized balance against its journal.
//!
//! The stored balance is a cache of journal history. For every account,
//! `balance == sum(deposits) - sum(withdrawals)` must hold after each commit.

use payvault_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{JournalEntry, TransactionType};

/// Journal totals for one account compared to its stored balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Account ID.
    pub account_id: AccountId,
    /// Balance stored on the account row.
    pub balance: Decimal,
    /// Sum of deposit amounts.
    pub total_deposits: Decimal,
    /// Sum of withdrawal amounts.
    pub total_withdrawals: Decimal,
    /// Deposits minus withdrawals.
    pub journal_balance: Decimal,
    /// Number of journal entries considered.
    pub entry_count: usize,
}

impl Reconciliation {
    /// Computes journal totals for `account_id`. Entries for other accounts are ignored.
    #[must_use]
    pub fn compute(account_id: AccountId, balance: Decimal, entries: &[JournalEntry]) -> Self {
        let mut total_deposits = Decimal::ZERO;
        let mut total_withdrawals = Decimal::ZERO;
        let mut entry_count = 0;

        for entry in entries.iter().filter(|e| e.account_id == account_id) {
            match entry.kind {
                TransactionType::Deposit => total_deposits += entry.amount,
                TransactionType::Withdrawal => total_withdrawals += entry.amount,
            }
            entry_count += 1;
        }

        Self {
            account_id,
            balance,
            total_deposits,
            total_withdrawals,
            journal_balance: total_deposits - total_withdrawals,
            entry_count,
        }
    }

    /// True when the stored balance matches the journal.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.balance == self.journal_balance
    }

    /// Stored balance minus journal balance; zero when consistent.
    #[must_use]
    pub fn drift(&self) -> Decimal {
        self.balance - self.journal_balance
    }
}
