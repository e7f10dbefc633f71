//! Property-based tests for posting arithmetic and reconciliation.
//!
//! Properties covered:
//! - No overdraft: any sequence of accepted postings keeps the balance >= 0
//! - Reconciliation: accepted postings, journaled, always sum to the balance
//! - Conservation: a debit/credit pair moves value without creating any
//! - Lock ordering is independent of direction
//! - Arbitrary decimals are rejected, never overflowed into a panic

use chrono::Utc;
use payvault_shared::types::{AccountId, TransactionId};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::balance::Reconciliation;
use super::error::{LedgerError, Rejection};
use super::types::{JournalEntry, TransactionType};
use super::validation::{MAX_AMOUNT, apply_posting, lock_order, validate_transfer};

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    // 0.01 to 10,000.00
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a deposit or withdrawal.
fn kind_strategy() -> impl Strategy<Value = TransactionType> {
    prop_oneof![Just(TransactionType::Deposit), Just(TransactionType::Withdrawal)]
}

/// Any representable decimal, including the extremes.
fn any_decimal() -> impl Strategy<Value = Decimal> {
    (any::<u32>(), any::<u32>(), any::<u32>(), any::<bool>(), 0u32..=28)
        .prop_map(|(lo, mid, hi, negative, scale)| Decimal::from_parts(lo, mid, hi, negative, scale))
}

fn account_id() -> impl Strategy<Value = AccountId> {
    any::<u128>().prop_map(|n| AccountId::from_uuid(Uuid::from_u128(n)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any sequence of postings, with rejected ones skipped, never drives the
    /// balance below zero.
    #[test]
    fn prop_no_overdraft(
        opening in positive_amount(),
        postings in prop::collection::vec((kind_strategy(), positive_amount()), 0..50),
    ) {
        let mut balance = opening;
        for (kind, amount) in postings {
            match apply_posting(balance, kind, amount) {
                Ok(next) => balance = next,
                Err(LedgerError::InvalidInput(Rejection::InsufficientFunds { available, requested })) => {
                    prop_assert_eq!(kind, TransactionType::Withdrawal);
                    prop_assert_eq!(available, balance);
                    prop_assert!(requested > available);
                }
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
            prop_assert!(balance >= Decimal::ZERO);
        }
    }

    /// Journaling exactly the accepted postings keeps the balance reconciled.
    #[test]
    fn prop_accepted_postings_reconcile(
        postings in prop::collection::vec((kind_strategy(), positive_amount()), 0..50),
    ) {
        let account = AccountId::new();
        let mut balance = Decimal::ZERO;
        let mut journal = Vec::new();

        for (kind, amount) in postings {
            if let Ok(next) = apply_posting(balance, kind, amount) {
                balance = next;
                journal.push(JournalEntry {
                    id: TransactionId::new(),
                    account_id: account,
                    kind,
                    amount,
                    timestamp: Utc::now(),
                });
            }
            let rec = Reconciliation::compute(account, balance, &journal);
            prop_assert!(rec.is_consistent(), "drift {}", rec.drift());
        }
    }

    /// A transfer expressed as withdrawal + deposit preserves the pair's total.
    #[test]
    fn prop_transfer_conserves_value(
        from_balance in positive_amount(),
        to_balance in positive_amount(),
        amount in positive_amount(),
    ) {
        let debited = apply_posting(from_balance, TransactionType::Withdrawal, amount);
        match debited {
            Ok(new_from) => {
                let new_to = apply_posting(to_balance, TransactionType::Deposit, amount).unwrap();
                prop_assert_eq!(new_from + new_to, from_balance + to_balance);
                prop_assert_eq!(from_balance - new_from, amount);
                prop_assert_eq!(new_to - to_balance, amount);
            }
            Err(_) => prop_assert!(amount > from_balance),
        }
    }

    /// Whatever the inputs, a posting either fails cleanly or lands inside the storable range.
    #[test]
    fn prop_posting_never_leaves_storable_range(
        balance in (0i64..=i64::MAX).prop_map(|raw| Decimal::new(raw, 4).min(MAX_AMOUNT)),
        kind in kind_strategy(),
        amount in any_decimal(),
    ) {
        if let Ok(next) = apply_posting(balance, kind, amount) {
            prop_assert!(next >= Decimal::ZERO);
            prop_assert!(next <= MAX_AMOUNT);
        }
    }

    /// Lock order is the same regardless of which side is the source.
    #[test]
    fn prop_lock_order_symmetric(a in account_id(), b in account_id()) {
        let forward = lock_order(a, b);
        let backward = lock_order(b, a);
        prop_assert_eq!(forward, backward);
        prop_assert!(forward[0] <= forward[1]);
    }

    /// Distinct accounts with a positive amount always pass transfer validation.
    #[test]
    fn prop_valid_transfer_accepted(a in account_id(), b in account_id(), amount in positive_amount()) {
        prop_assume!(a != b);
        prop_assert!(validate_transfer(a, b, amount).is_ok());
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_concrete_scenario_arithmetic() {
        let x = apply_posting(dec!(100), TransactionType::Withdrawal, dec!(30)).unwrap();
        assert_eq!(x, dec!(70));
        let x = apply_posting(x, TransactionType::Deposit, dec!(50)).unwrap();
        assert_eq!(x, dec!(120));
        let x = apply_posting(x, TransactionType::Withdrawal, dec!(120)).unwrap();
        assert_eq!(x, dec!(0));
        assert!(apply_posting(x, TransactionType::Withdrawal, dec!(1)).is_err());
    }
}
