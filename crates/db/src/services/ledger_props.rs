//! Property-based tests for the ledger service on the in-process backend.
//!
//! Properties covered:
//! - Random transfer sequences conserve the total across accounts
//! - Every account reconciles after any sequence of postings and transfers

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::{AccountOperations, AccountService, LedgerOperations, LedgerService};
use crate::memory::MemoryStore;
use payvault_core::ledger::{ErrorKind, TransactionType};

#[derive(Debug, Clone)]
enum Op {
    Post(usize, TransactionType, Decimal),
    Transfer(usize, usize, Decimal),
}

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..50_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn op(accounts: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (
            0..accounts,
            prop_oneof![
                Just(TransactionType::Deposit),
                Just(TransactionType::Withdrawal)
            ],
            amount()
        )
            .prop_map(|(i, kind, amount)| Op::Post(i, kind, amount)),
        (0..accounts, 0..accounts, amount()).prop_map(|(a, b, amount)| Op::Transfer(a, b, amount)),
    ]
}

/// Opening balances for 2 to 4 accounts, with operations over all of them.
fn scenario() -> impl Strategy<Value = (Vec<Decimal>, Vec<Op>)> {
    prop::collection::vec((0i64..100_000i64).prop_map(|c| Decimal::new(c, 2)), 2..5).prop_flat_map(
        |openings| {
            let accounts = openings.len();
            (Just(openings), prop::collection::vec(op(accounts), 0..40))
        },
    )
}

/// Runs `ops` against fresh accounts; returns (expected total, actual total, all consistent).
fn run(openings: &[Decimal], ops: Vec<Op>) -> (Decimal, Decimal, bool) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();

    runtime.block_on(async {
        let store = MemoryStore::new();
        let accounts = AccountService::new(store.clone(), store.clone(), store.clone());
        let ledger = LedgerService::new(store.clone(), store.clone(), store.clone());

        let mut ids = Vec::new();
        for (i, opening) in openings.iter().enumerate() {
            ids.push(accounts.create(&format!("acct-{i}"), *opening).await.unwrap().id);
        }

        let mut expected: Decimal = openings.iter().copied().sum();
        for op in ops {
            match op {
                Op::Post(i, kind, amount) => {
                    match ledger.create(ids[i], kind, amount).await {
                        Ok(_) => expected += kind.signed(amount),
                        Err(e) => assert_eq!(e.kind(), ErrorKind::InvalidInput),
                    }
                }
                Op::Transfer(a, b, amount) => {
                    if let Err(e) = ledger.transfer(ids[a], ids[b], amount).await {
                        assert_eq!(e.kind(), ErrorKind::InvalidInput);
                    }
                }
            }
        }

        let mut actual = Decimal::ZERO;
        let mut consistent = true;
        for id in &ids {
            let report = ledger.reconcile(*id).await.unwrap();
            consistent &= report.is_consistent() && report.balance >= Decimal::ZERO;
            actual += report.balance;
        }
        (expected, actual, consistent)
    })
}

#[test]
fn test_scenarios_reach_every_account() {
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    let mut runner = TestRunner::deterministic();
    let mut max_index = 0;
    for _ in 0..256 {
        let (openings, ops) = scenario().new_tree(&mut runner).unwrap().current();
        for op in &ops {
            let (a, b) = match op {
                Op::Post(i, ..) => (*i, *i),
                Op::Transfer(a, b, _) => (*a, *b),
            };
            assert!(a < openings.len() && b < openings.len());
            max_index = max_index.max(a).max(b);
        }
    }
    assert!(max_index >= 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Transfers never create or destroy money; postings change the total by
    /// exactly their signed amount.
    #[test]
    fn prop_total_tracks_accepted_postings((openings, ops) in scenario()) {
        let (expected, actual, consistent) = run(&openings, ops);
        prop_assert_eq!(expected, actual);
        prop_assert!(consistent);
    }
}
