//! Concurrency tests for the ledger on the in-process backend.
//!
//! These verify that:
//! - Concurrent postings on one account serialize without lost updates
//! - Overdrafts are impossible under contention
//! - Opposing transfers between two accounts never deadlock
//! - Money is conserved across a storm of random transfers

#![allow(clippy::cast_possible_truncation)]

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use payvault_core::ledger::{LedgerError, Rejection, TransactionType};
use payvault_db::{
    AccountLedgerStore, AccountOperations, AccountService, LedgerOperations, LedgerService,
    MemoryStore, Services, StorageGateway,
};
use payvault_shared::config::{DatabaseConfig, LedgerConfig, StorageBackend};
use payvault_shared::types::AccountId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

fn memory_services() -> Services {
    let database = DatabaseConfig {
        backend: StorageBackend::Memory,
        ..DatabaseConfig::default()
    };
    Services::memory(&database, &LedgerConfig::default())
}

async fn open(services: &Services, owner: &str, balance: Decimal) -> AccountId {
    services.accounts.create(owner, balance).await.unwrap().id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_all_land() {
    const TASKS: usize = 100;

    let services = memory_services();
    let id = open(&services, "alice", dec!(0)).await;
    let barrier = Arc::new(Barrier::new(TASKS));

    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let ledger = Arc::clone(&services.ledger);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                ledger.create(id, TransactionType::Deposit, dec!(10)).await
            })
        })
        .collect();

    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    let account = services.accounts.get(id).await.unwrap();
    assert_eq!(account.balance, dec!(1000));
    let history = services.ledger.list_by_account(id).await.unwrap();
    assert_eq!(history.len(), TASKS);
    assert!(services.ledger.reconcile(id).await.unwrap().is_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() {
    const TASKS: usize = 50;

    let services = memory_services();
    let id = open(&services, "alice", dec!(100)).await;
    let barrier = Arc::new(Barrier::new(TASKS));

    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let ledger = Arc::clone(&services.ledger);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                ledger.create(id, TransactionType::Withdrawal, dec!(7)).await
            })
        })
        .collect();

    let mut succeeded = 0_u32;
    for result in join_all(handles).await {
        match result.unwrap() {
            Ok(_) => succeeded += 1,
            Err(LedgerError::InvalidInput(Rejection::InsufficientFunds { .. })) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    // 14 * 7 = 98 fits, the 15th would overdraw
    assert_eq!(succeeded, 14);
    let account = services.accounts.get(id).await.unwrap();
    assert_eq!(account.balance, dec!(2));
    assert!(services.ledger.reconcile(id).await.unwrap().is_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposing_transfers_do_not_deadlock() {
    const ROUNDS: usize = 200;

    let services = memory_services();
    let a = open(&services, "alice", dec!(1000)).await;
    let b = open(&services, "bob", dec!(1000)).await;

    let handles: Vec<_> = (0..ROUNDS)
        .map(|i| {
            let ledger = Arc::clone(&services.ledger);
            let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
            tokio::spawn(async move { ledger.transfer(from, to, dec!(1)).await })
        })
        .collect();

    let results = tokio::time::timeout(Duration::from_secs(10), join_all(handles))
        .await
        .expect("opposing transfers deadlocked");
    for result in results {
        result.unwrap().unwrap();
    }

    let total = services.accounts.get(a).await.unwrap().balance
        + services.accounts.get(b).await.unwrap().balance;
    assert_eq!(total, dec!(2000));
    // equal numbers each way
    assert_eq!(services.accounts.get(a).await.unwrap().balance, dec!(1000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_transfer_storm_conserves_money() {
    const ACCOUNTS: usize = 5;
    const TRANSFERS: usize = 300;

    let services = memory_services();
    let mut ids = Vec::with_capacity(ACCOUNTS);
    for i in 0..ACCOUNTS {
        ids.push(open(&services, &format!("owner-{i}"), dec!(100)).await);
    }
    let ids = Arc::new(ids);

    let handles: Vec<_> = (0..TRANSFERS)
        .map(|i| {
            let ledger = Arc::clone(&services.ledger);
            let ids = Arc::clone(&ids);
            tokio::spawn(async move {
                let from = ids[i % ACCOUNTS];
                let to = ids[(i * 7 + 1) % ACCOUNTS];
                let amount = Decimal::from((i % 40) as u32 + 1);
                if from == to {
                    return Ok(None);
                }
                match ledger.transfer(from, to, amount).await {
                    Ok(result) => Ok(Some(result)),
                    Err(LedgerError::InvalidInput(Rejection::InsufficientFunds { .. })) => {
                        Ok(None)
                    }
                    Err(other) => Err(other),
                }
            })
        })
        .collect();

    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    let mut total = Decimal::ZERO;
    for id in ids.iter() {
        let account = services.accounts.get(*id).await.unwrap();
        assert!(account.balance >= Decimal::ZERO);
        let report = services.ledger.reconcile(*id).await.unwrap();
        assert!(report.is_consistent(), "drift on {id}: {}", report.drift());
        total += account.balance;
    }
    assert_eq!(total, dec!(500));
}

#[tokio::test]
async fn test_lock_timeout_surfaces_as_unavailable() {
    let store = MemoryStore::new().with_lock_timeout(Duration::from_millis(20));
    let accounts = AccountService::new(store.clone(), store.clone(), store.clone());
    let ledger = LedgerService::new(store.clone(), store.clone(), store.clone());
    let a = accounts.create("alice", dec!(10)).await.unwrap().id;
    let b = accounts.create("bob", dec!(10)).await.unwrap().id;

    let mut holder = store.begin().await.unwrap();
    store.lock_account_by_id(&mut holder, b).await.unwrap();

    let err = ledger.transfer(a, b, dec!(5)).await.unwrap_err();
    assert!(err.is_retryable(), "expected retryable error, got {err}");
    // nothing was applied to the source account
    assert_eq!(accounts.get(a).await.unwrap().balance, dec!(10));

    drop(holder);
    let transfer = ledger.transfer(a, b, dec!(5)).await.unwrap();
    assert_eq!(transfer.from_balance, dec!(5));
    assert_eq!(transfer.to_balance, dec!(15));
}
