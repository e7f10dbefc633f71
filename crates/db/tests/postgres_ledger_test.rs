//! Ledger tests against a real Postgres database.
//!
//! Set `DATABASE_URL` (or `PAYVAULT__DATABASE__URL`) to run them; without it
//! every test returns early. Migrations are applied on first connect and
//! owners are randomized so runs do not collide.

#![allow(clippy::items_after_statements)]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use payvault_core::ledger::{ErrorKind, LedgerError, Rejection, TransactionType};
use payvault_db::migration::{Migrator, MigratorTrait};
use payvault_db::{
    AccountLedgerStore, AccountOperations, AccountRepository, LedgerOperations, PostgresGateway,
    Services, StorageGateway, StoreError,
};
use payvault_shared::config::{DatabaseConfig, LedgerConfig};
use rust_decimal_macros::dec;
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;
use uuid::Uuid;

static MIGRATED: OnceCell<bool> = OnceCell::const_new();

fn get_database_url() -> Option<String> {
    env::var("DATABASE_URL")
        .or_else(|_| env::var("PAYVAULT__DATABASE__URL"))
        .ok()
}

async fn setup() -> Option<(DatabaseConnection, Services)> {
    let Some(url) = get_database_url() else {
        eprintln!("Skipping test - DATABASE_URL not set");
        return None;
    };
    let config = DatabaseConfig {
        url,
        lock_timeout_ms: 2_000,
        ..DatabaseConfig::default()
    };
    let db = match payvault_db::connect_with(&config).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Skipping test - database not available: {e}");
            return None;
        }
    };
    let conn = &db;
    let migrated = MIGRATED
        .get_or_init(|| async move {
            Migrator::up(conn, None)
                .await
                .inspect_err(|e| eprintln!("Skipping test - migration failed: {e}"))
                .is_ok()
        })
        .await;
    if !*migrated {
        return None;
    }
    let services = Services::postgres(db.clone(), &config, &LedgerConfig::default());
    Some((db, services))
}

fn unique_owner(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_posting_sequence_against_postgres() {
    let Some((_db, services)) = setup().await else {
        return;
    };
    let account = services
        .accounts
        .create(&unique_owner("seq"), dec!(100))
        .await
        .unwrap();
    let id = account.id;

    services
        .ledger
        .create(id, TransactionType::Withdrawal, dec!(30))
        .await
        .unwrap();
    services
        .ledger
        .create(id, TransactionType::Deposit, dec!(50))
        .await
        .unwrap();
    services
        .ledger
        .create(id, TransactionType::Withdrawal, dec!(120))
        .await
        .unwrap();
    let err = services
        .ledger
        .create(id, TransactionType::Withdrawal, dec!(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidInput(Rejection::InsufficientFunds { .. })
    ));

    assert_eq!(services.accounts.get(id).await.unwrap().balance, dec!(0));
    let history = services.ledger.list_by_account(id).await.unwrap();
    assert_eq!(history.len(), 4);
    assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(services.ledger.reconcile(id).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_transfer_against_postgres() {
    let Some((_db, services)) = setup().await else {
        return;
    };
    let a = services
        .accounts
        .create(&unique_owner("from"), dec!(75.5))
        .await
        .unwrap()
        .id;
    let b = services
        .accounts
        .create(&unique_owner("to"), dec!(0))
        .await
        .unwrap()
        .id;

    let result = services.ledger.transfer(a, b, dec!(25.25)).await.unwrap();
    assert_eq!(result.from_balance, dec!(50.25));
    assert_eq!(result.to_balance, dec!(25.25));

    let deposit = services.ledger.get_by_id(result.deposit_id).await.unwrap();
    assert_eq!(deposit.account_id, b);
    assert_eq!(deposit.amount, dec!(25.25));

    let err = services.ledger.transfer(a, b, dec!(1000)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(services.accounts.get(a).await.unwrap().balance, dec!(50.25));
}

#[tokio::test]
async fn test_duplicate_owner_against_postgres() {
    let Some((_db, services)) = setup().await else {
        return;
    };
    let owner = unique_owner("dup");
    services.accounts.create(&owner, dec!(0)).await.unwrap();
    let err = services.accounts.create(&owner, dec!(0)).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidInput(Rejection::DuplicateOwner(_))
    ));
}

#[tokio::test]
async fn test_missing_account_against_postgres() {
    let Some((_db, services)) = setup().await else {
        return;
    };
    let ghost = payvault_shared::types::AccountId::new();
    let err = services
        .ledger
        .create(ghost, TransactionType::Deposit, dec!(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = services.ledger.list_by_account(ghost).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_against_postgres() {
    let Some((_db, services)) = setup().await else {
        return;
    };
    const TASKS: usize = 50;
    let id = services
        .accounts
        .create(&unique_owner("conc"), dec!(0))
        .await
        .unwrap()
        .id;

    let handles: Vec<_> = (0..TASKS)
        .map(|_| {
            let ledger = Arc::clone(&services.ledger);
            tokio::spawn(async move { ledger.create(id, TransactionType::Deposit, dec!(2)).await })
        })
        .collect();
    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    assert_eq!(services.accounts.get(id).await.unwrap().balance, dec!(100));
    assert!(services.ledger.reconcile(id).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_lock_timeout_against_postgres() {
    let Some((db, services)) = setup().await else {
        return;
    };
    let id = services
        .accounts
        .create(&unique_owner("lock"), dec!(10))
        .await
        .unwrap()
        .id;

    let gateway = PostgresGateway::new(db.clone()).with_lock_timeout(Duration::from_millis(50));
    let repo = AccountRepository::new(db);

    let mut holder = gateway.begin().await.unwrap();
    repo.lock_account_by_id(&mut holder, id).await.unwrap();

    let mut waiter = gateway.begin().await.unwrap();
    let err = repo.lock_account_by_id(&mut waiter, id).await.unwrap_err();
    assert!(matches!(err, StoreError::LockTimeout(_)), "got {err:?}");

    gateway.rollback(waiter).await.unwrap();
    gateway.rollback(holder).await.unwrap();
}

#[tokio::test]
async fn test_reconcile_on_single_connection_pool() {
    let Some((_db, _services)) = setup().await else {
        return;
    };
    let Some(url) = get_database_url() else {
        return;
    };
    let config = DatabaseConfig {
        url,
        max_connections: 1,
        min_connections: 1,
        connect_timeout_secs: 2,
        ..DatabaseConfig::default()
    };
    let db = payvault_db::connect_with(&config).await.unwrap();
    let services = Services::postgres(db, &config, &LedgerConfig::default());

    let id = services
        .accounts
        .create(&unique_owner("single"), dec!(25))
        .await
        .unwrap()
        .id;
    services
        .ledger
        .create(id, TransactionType::Withdrawal, dec!(5))
        .await
        .unwrap();

    let report = services.ledger.reconcile(id).await.unwrap();
    assert!(report.is_consistent());
    assert_eq!(report.balance, dec!(20));
    assert_eq!(report.entry_count, 2);
}
