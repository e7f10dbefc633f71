//! Storage layer for the Payvault ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions and migrations for Postgres
//! - The storage gateway and store traits, with Postgres and in-process backends
//! - The ledger and account services built on top of them

pub mod entities;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod repositories;
pub mod services;

pub use error::StoreError;
pub use gateway::StorageGateway;
pub use memory::{MemorySession, MemoryStore};
pub use postgres::PostgresGateway;
pub use repositories::{
    AccountLedgerStore, AccountRepository, TransactionJournalStore, TransactionRepository,
};
pub use services::{AccountOperations, AccountService, LedgerOperations, LedgerService, Services};

use payvault_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection sized and bounded by `config`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout())
        .acquire_timeout(config.connect_timeout())
        .sqlx_logging(false);
    Database::connect(options).await
}
