//! Database migration runner for Payvault.
//!
//! Usage:
//!   migrator up      - Apply the ledger schema
//!   migrator down    - Roll back the last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations
//!
//! Reads `DATABASE_URL` from the environment or `.env`.

use sea_orm_migration::prelude::*;
use payvault_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // the CLI sets up its own tracing
    cli::run_cli(Migrator).await;
}
