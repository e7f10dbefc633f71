//! Postgres storage gateway.
//!
//! Each session is a `SeaORM` [`DatabaseTransaction`]. Row lock waits are
//! bounded with `SET LOCAL lock_timeout`, scoped to the transaction, so a
//! blocked `SELECT ... FOR UPDATE` fails with SQLSTATE `55P03` instead of
//! hanging. Dropping an uncommitted transaction rolls it back.

use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::error::StoreError;
use crate::gateway::StorageGateway;

/// Gateway opening Postgres transactions from a connection pool.
#[derive(Debug, Clone)]
pub struct PostgresGateway {
    db: DatabaseConnection,
    lock_timeout: Option<Duration>,
}

impl PostgresGateway {
    /// Creates a gateway without a lock wait limit.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            lock_timeout: None,
        }
    }

    /// Bounds how long a session waits for a row lock.
    #[must_use]
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = Some(lock_timeout);
        self
    }
}

/// Builds the `SET LOCAL` statement bounding row lock waits.
fn lock_timeout_sql(lock_timeout: Duration) -> String {
    format!("SET LOCAL lock_timeout = '{}ms'", lock_timeout.as_millis().max(1))
}

#[async_trait]
impl StorageGateway for PostgresGateway {
    type Session = DatabaseTransaction;

    async fn begin(&self) -> Result<DatabaseTransaction, StoreError> {
        let txn = self.db.begin().await?;
        if let Some(lock_timeout) = self.lock_timeout {
            txn.execute_unprepared(&lock_timeout_sql(lock_timeout))
                .await?;
        }
        Ok(txn)
    }

    async fn commit(&self, session: DatabaseTransaction) -> Result<(), StoreError> {
        session.commit().await?;
        Ok(())
    }

    async fn rollback(&self, session: DatabaseTransaction) -> Result<(), StoreError> {
        session.rollback().await?;
        Ok(())
    }
}
