//! Storage gateway: session lifecycle for ledger operations.
//!
//! A session is one atomic unit of work. Row locks taken through a session
//! are held until it commits or rolls back. Dropping a session without
//! committing rolls it back, so a cancelled operation leaves no trace.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::error::StoreError;

/// Boxed future borrowed from a session for `'s`.
pub type SessionFuture<'s, T> = Pin<Box<dyn Future<Output = T> + Send + 's>>;

/// Opens, commits, and rolls back storage sessions.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Backend-specific session handle.
    type Session: Send;

    /// Starts a session.
    async fn begin(&self) -> Result<Self::Session, StoreError>;

    /// Makes every write staged in `session` durable and releases its locks.
    async fn commit(&self, session: Self::Session) -> Result<(), StoreError>;

    /// Discards every write staged in `session` and releases its locks.
    async fn rollback(&self, session: Self::Session) -> Result<(), StoreError>;

    /// Runs `f` inside a fresh session.
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err`. A
    /// rollback failure is logged and the original error is returned.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`, or a begin/commit failure.
    async fn with_transaction<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut Self::Session) -> SessionFuture<'s, Result<T, E>> + Send,
        T: Send,
        E: From<StoreError> + Send,
    {
        let mut session = self.begin().await?;
        match f(&mut session).await {
            Ok(value) => {
                self.commit(session).await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback(session).await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
