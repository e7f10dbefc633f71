//! Journal repository backed by the append-only `transactions` table.

use async_trait::async_trait;
use payvault_core::ledger::{JournalEntry, TransactionType};
use payvault_shared::types::{AccountId, TransactionId};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select, Set,
};

use super::TransactionJournalStore;
use crate::entities::{accounts, transactions};
use crate::error::StoreError;

/// Transaction journal repository for `SeaORM` on Postgres.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Entries of one account in insertion order.
fn history(account_id: AccountId) -> Select<transactions::Entity> {
    transactions::Entity::find()
        .filter(transactions::Column::AccountId.eq(account_id.into_inner()))
        .order_by_asc(transactions::Column::CreatedAt)
        .order_by_asc(transactions::Column::Id)
}

impl From<transactions::Model> for JournalEntry {
    fn from(model: transactions::Model) -> Self {
        Self {
            id: TransactionId::from_uuid(model.id),
            account_id: AccountId::from_uuid(model.account_id),
            kind: model.kind.into(),
            amount: model.amount,
            timestamp: model.created_at.to_utc(),
        }
    }
}

#[async_trait]
impl TransactionJournalStore for TransactionRepository {
    type Session = DatabaseTransaction;

    async fn append(
        &self,
        session: &mut DatabaseTransaction,
        account_id: AccountId,
        kind: TransactionType,
        amount: Decimal,
    ) -> Result<JournalEntry, StoreError> {
        // id defaults to gen_random_uuid(), created_at to clock_timestamp()
        let model = transactions::ActiveModel {
            account_id: Set(account_id.into_inner()),
            kind: Set(kind.into()),
            amount: Set(amount),
            ..Default::default()
        };

        let inserted = model.insert(&*session).await?;
        Ok(inserted.into())
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<JournalEntry>, StoreError> {
        let exists = accounts::Entity::find_by_id(account_id.into_inner())
            .count(&self.db)
            .await?
            > 0;
        if !exists {
            return Err(StoreError::AccountNotFound(account_id));
        }

        let models = history(account_id).all(&self.db).await?;
        Ok(models.into_iter().map(JournalEntry::from).collect())
    }

    async fn list_by_account_locked(
        &self,
        session: &mut DatabaseTransaction,
        account_id: AccountId,
    ) -> Result<Vec<JournalEntry>, StoreError> {
        let models = history(account_id).all(&*session).await?;
        Ok(models.into_iter().map(JournalEntry::from).collect())
    }

    async fn get_by_id(&self, id: TransactionId) -> Result<Option<JournalEntry>, StoreError> {
        let model = transactions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?;
        Ok(model.map(JournalEntry::from))
    }
}
