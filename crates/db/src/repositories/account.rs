//! Account repository backed by the `accounts` table.

use async_trait::async_trait;
use payvault_core::ledger::Account;
use payvault_shared::types::{AccountId, PageRequest};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use super::AccountLedgerStore;
use crate::entities::accounts;
use crate::error::StoreError;

/// Account repository for `SeaORM` on Postgres.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: AccountId::from_uuid(model.id),
            owner: model.owner,
            balance: model.balance,
        }
    }
}

#[async_trait]
impl AccountLedgerStore for AccountRepository {
    type Session = DatabaseTransaction;

    async fn lock_account_by_id(
        &self,
        session: &mut DatabaseTransaction,
        id: AccountId,
    ) -> Result<Account, StoreError> {
        // SELECT ... FOR UPDATE, limited to two rows so a duplicate shows up.
        let mut rows = accounts::Entity::find_by_id(id.into_inner())
            .limit(2)
            .lock_exclusive()
            .all(&*session)
            .await?;

        match rows.len() {
            0 => Err(StoreError::AccountNotFound(id)),
            1 => Ok(rows.remove(0).into()),
            n => Err(StoreError::Integrity(format!(
                "{n} rows share account id {id}"
            ))),
        }
    }

    async fn update_balance(
        &self,
        session: &mut DatabaseTransaction,
        id: AccountId,
        balance: Decimal,
    ) -> Result<(), StoreError> {
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::Balance,
                sea_orm::sea_query::Expr::value(balance),
            )
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .exec(&*session)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::AccountNotFound(id));
        }
        Ok(())
    }

    async fn insert(
        &self,
        session: &mut DatabaseTransaction,
        owner: &str,
        balance: Decimal,
    ) -> Result<Account, StoreError> {
        // id and timestamps come from column defaults via RETURNING
        let model = accounts::ActiveModel {
            owner: Set(owner.to_string()),
            balance: Set(balance),
            ..Default::default()
        };

        let inserted = model.insert(&*session).await?;
        Ok(inserted.into())
    }

    async fn exists(&self, id: AccountId) -> Result<bool, StoreError> {
        let count = accounts::Entity::find_by_id(id.into_inner())
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let model = accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?;
        Ok(model.map(Account::from))
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<Account>, StoreError> {
        let models = accounts::Entity::find()
            .order_by_asc(accounts::Column::Owner)
            .order_by_asc(accounts::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(accounts::Entity::find().count(&self.db).await?)
    }
}
