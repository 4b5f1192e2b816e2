use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{Account, Currency, EngineError, ResultEngine, accounts, money};

use super::Engine;

impl Engine {
    /// Returns all accounts of a user, ordered by currency code.
    pub async fn accounts_for_user(&self, user_id: Uuid) -> ResultEngine<Vec<Account>> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_asc(accounts::Column::Currency)
            .all(&self.database)
            .await?;
        models.into_iter().map(Account::try_from).collect()
    }

    pub async fn account_by_id(&self, id: Uuid) -> ResultEngine<Account> {
        let model = accounts::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or(EngineError::AccountNotFound)?;
        Account::try_from(model)
    }

    pub async fn account_by_user_and_currency(
        &self,
        user_id: Uuid,
        currency: Currency,
    ) -> ResultEngine<Account> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .filter(accounts::Column::Currency.eq(currency.code()))
            .one(&self.database)
            .await?
            .ok_or(EngineError::AccountNotFound)?;
        Account::try_from(model)
    }

    /// Inserts a zero-balance account inside an open unit of work. The
    /// storage layer rejects a second account for the same (user, currency).
    pub(crate) async fn insert_account(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
        currency: Currency,
    ) -> ResultEngine<Uuid> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        accounts::ActiveModel {
            id: ActiveValue::Set(id),
            user_id: ActiveValue::Set(user_id),
            currency: ActiveValue::Set(currency.code().to_string()),
            balance: ActiveValue::Set(money::encode(0)),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        }
        .insert(db_tx)
        .await?;
        Ok(id)
    }

    /// Non-locking account-id lookup inside an open unit of work.
    pub(crate) async fn find_account_id(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
        currency: Currency,
    ) -> ResultEngine<Uuid> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .filter(accounts::Column::Currency.eq(currency.code()))
            .one(db_tx)
            .await?
            .ok_or(EngineError::AccountNotFound)?;
        Ok(model.id)
    }

    /// Takes a row-exclusive lock on the account and returns a fresh
    /// snapshot. Blocks concurrent lockers until the enclosing unit of work
    /// ends.
    pub(crate) async fn lock_account(
        &self,
        db_tx: &DatabaseTransaction,
        id: Uuid,
    ) -> ResultEngine<Account> {
        let model = accounts::Entity::find_by_id(id)
            .lock_exclusive()
            .one(db_tx)
            .await?
            .ok_or(EngineError::AccountNotFound)?;
        Account::try_from(model)
    }

    /// Writes the canonical decimal form of the new balance and stamps
    /// `updated_at`.
    pub(crate) async fn update_balance(
        &self,
        db_tx: &DatabaseTransaction,
        id: Uuid,
        new_balance_cents: i64,
    ) -> ResultEngine<()> {
        let model = accounts::ActiveModel {
            id: ActiveValue::Set(id),
            balance: ActiveValue::Set(money::encode(new_balance_cents)),
            updated_at: ActiveValue::Set(Utc::now()),
            ..Default::default()
        };
        model.update(db_tx).await?;
        Ok(())
    }
}
