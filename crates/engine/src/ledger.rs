//! Ledger entries.
//!
//! A [`LedgerEntry`] is a single signed posting against an account as part
//! of a [`Transaction`](crate::Transaction). The table is append-only;
//! entries are never updated or deleted, and the postings of one
//! transaction always sum to zero.
//!
//! Amounts are signed cents:
//! - positive values credit the account
//! - negative values debit the account

use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{EngineError, money};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub amount: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Transactions,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// A single signed posting, amount decoded into cents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub amount_cents: i64,
    pub created_at: DateTimeUtc,
}

impl LedgerEntry {
    pub fn new(
        transaction_id: Uuid,
        account_id: Uuid,
        amount_cents: i64,
        created_at: DateTimeUtc,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id,
            account_id,
            amount_cents,
            created_at,
        }
    }
}

impl From<&LedgerEntry> for ActiveModel {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id),
            transaction_id: ActiveValue::Set(entry.transaction_id),
            account_id: ActiveValue::Set(entry.account_id),
            amount: ActiveValue::Set(money::encode(entry.amount_cents)),
            created_at: ActiveValue::Set(entry.created_at),
        }
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            transaction_id: model.transaction_id,
            account_id: model.account_id,
            amount_cents: money::decode(&model.amount)?,
            created_at: model.created_at,
        })
    }
}
