//! Transaction primitives.
//!
//! A `Transaction` is an immutable record of one committed engine operation.
//! Its monetary effect lives entirely in the paired ledger entries; the row
//! itself carries the human-facing description and, for exchanges, the
//! reported rate and converted amount.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, money};

/// The type of a financial transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    #[sea_orm(string_value = "transfer")]
    Transfer,
    #[sea_orm(string_value = "exchange")]
    Exchange,
}

impl TransactionKind {
    /// Returns the string representation used in the database.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Exchange => "exchange",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "transfer" => Ok(Self::Transfer),
            "exchange" => Ok(Self::Exchange),
            other => Err(EngineError::BadRequest(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub kind: TransactionKind,
    pub from_account_id: Option<Uuid>,
    pub to_account_id: Uuid,
    pub amount: String,
    pub currency: String,
    pub exchange_rate: Option<f64>,
    pub converted_amount: Option<String>,
    pub description: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ledger::Entity")]
    Ledger,
}

impl Related<super::ledger::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ledger.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Committed transaction with amounts decoded into cents.
#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    pub from_account_id: Option<Uuid>,
    pub to_account_id: Uuid,
    pub amount_cents: i64,
    pub currency: Currency,
    pub exchange_rate: Option<f64>,
    pub converted_amount_cents: Option<i64>,
    pub description: String,
    pub created_at: DateTimeUtc,
}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id),
            kind: ActiveValue::Set(tx.kind),
            from_account_id: ActiveValue::Set(tx.from_account_id),
            to_account_id: ActiveValue::Set(tx.to_account_id),
            amount: ActiveValue::Set(money::encode(tx.amount_cents)),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            exchange_rate: ActiveValue::Set(tx.exchange_rate),
            converted_amount: ActiveValue::Set(tx.converted_amount_cents.map(money::encode)),
            description: ActiveValue::Set(tx.description.clone()),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let converted_amount_cents = match &model.converted_amount {
            Some(raw) => Some(money::decode(raw)?),
            None => None,
        };
        Ok(Self {
            id: model.id,
            kind: model.kind,
            from_account_id: model.from_account_id,
            to_account_id: model.to_account_id,
            amount_cents: money::decode(&model.amount)?,
            currency: Currency::try_from(model.currency.as_str())?,
            exchange_rate: model.exchange_rate,
            converted_amount_cents,
            description: model.description,
            created_at: model.created_at,
        })
    }
}

/// A transaction joined with the counterparty emails, as served to clients.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionWithEmails {
    pub transaction: Transaction,
    pub from_user_email: Option<String>,
    pub to_user_email: Option<String>,
}
