use std::collections::HashMap;
use std::{future::Future, pin::Pin};

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait};
use uuid::Uuid;

use crate::{Account, EngineError, ExchangeRate, ResultEngine, TransactionWithEmails};

mod accounts;
mod exchange;
mod funding;
mod list;
mod reconcile;
mod tokens;
mod transfer;
mod users;

pub use reconcile::AccountMismatch;

/// The distinguished user owning the per-currency counterparty accounts.
/// Seeded at database provisioning; otherwise an ordinary account holder.
pub const SYSTEM_BANK_USER_ID: Uuid = Uuid::from_u128(1);

#[derive(Clone, Debug)]
pub struct Engine {
    database: DatabaseConnection,
    rate: ExchangeRate,
}

impl Engine {
    /// Return a builder for `Engine`.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Runs `f` inside one storage transaction; commit on `Ok`, rollback on
    /// `Err` (and on drop, which covers request cancellation).
    pub async fn with_tx<T, F>(&self, f: F) -> ResultEngine<T>
    where
        F: for<'a> FnOnce(
                Engine,
                &'a DatabaseTransaction,
            )
                -> Pin<Box<dyn Future<Output = ResultEngine<T>> + Send + 'a>>
            + Send,
        T: Send,
    {
        let engine = self.clone();
        self.database
            .transaction(|tx| f(engine.clone(), tx))
            .await
            .map_err(|err| match err {
                TransactionError::Connection(db_err) => EngineError::Database(db_err),
                TransactionError::Transaction(inner) => inner,
            })
    }

    /// Locks the given accounts in the canonical order (lexicographic on the
    /// id string) and returns fresh snapshots.
    ///
    /// Every code path that takes more than one row lock goes through here;
    /// the shared ordering is what makes concurrent operations deadlock-free.
    pub(crate) async fn lock_accounts_in_order(
        &self,
        db_tx: &DatabaseTransaction,
        ids: &[Uuid],
    ) -> ResultEngine<HashMap<Uuid, Account>> {
        let mut order = ids.to_vec();
        order.sort_by_key(|id| id.to_string());

        let mut locked = HashMap::with_capacity(order.len());
        for id in order {
            let account = self.lock_account(db_tx, id).await?;
            locked.insert(id, account);
        }
        Ok(locked)
    }

    /// Attaches counterparty emails to a committed transaction, best-effort.
    pub(crate) async fn with_counterparty_emails(
        &self,
        transaction: crate::Transaction,
        from_user_id: Uuid,
        to_user_id: Uuid,
    ) -> TransactionWithEmails {
        let from_user_email = self.user_by_id(from_user_id).await.ok().map(|u| u.email);
        let to_user_email = self.user_by_id(to_user_id).await.ok().map(|u| u.email);
        TransactionWithEmails {
            transaction,
            from_user_email,
            to_user_email,
        }
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    rate: ExchangeRate,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Configure the USD→EUR rate from its decimal-string form; invalid
    /// input falls back to the default rate.
    pub fn usd_to_eur_rate(mut self, raw: &str) -> EngineBuilder {
        self.rate = ExchangeRate::parse(raw);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            rate: self.rate,
        })
    }
}
