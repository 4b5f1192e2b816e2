//! Ledger append and reconciliation queries.
//!
//! Aggregate arithmetic happens in integer cents on the database side:
//! stored decimal strings are cast to `DECIMAL(15,2)`, scaled by 100,
//! rounded, and summed as `BIGINT`, so no floating-point drift can leak
//! into a verdict.

use uuid::Uuid;

use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, DbErr, QueryFilter, QueryOrder, Statement, prelude::*,
};

use crate::{EngineError, LedgerEntry, ResultEngine, ledger, money};

use super::Engine;

/// One account whose cached balance disagrees with its ledger history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountMismatch {
    pub account_id: Uuid,
    pub user_id: Uuid,
    pub currency: String,
    pub balance_cents: i64,
    pub ledger_sum_cents: i64,
    pub diff_cents: i64,
}

const CENTS_OF_BALANCE: &str =
    "CAST(ROUND(CAST(a.balance AS DECIMAL(15,2)) * 100) AS BIGINT)";
const CENTS_OF_LEDGER_SUM: &str =
    "CAST(COALESCE(SUM(CAST(ROUND(CAST(l.amount AS DECIMAL(15,2)) * 100) AS BIGINT)), 0) AS BIGINT)";

impl Engine {
    /// Appends one signed posting inside an open unit of work.
    ///
    /// Idempotent on the entry id: appending an id that is already in the
    /// ledger is a no-op, never an error.
    pub async fn append_entry(
        &self,
        db_tx: &DatabaseTransaction,
        entry: &LedgerEntry,
    ) -> ResultEngine<()> {
        let insert = ledger::Entity::insert(ledger::ActiveModel::from(entry)).on_conflict(
            OnConflict::column(ledger::Column::Id)
                .do_nothing()
                .to_owned(),
        );
        match insert.exec(db_tx).await {
            Ok(_) => Ok(()),
            // DO NOTHING that inserts zero rows surfaces as RecordNotInserted.
            Err(DbErr::RecordNotInserted) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// All postings of one transaction, ordered by creation time.
    pub async fn entries_of(&self, transaction_id: Uuid) -> ResultEngine<Vec<LedgerEntry>> {
        let models = ledger::Entity::find()
            .filter(ledger::Column::TransactionId.eq(transaction_id))
            .order_by_asc(ledger::Column::CreatedAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(LedgerEntry::try_from).collect()
    }

    /// Re-reads the postings of a transaction inside its own unit of work
    /// and fails with `LedgerUnbalanced` unless they sum to zero cents.
    pub(crate) async fn verify_zero_sum(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: Uuid,
    ) -> ResultEngine<()> {
        let models = ledger::Entity::find()
            .filter(ledger::Column::TransactionId.eq(transaction_id))
            .all(db_tx)
            .await?;

        let mut sum_cents: i64 = 0;
        for model in &models {
            sum_cents += money::decode(&model.amount)?;
        }
        if sum_cents != 0 {
            return Err(EngineError::LedgerUnbalanced(format!(
                "transaction {transaction_id}: sum_cents={sum_cents}"
            )));
        }
        Ok(())
    }

    /// Transaction ids whose postings do not sum to zero cents, up to
    /// `limit`, ordered by id.
    pub async fn find_unbalanced_transaction_ids(&self, limit: u64) -> ResultEngine<Vec<Uuid>> {
        let limit = if limit == 0 { 100 } else { limit };
        let sql = format!(
            "SELECT l.transaction_id AS transaction_id \
             FROM ledger l \
             GROUP BY l.transaction_id \
             HAVING {CENTS_OF_LEDGER_SUM} <> 0 \
             ORDER BY l.transaction_id \
             LIMIT {limit}"
        );
        let rows = self
            .database
            .query_all(Statement::from_string(
                self.database.get_database_backend(),
                sql,
            ))
            .await?;

        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            ids.push(row.try_get::<Uuid>("", "transaction_id")?);
        }
        Ok(ids)
    }

    /// Accounts whose cached balance differs from their ledger sum, up to
    /// `limit`, largest absolute drift first.
    pub async fn find_account_mismatches(&self, limit: u64) -> ResultEngine<Vec<AccountMismatch>> {
        let limit = if limit == 0 { 100 } else { limit };
        let sql = format!(
            "SELECT a.id AS account_id, a.user_id AS user_id, a.currency AS currency, \
                    {CENTS_OF_BALANCE} AS balance_cents, \
                    {CENTS_OF_LEDGER_SUM} AS ledger_sum_cents \
             FROM accounts a \
             LEFT JOIN ledger l ON l.account_id = a.id \
             GROUP BY a.id, a.user_id, a.currency, a.balance \
             HAVING {CENTS_OF_BALANCE} <> {CENTS_OF_LEDGER_SUM} \
             ORDER BY ABS({CENTS_OF_BALANCE} - {CENTS_OF_LEDGER_SUM}) DESC \
             LIMIT {limit}"
        );
        let rows = self
            .database
            .query_all(Statement::from_string(
                self.database.get_database_backend(),
                sql,
            ))
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let balance_cents = row.try_get::<i64>("", "balance_cents")?;
            let ledger_sum_cents = row.try_get::<i64>("", "ledger_sum_cents")?;
            out.push(AccountMismatch {
                account_id: row.try_get::<Uuid>("", "account_id")?,
                user_id: row.try_get::<Uuid>("", "user_id")?,
                currency: row.try_get::<String>("", "currency")?,
                balance_cents,
                ledger_sum_cents,
                diff_cents: balance_cents - ledger_sum_cents,
            });
        }
        Ok(out)
    }
}
