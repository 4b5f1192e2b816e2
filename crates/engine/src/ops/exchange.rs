use chrono::Utc;
use uuid::Uuid;

use sea_orm::ActiveModelTrait;

use crate::{
    EngineError, ExchangeCmd, LedgerEntry, ResultEngine, Transaction, TransactionKind,
    TransactionWithEmails, money, transactions,
};

use super::{Engine, SYSTEM_BANK_USER_ID};

impl Engine {
    /// Converts funds between a user's two currency accounts, with the
    /// system counterparty on the other side of both legs.
    ///
    /// Four accounts are locked in canonical order. The four postings sum to
    /// zero per currency pool: the user's source account and the bank's
    /// matching pool cancel in the source currency, the bank's target pool
    /// and the user's target account cancel in the target currency.
    pub async fn exchange(&self, cmd: ExchangeCmd) -> ResultEngine<TransactionWithEmails> {
        let ExchangeCmd {
            user_id,
            from_currency,
            to_currency,
            amount_cents,
        } = cmd;

        if from_currency == to_currency {
            return Err(EngineError::CurrenciesMustDiffer);
        }
        if amount_cents <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_cents must be > 0".to_string(),
            ));
        }

        tracing::info!(
            %user_id,
            from = %from_currency,
            to = %to_currency,
            amount_cents,
            "processing exchange"
        );

        let (reported_rate, converted_cents) =
            self.rate.convert(amount_cents, from_currency, to_currency)?;

        let created = self
            .with_tx(move |engine, db_tx| {
                Box::pin(async move {
                    let user_from_id = engine
                        .find_account_id(db_tx, user_id, from_currency)
                        .await?;
                    let user_to_id = engine.find_account_id(db_tx, user_id, to_currency).await?;
                    let bank_from_id = engine
                        .find_account_id(db_tx, SYSTEM_BANK_USER_ID, from_currency)
                        .await?;
                    let bank_to_id = engine
                        .find_account_id(db_tx, SYSTEM_BANK_USER_ID, to_currency)
                        .await?;

                    let locked = engine
                        .lock_accounts_in_order(
                            db_tx,
                            &[user_from_id, user_to_id, bank_from_id, bank_to_id],
                        )
                        .await?;
                    let user_from = locked.get(&user_from_id).ok_or(EngineError::AccountNotFound)?;
                    let user_to = locked.get(&user_to_id).ok_or(EngineError::AccountNotFound)?;
                    let bank_from = locked.get(&bank_from_id).ok_or(EngineError::AccountNotFound)?;
                    let bank_to = locked.get(&bank_to_id).ok_or(EngineError::AccountNotFound)?;

                    if user_from.user_id != user_id
                        || user_to.user_id != user_id
                        || bank_from.user_id != SYSTEM_BANK_USER_ID
                        || bank_to.user_id != SYSTEM_BANK_USER_ID
                    {
                        return Err(EngineError::Unauthorized);
                    }

                    if user_from.balance_cents < amount_cents {
                        tracing::warn!(
                            %user_id,
                            balance_cents = user_from.balance_cents,
                            amount_cents,
                            "insufficient funds for exchange"
                        );
                        return Err(EngineError::InsufficientFunds);
                    }
                    if bank_to.balance_cents < converted_cents {
                        tracing::warn!(
                            currency = %to_currency,
                            bank_balance_cents = bank_to.balance_cents,
                            needed_cents = converted_cents,
                            "bank liquidity exhausted"
                        );
                        return Err(EngineError::LiquidityUnavailable);
                    }

                    let created_at = Utc::now();
                    let created = Transaction {
                        id: Uuid::new_v4(),
                        kind: TransactionKind::Exchange,
                        from_account_id: Some(user_from_id),
                        to_account_id: user_to_id,
                        amount_cents,
                        currency: from_currency,
                        exchange_rate: Some(reported_rate),
                        converted_amount_cents: Some(converted_cents),
                        description: format!(
                            "Exchange {} {from_currency} to {} {to_currency}",
                            money::encode(amount_cents),
                            money::encode(converted_cents)
                        ),
                        created_at,
                    };
                    transactions::ActiveModel::from(&created).insert(db_tx).await?;

                    engine
                        .append_entry(
                            db_tx,
                            &LedgerEntry::new(created.id, user_from_id, -amount_cents, created_at),
                        )
                        .await?;
                    engine
                        .append_entry(
                            db_tx,
                            &LedgerEntry::new(created.id, bank_from_id, amount_cents, created_at),
                        )
                        .await?;
                    engine
                        .append_entry(
                            db_tx,
                            &LedgerEntry::new(created.id, bank_to_id, -converted_cents, created_at),
                        )
                        .await?;
                    engine
                        .append_entry(
                            db_tx,
                            &LedgerEntry::new(created.id, user_to_id, converted_cents, created_at),
                        )
                        .await?;
                    engine.verify_zero_sum(db_tx, created.id).await?;

                    engine
                        .update_balance(db_tx, user_from_id, user_from.balance_cents - amount_cents)
                        .await?;
                    engine
                        .update_balance(db_tx, user_to_id, user_to.balance_cents + converted_cents)
                        .await?;
                    engine
                        .update_balance(db_tx, bank_from_id, bank_from.balance_cents + amount_cents)
                        .await?;
                    engine
                        .update_balance(db_tx, bank_to_id, bank_to.balance_cents - converted_cents)
                        .await?;

                    Ok(created)
                })
            })
            .await?;

        tracing::info!(
            transaction_id = %created.id,
            converted_amount_cents = converted_cents,
            "exchange completed"
        );

        Ok(self.with_counterparty_emails(created, user_id, user_id).await)
    }
}
