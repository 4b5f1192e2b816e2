use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveModelTrait, DatabaseTransaction};

use crate::{
    Currency, EngineError, LedgerEntry, Recipient, ResultEngine, Transaction, TransactionKind,
    TransactionWithEmails, TransferCmd, money, transactions,
};

use super::Engine;

/// Why a transfer runs; decides which error a sender shortfall maps to.
#[derive(Clone, Copy, Debug)]
pub(crate) enum TransferPurpose {
    /// A user-initiated payment; shortfall is `InsufficientFunds`.
    Payment,
    /// Registration seed funding out of the counterparty; shortfall is
    /// `LiquidityUnavailable`.
    SeedFunding,
}

impl TransferPurpose {
    fn shortfall_error(self) -> EngineError {
        match self {
            TransferPurpose::Payment => EngineError::InsufficientFunds,
            TransferPurpose::SeedFunding => EngineError::LiquidityUnavailable,
        }
    }
}

/// One same-currency movement between two users' accounts.
pub(crate) struct AccountTransfer {
    pub(crate) from_user_id: Uuid,
    pub(crate) to_user_id: Uuid,
    pub(crate) currency: Currency,
    pub(crate) amount_cents: i64,
    pub(crate) description: String,
    pub(crate) purpose: TransferPurpose,
}

impl Engine {
    /// Transfers `amount_cents` from one user to another within a currency.
    ///
    /// The whole movement is one unit of work: account resolution, locking
    /// in canonical order, balance checks, transaction row, paired ledger
    /// entries, zero-sum verification, and the two balance writes either all
    /// commit or none do.
    pub async fn transfer(&self, cmd: TransferCmd) -> ResultEngine<TransactionWithEmails> {
        let TransferCmd {
            from_user_id,
            to,
            currency,
            amount_cents,
        } = cmd;

        if amount_cents <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_cents must be > 0".to_string(),
            ));
        }

        let to_user_id = match to {
            Recipient::UserId(id) => id,
            Recipient::Email(raw) => {
                let email = raw.trim().to_ascii_lowercase();
                if email.is_empty() {
                    return Err(EngineError::BadRequest(
                        "to_user_email cannot be empty".to_string(),
                    ));
                }
                self.user_by_email(&email).await?.id
            }
        };
        if to_user_id == from_user_id {
            return Err(EngineError::CannotTransferToSelf);
        }

        tracing::info!(
            %from_user_id,
            %to_user_id,
            amount_cents,
            currency = %currency,
            "processing transfer"
        );

        let transfer = AccountTransfer {
            from_user_id,
            to_user_id,
            currency,
            amount_cents,
            description: format!(
                "Transfer {currency} {} from {from_user_id} to {to_user_id}",
                money::encode(amount_cents)
            ),
            purpose: TransferPurpose::Payment,
        };

        let created = self
            .with_tx(move |engine, db_tx| {
                Box::pin(async move { engine.transfer_between_accounts(db_tx, transfer).await })
            })
            .await?;

        tracing::info!(transaction_id = %created.id, "transfer completed");

        Ok(self
            .with_counterparty_emails(created, from_user_id, to_user_id)
            .await)
    }

    /// The transfer unit of work, shared verbatim by user payments and
    /// registration seed funding.
    pub(crate) async fn transfer_between_accounts(
        &self,
        db_tx: &DatabaseTransaction,
        transfer: AccountTransfer,
    ) -> ResultEngine<Transaction> {
        let from_account_id = self
            .find_account_id(db_tx, transfer.from_user_id, transfer.currency)
            .await?;
        let to_account_id = self
            .find_account_id(db_tx, transfer.to_user_id, transfer.currency)
            .await?;

        let locked = self
            .lock_accounts_in_order(db_tx, &[from_account_id, to_account_id])
            .await?;
        let from_account = locked
            .get(&from_account_id)
            .ok_or(EngineError::AccountNotFound)?;
        let to_account = locked
            .get(&to_account_id)
            .ok_or(EngineError::AccountNotFound)?;

        if from_account.user_id != transfer.from_user_id
            || to_account.user_id != transfer.to_user_id
        {
            return Err(EngineError::Unauthorized);
        }
        if from_account.currency != transfer.currency || to_account.currency != transfer.currency {
            return Err(EngineError::InvalidCurrency(
                transfer.currency.code().to_string(),
            ));
        }
        if from_account.balance_cents < transfer.amount_cents {
            tracing::warn!(
                user_id = %transfer.from_user_id,
                balance_cents = from_account.balance_cents,
                amount_cents = transfer.amount_cents,
                "sender balance too low"
            );
            return Err(transfer.purpose.shortfall_error());
        }

        let created_at = Utc::now();
        let created = Transaction {
            id: Uuid::new_v4(),
            kind: TransactionKind::Transfer,
            from_account_id: Some(from_account_id),
            to_account_id,
            amount_cents: transfer.amount_cents,
            currency: transfer.currency,
            exchange_rate: None,
            converted_amount_cents: None,
            description: transfer.description,
            created_at,
        };
        transactions::ActiveModel::from(&created).insert(db_tx).await?;

        self.append_entry(
            db_tx,
            &LedgerEntry::new(created.id, from_account_id, -transfer.amount_cents, created_at),
        )
        .await?;
        self.append_entry(
            db_tx,
            &LedgerEntry::new(created.id, to_account_id, transfer.amount_cents, created_at),
        )
        .await?;
        self.verify_zero_sum(db_tx, created.id).await?;

        self.update_balance(
            db_tx,
            from_account_id,
            from_account.balance_cents - transfer.amount_cents,
        )
        .await?;
        self.update_balance(
            db_tx,
            to_account_id,
            to_account.balance_cents + transfer.amount_cents,
        )
        .await?;

        Ok(created)
    }
}
