use uuid::Uuid;

use crate::{Account, Currency, ResultEngine, money};

use super::{Engine, SYSTEM_BANK_USER_ID};
use super::transfer::{AccountTransfer, TransferPurpose};

/// Seed amounts granted to every new user at registration.
const INITIAL_USD_CENTS: i64 = 1000_00;
const INITIAL_EUR_CENTS: i64 = 500_00;

impl Engine {
    /// Provisions the two per-currency accounts for a freshly registered
    /// user and seeds them out of the system counterparty.
    ///
    /// Funding reuses the transfer unit of work wholesale (same canonical
    /// lock order, same ledger discipline, same zero-sum check), so the seed
    /// money is fully ledger-backed. A counterparty shortfall fails with
    /// `LiquidityUnavailable` and rolls everything back, accounts included.
    pub async fn provision_user_accounts(&self, user_id: Uuid) -> ResultEngine<Vec<Account>> {
        tracing::info!(%user_id, "provisioning default accounts");

        self.with_tx(move |engine, db_tx| {
            Box::pin(async move {
                engine.insert_account(db_tx, user_id, Currency::Usd).await?;
                engine.insert_account(db_tx, user_id, Currency::Eur).await?;

                engine
                    .transfer_between_accounts(
                        db_tx,
                        AccountTransfer {
                            from_user_id: SYSTEM_BANK_USER_ID,
                            to_user_id: user_id,
                            currency: Currency::Usd,
                            amount_cents: INITIAL_USD_CENTS,
                            description: format!(
                                "Initial USD funding: USD {}",
                                money::encode(INITIAL_USD_CENTS)
                            ),
                            purpose: TransferPurpose::SeedFunding,
                        },
                    )
                    .await?;
                engine
                    .transfer_between_accounts(
                        db_tx,
                        AccountTransfer {
                            from_user_id: SYSTEM_BANK_USER_ID,
                            to_user_id: user_id,
                            currency: Currency::Eur,
                            amount_cents: INITIAL_EUR_CENTS,
                            description: format!(
                                "Initial EUR funding: EUR {}",
                                money::encode(INITIAL_EUR_CENTS)
                            ),
                            purpose: TransferPurpose::SeedFunding,
                        },
                    )
                    .await?;

                Ok(())
            })
        })
        .await?;

        tracing::info!(%user_id, "default accounts funded");
        self.accounts_for_user(user_id).await
    }
}
