use std::collections::HashMap;

use uuid::Uuid;

use sea_orm::{Condition, QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{
    EngineError, ResultEngine, Transaction, TransactionFilter, TransactionWithEmails, accounts,
    transactions, users,
};

use super::Engine;

impl Engine {
    /// Lists the transactions a user took part in, newest first, joined with
    /// the counterparty emails.
    ///
    /// Pagination: `page >= 1`, `limit >= 1`, defaults 1/50; out-of-range
    /// values fall back to the defaults.
    pub async fn list_transactions_for(
        &self,
        user_id: Uuid,
        filter: TransactionFilter,
    ) -> ResultEngine<Vec<TransactionWithEmails>> {
        let page = if filter.page < 1 { 1 } else { filter.page };
        let limit = if filter.limit < 1 { 50 } else { filter.limit };
        let offset = (page - 1) * limit;

        let own_account_ids: Vec<Uuid> = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|model| model.id)
            .collect();
        if own_account_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = transactions::Entity::find()
            .filter(
                Condition::any()
                    .add(transactions::Column::FromAccountId.is_in(own_account_ids.clone()))
                    .add(transactions::Column::ToAccountId.is_in(own_account_ids)),
            )
            .order_by_desc(transactions::Column::CreatedAt)
            .limit(limit)
            .offset(offset);
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        let models = query.all(&self.database).await?;

        // Resolve the page's account owners, then their emails.
        let mut involved_account_ids: Vec<Uuid> = Vec::new();
        for model in &models {
            if let Some(from) = model.from_account_id {
                involved_account_ids.push(from);
            }
            involved_account_ids.push(model.to_account_id);
        }
        involved_account_ids.sort_unstable();
        involved_account_ids.dedup();

        let account_owner: HashMap<Uuid, Uuid> = accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(involved_account_ids))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|model| (model.id, model.user_id))
            .collect();

        let mut owner_ids: Vec<Uuid> = account_owner.values().copied().collect();
        owner_ids.sort_unstable();
        owner_ids.dedup();
        let email_of: HashMap<Uuid, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(owner_ids))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|model| (model.id, model.email))
            .collect();

        let email_for_account =
            |account_id: Uuid| -> Option<String> {
                account_owner
                    .get(&account_id)
                    .and_then(|owner| email_of.get(owner).cloned())
            };

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let from_user_email = model.from_account_id.and_then(|id| email_for_account(id));
            let to_user_email = email_for_account(model.to_account_id);
            out.push(TransactionWithEmails {
                transaction: Transaction::try_from(model)?,
                from_user_email,
                to_user_email,
            });
        }
        Ok(out)
    }

    pub async fn transaction_by_id(&self, id: Uuid) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or(EngineError::TransactionNotFound)?;
        Transaction::try_from(model)
    }
}
