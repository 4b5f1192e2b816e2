//! Accounts API endpoints

use api_types::account::{AccountView, AccountsResponse};
use axum::{Extension, Json, extract::State};

use engine::users;

use crate::{ServerError, server::ServerState};

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<AccountsResponse>, ServerError> {
    let accounts = state.engine.accounts_for_user(user.id).await?;

    let accounts = accounts
        .into_iter()
        .map(|account| AccountView {
            id: account.id,
            currency: account.currency.code().to_string(),
            balance_cents: account.balance_cents,
            created_at: account.created_at,
            updated_at: account.updated_at,
        })
        .collect();

    Ok(Json(AccountsResponse { accounts }))
}
