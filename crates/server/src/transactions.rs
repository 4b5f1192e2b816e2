//! Transactions API endpoints

use api_types::transaction::{
    ExchangeRequest, TransactionListQuery, TransactionListResponse, TransactionResponse,
    TransferRequest,
};
use axum::{Extension, Json, extract::Query, extract::State};

use engine::{
    Currency, EngineError, ExchangeCmd, Recipient, TransactionFilter, TransactionKind,
    TransactionWithEmails, TransferCmd, users,
};

use crate::{ServerError, server::ServerState};

fn transaction_response(item: TransactionWithEmails) -> TransactionResponse {
    let tx = item.transaction;
    TransactionResponse {
        id: tx.id,
        kind: tx.kind.as_str().to_string(),
        from_account_id: tx.from_account_id,
        to_account_id: tx.to_account_id,
        amount_cents: tx.amount_cents,
        currency: tx.currency.code().to_string(),
        exchange_rate: tx.exchange_rate,
        converted_amount_cents: tx.converted_amount_cents,
        description: tx.description,
        created_at: tx.created_at,
        from_user_email: item.from_user_email,
        to_user_email: item.to_user_email,
    }
}

pub async fn transfer(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransferRequest>,
) -> Result<Json<TransactionResponse>, ServerError> {
    let recipient = match (payload.to_user_id, payload.to_user_email) {
        (Some(_), Some(_)) => {
            return Err(ServerError::Generic(
                "provide either to_user_id or to_user_email".to_string(),
            ));
        }
        (Some(id), None) => Recipient::UserId(id),
        (None, Some(email)) => Recipient::Email(email),
        (None, None) => return Err(ServerError::Generic("recipient is required".to_string())),
    };
    let currency = Currency::try_from(payload.currency.as_str())?;

    let created = state
        .engine
        .transfer(TransferCmd::new(
            user.id,
            recipient,
            currency,
            payload.amount_cents,
        ))
        .await
        .map_err(|err| match err {
            // On this route an unknown recipient is the caller's mistake.
            EngineError::UserNotFound => ServerError::Generic("recipient not found".to_string()),
            other => ServerError::Engine(other),
        })?;

    Ok(Json(transaction_response(created)))
}

pub async fn exchange(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ExchangeRequest>,
) -> Result<Json<TransactionResponse>, ServerError> {
    let from_currency = Currency::try_from(payload.from_currency.as_str())?;
    let to_currency = Currency::try_from(payload.to_currency.as_str())?;

    let created = state
        .engine
        .exchange(ExchangeCmd::new(
            user.id,
            from_currency,
            to_currency,
            payload.amount_cents,
        ))
        .await?;

    Ok(Json(transaction_response(created)))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let mut filter = TransactionFilter::new();
    if let Some(kind_raw) = query.kind.as_deref() {
        filter = filter.kind(TransactionKind::try_from(kind_raw)?);
    }
    if let Some(page) = query.page {
        filter = filter.page(page);
    }
    if let Some(limit) = query.limit {
        filter = filter.limit(limit);
    }

    let items = state.engine.list_transactions_for(user.id, filter).await?;

    Ok(Json(TransactionListResponse {
        transactions: items.into_iter().map(transaction_response).collect(),
    }))
}
