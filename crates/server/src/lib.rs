use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;
use serde::Serialize;

pub use auth::TokenManager;
pub use rate_limit::RateLimiter;
pub use server::{ServerState, run_with_listener};

mod accounts;
mod auth;
mod rate_limit;
mod server;
mod transactions;

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    /// Request-shape problems caught at the boundary; always a 400.
    Generic(String),
    /// Server-side failures outside the engine (hashing, signing).
    Internal(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::UserExists | EngineError::LiquidityUnavailable => StatusCode::CONFLICT,
        EngineError::InvalidCredentials | EngineError::InvalidToken => StatusCode::UNAUTHORIZED,
        EngineError::Unauthorized => StatusCode::FORBIDDEN,
        EngineError::UserNotFound
        | EngineError::AccountNotFound
        | EngineError::TransactionNotFound => StatusCode::NOT_FOUND,
        EngineError::InsufficientFunds
        | EngineError::InvalidAmount(_)
        | EngineError::InvalidCurrency(_)
        | EngineError::CurrenciesMustDiffer
        | EngineError::CannotTransferToSelf
        | EngineError::BadRequest(_) => StatusCode::BAD_REQUEST,
        EngineError::LedgerUnbalanced(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    if err.is_domain() {
        tracing::warn!("request failed: {err}");
        err.to_string()
    } else {
        tracing::error!("request failed: {err}");
        "internal_error".to_string()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Generic(err) => {
                tracing::warn!("request rejected: {err}");
                (StatusCode::BAD_REQUEST, err)
            }
            ServerError::Internal(err) => {
                tracing::error!("request failed: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error".to_string(),
                )
            }
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_err() -> EngineError {
        EngineError::Database(sea_orm::DbErr::Custom("boom".to_string()))
    }

    #[test]
    fn user_exists_maps_to_409() {
        let res = ServerError::from(EngineError::UserExists).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn liquidity_unavailable_maps_to_409() {
        let res = ServerError::from(EngineError::LiquidityUnavailable).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn credential_errors_map_to_401() {
        let res = ServerError::from(EngineError::InvalidCredentials).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let res = ServerError::from(EngineError::InvalidToken).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn unauthorized_maps_to_403() {
        let res = ServerError::from(EngineError::Unauthorized).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn not_found_kinds_map_to_404() {
        for err in [
            EngineError::UserNotFound,
            EngineError::AccountNotFound,
            EngineError::TransactionNotFound,
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn validation_kinds_map_to_400() {
        for err in [
            EngineError::InsufficientFunds,
            EngineError::InvalidAmount("x".to_string()),
            EngineError::InvalidCurrency("XXX".to_string()),
            EngineError::CurrenciesMustDiffer,
            EngineError::CannotTransferToSelf,
            EngineError::BadRequest("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn infrastructure_errors_map_to_500() {
        let res = ServerError::from(db_err()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let res =
            ServerError::from(EngineError::LedgerUnbalanced("tx: sum=1".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
