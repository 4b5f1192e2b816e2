//! The module contains the errors the engine can return.
//!
//! Domain errors carry a semantic kind the HTTP boundary maps to a 4xx
//! status; [`Database`] wraps any storage failure and is the infrastructure
//! kind, mapped to 500.
//!
//! [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("user not found")]
    UserNotFound,
    #[error("user with this email already exists")]
    UserExists,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("unauthorized")]
    Unauthorized,
    #[error("account not found")]
    AccountNotFound,
    #[error("transaction not found")]
    TransactionNotFound,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("invalid currency: {0}")]
    InvalidCurrency(String),
    #[error("from and to currencies must be different")]
    CurrenciesMustDiffer,
    #[error("cannot transfer to self")]
    CannotTransferToSelf,
    #[error("exchange liquidity unavailable")]
    LiquidityUnavailable,
    #[error("{0}")]
    BadRequest(String),
    #[error("ledger not balanced: {0}")]
    LedgerUnbalanced(String),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl EngineError {
    /// `true` for semantic failures a client caused; `false` for
    /// infrastructure failures. Callers use this to pick the log severity.
    #[must_use]
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            EngineError::Database(_) | EngineError::LedgerUnbalanced(_)
        )
    }
}
