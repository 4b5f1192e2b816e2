//! Double-entry ledger engine.
//!
//! Every balance mutation happens inside one storage transaction that also
//! appends the matching ledger postings and re-verifies that they sum to
//! zero before committing. Serialization between concurrent operations
//! comes entirely from row-level locks taken in a canonical order.

pub use accounts::Account;
pub use commands::{ExchangeCmd, NewUser, Recipient, TransactionFilter, TransferCmd};
pub use currency::Currency;
pub use error::EngineError;
pub use ledger::LedgerEntry;
pub use ops::{AccountMismatch, Engine, EngineBuilder, SYSTEM_BANK_USER_ID};
pub use rate::ExchangeRate;
pub use reconciler::{Reconciler, ReconcilerConfig};
pub use transactions::{Transaction, TransactionKind, TransactionWithEmails};

pub mod accounts;
mod commands;
mod currency;
mod error;
pub mod ledger;
pub mod money;
mod ops;
mod rate;
mod reconciler;
pub mod refresh_tokens;
pub mod transactions;
pub mod users;

pub type ResultEngine<T> = Result<T, EngineError>;
