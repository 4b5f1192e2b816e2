//! Command structs for engine operations.
//!
//! These types group parameters for the write operations and the read-side
//! listing, keeping call sites readable and avoiding long argument lists.

use uuid::Uuid;

use crate::{Currency, TransactionKind};

/// Who receives a transfer: a user id or an email to resolve.
///
/// The HTTP boundary enforces that exactly one of the two request fields is
/// present before building this value.
#[derive(Clone, Debug)]
pub enum Recipient {
    UserId(Uuid),
    Email(String),
}

/// Move funds between two users within one currency.
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub from_user_id: Uuid,
    pub to: Recipient,
    pub currency: Currency,
    pub amount_cents: i64,
}

impl TransferCmd {
    #[must_use]
    pub fn new(from_user_id: Uuid, to: Recipient, currency: Currency, amount_cents: i64) -> Self {
        Self {
            from_user_id,
            to,
            currency,
            amount_cents,
        }
    }
}

/// Convert funds between a user's two currency accounts via the system
/// counterparty.
#[derive(Clone, Debug)]
pub struct ExchangeCmd {
    pub user_id: Uuid,
    pub from_currency: Currency,
    pub to_currency: Currency,
    pub amount_cents: i64,
}

impl ExchangeCmd {
    #[must_use]
    pub fn new(
        user_id: Uuid,
        from_currency: Currency,
        to_currency: Currency,
        amount_cents: i64,
    ) -> Self {
        Self {
            user_id,
            from_currency,
            to_currency,
            amount_cents,
        }
    }
}

/// Create a user row. The email is normalized (trimmed, lower-cased) by the
/// engine; the password arrives already hashed.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Filter and pagination for the per-user transaction listing.
#[derive(Clone, Copy, Debug)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub page: u64,
    pub limit: u64,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            kind: None,
            page: 1,
            limit: 50,
        }
    }
}

impl TransactionFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn page(mut self, page: u64) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }
}
