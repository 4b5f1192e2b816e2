//! Wire types shared by the server and its clients.
//!
//! Monetary fields travel as integer cents (`*_cents`); currencies are
//! plain code strings so that an unknown code surfaces as a domain error
//! instead of a deserialization failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod auth {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RegisterRequest {
        pub email: String,
        pub password: String,
        pub first_name: String,
        pub last_name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoginRequest {
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RefreshRequest {
        pub refresh_token: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LogoutRequest {
        pub refresh_token: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TokenPair {
        pub access_token: String,
        pub refresh_token: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserInfo {
        pub id: Uuid,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AuthResponse {
        pub tokens: TokenPair,
        pub user: UserInfo,
    }
}

pub mod account {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: Uuid,
        pub currency: String,
        pub balance_cents: i64,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountsResponse {
        pub accounts: Vec<AccountView>,
    }
}

pub mod transaction {
    use super::*;

    /// Request body for a same-currency transfer. Exactly one of
    /// `to_user_id` / `to_user_email` must be present.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferRequest {
        pub to_user_id: Option<Uuid>,
        pub to_user_email: Option<String>,
        pub currency: String,
        pub amount_cents: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExchangeRequest {
        pub from_currency: String,
        pub to_currency: String,
        pub amount_cents: i64,
    }

    /// Listing query string: `?type=transfer&page=2&limit=10`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionListQuery {
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub page: Option<u64>,
        pub limit: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionResponse {
        pub id: Uuid,
        #[serde(rename = "type")]
        pub kind: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub from_account_id: Option<Uuid>,
        pub to_account_id: Uuid,
        pub amount_cents: i64,
        pub currency: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub exchange_rate: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub converted_amount_cents: Option<i64>,
        pub description: String,
        pub created_at: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub from_user_email: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub to_user_email: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionResponse>,
    }
}

#[cfg(test)]
mod tests {
    use super::transaction::TransferRequest;

    #[test]
    fn transfer_request_uses_wire_field_names() {
        let req: TransferRequest = serde_json::from_str(
            r#"{"to_user_email":"bob@example.com","currency":"USD","amount_cents":2500}"#,
        )
        .unwrap();
        assert_eq!(req.to_user_email.as_deref(), Some("bob@example.com"));
        assert!(req.to_user_id.is_none());
        assert_eq!(req.amount_cents, 2500);
    }
}
