//! Authentication: argon2 password hashing, HS256 token pairs, and the
//! bearer-auth middleware that resolves the caller for protected routes.
//!
//! Refresh tokens are JWTs with their own TTL; only a SHA-256 hex digest of
//! the token is persisted, and refresh rotates the pair (the old digest is
//! deleted best-effort before new tokens are issued).

use api_types::auth::{
    AuthResponse, LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest, TokenPair, UserInfo,
};
use argon2::password_hash::{PasswordHash, SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use engine::{EngineError, NewUser, users};

use crate::{ServerError, server::ServerState};

/// Issues and validates the HS256 access/refresh token pair.
#[derive(Clone)]
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    exp: i64,
    jti: Uuid,
}

impl TokenManager {
    #[must_use]
    pub fn new(secret: &str, access_ttl_seconds: u64, refresh_ttl_seconds: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::seconds(access_ttl_seconds as i64),
            refresh_ttl: Duration::seconds(refresh_ttl_seconds as i64),
        }
    }

    pub(crate) fn issue_access_token(&self, user_id: Uuid) -> Result<String, ServerError> {
        self.issue(user_id, self.access_ttl)
    }

    pub(crate) fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, ServerError> {
        self.issue(user_id, self.refresh_ttl)
    }

    fn issue(&self, user_id: Uuid, ttl: Duration) -> Result<String, ServerError> {
        let claims = Claims {
            sub: user_id,
            exp: (Utc::now() + ttl).timestamp(),
            jti: Uuid::new_v4(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|err| ServerError::Internal(format!("failed to sign token: {err}")))
    }

    /// Returns the user id carried by a valid, unexpired token.
    pub(crate) fn validate(&self, token: &str) -> Result<Uuid, ServerError> {
        let validation = Validation::new(Algorithm::HS256);
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims.sub),
            Err(err) => {
                tracing::warn!("token validation failed: {err}");
                Err(ServerError::Engine(EngineError::InvalidToken))
            }
        }
    }

    pub(crate) fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

/// SHA-256 hex digest under which a refresh token is stored.
fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn hash_password(password: &str) -> Result<String, ServerError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ServerError::Internal(format!("failed to hash password: {err}")))
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn user_info(user: users::Model) -> UserInfo {
    UserInfo {
        id: user.id,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

async fn issue_token_pair(state: &ServerState, user_id: Uuid) -> Result<TokenPair, ServerError> {
    let access_token = state.tokens.issue_access_token(user_id)?;
    let refresh_token = state.tokens.issue_refresh_token(user_id)?;

    let expires_at = Utc::now() + state.tokens.refresh_ttl();
    state
        .engine
        .store_refresh_token(user_id, token_digest(&refresh_token), expires_at)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Bearer-token middleware for the protected routes. Inserts the resolved
/// user into request extensions.
pub async fn require_auth(
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ServerError::Engine(EngineError::InvalidToken))?;

    let user_id = state.tokens.validate(token)?;
    let user = state.engine.user_by_id(user_id).await.map_err(|err| match err {
        EngineError::UserNotFound => EngineError::InvalidToken,
        other => other,
    })?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let email = payload.email.trim().to_ascii_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ServerError::Generic("a valid email is required".to_string()));
    }
    if payload.password.len() < 8 {
        return Err(ServerError::Generic(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = state
        .engine
        .create_user(NewUser {
            email,
            password_hash,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await?;

    state.engine.provision_user_accounts(user.id).await?;

    let tokens = issue_token_pair(&state, user.id).await?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok(Json(AuthResponse {
        tokens,
        user: user_info(user),
    }))
}

pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let user = state
        .engine
        .user_by_email(&payload.email)
        .await
        .map_err(|err| match err {
            EngineError::UserNotFound => EngineError::InvalidCredentials,
            other => other,
        })?;

    if !verify_password(&payload.password, &user.password_hash) {
        tracing::warn!(email = %user.email, "invalid password");
        return Err(ServerError::Engine(EngineError::InvalidCredentials));
    }

    let tokens = issue_token_pair(&state, user.id).await?;
    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(AuthResponse {
        tokens,
        user: user_info(user),
    }))
}

/// Rotates a refresh token: the old digest is deleted (best-effort) and a
/// fresh pair is issued.
pub async fn refresh(
    State(state): State<ServerState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ServerError> {
    state.tokens.validate(&payload.refresh_token)?;

    let digest = token_digest(&payload.refresh_token);
    let record = state.engine.refresh_token_by_hash(&digest).await?;

    if let Err(err) = state.engine.delete_refresh_token(&digest).await {
        tracing::warn!("failed to delete old refresh token: {err}");
    }

    let tokens = issue_token_pair(&state, record.user_id).await?;
    tracing::info!(user_id = %record.user_id, "token refreshed");
    Ok(Json(tokens))
}

/// Logout is best-effort on the server side: a failed token delete is
/// logged and the request still succeeds.
pub async fn logout(
    State(state): State<ServerState>,
    Json(payload): Json<LogoutRequest>,
) -> StatusCode {
    let digest = token_digest(&payload.refresh_token);
    if let Err(err) = state.engine.delete_refresh_token(&digest).await {
        tracing::warn!("failed to delete refresh token: {err}");
    }
    StatusCode::NO_CONTENT
}

pub async fn me(Extension(user): Extension<users::Model>) -> Json<UserInfo> {
    Json(user_info(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let manager = TokenManager::new("test-secret", 900, 3600);
        let user_id = Uuid::new_v4();
        let token = manager.issue_access_token(user_id).unwrap();
        assert_eq!(manager.validate(&token).unwrap(), user_id);
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = TokenManager {
            encoding: EncodingKey::from_secret(b"test-secret"),
            decoding: DecodingKey::from_secret(b"test-secret"),
            access_ttl: Duration::seconds(-120),
            refresh_ttl: Duration::seconds(-120),
        };
        let token = manager.issue_access_token(Uuid::new_v4()).unwrap();
        assert!(manager.validate(&token).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issuer = TokenManager::new("secret-a", 900, 3600);
        let verifier = TokenManager::new("secret-b", 900, 3600);
        let token = issuer.issue_access_token(Uuid::new_v4()).unwrap();
        assert!(verifier.validate(&token).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
