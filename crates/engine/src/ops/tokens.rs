use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, prelude::*};

use crate::{EngineError, ResultEngine, refresh_tokens};

use super::Engine;

impl Engine {
    /// Stores the SHA-256 hex digest of a freshly issued refresh token.
    pub async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let model = refresh_tokens::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(user_id),
            token_hash: ActiveValue::Set(token_hash),
            expires_at: ActiveValue::Set(expires_at),
            created_at: ActiveValue::Set(Utc::now()),
        };
        model.insert(&self.database).await?;
        Ok(())
    }

    /// Looks a stored refresh token up by digest. Missing or expired rows
    /// both fail with `InvalidToken`.
    pub async fn refresh_token_by_hash(
        &self,
        token_hash: &str,
    ) -> ResultEngine<refresh_tokens::Model> {
        let model = refresh_tokens::Entity::find()
            .filter(refresh_tokens::Column::TokenHash.eq(token_hash))
            .one(&self.database)
            .await?
            .ok_or(EngineError::InvalidToken)?;
        if model.expires_at <= Utc::now() {
            return Err(EngineError::InvalidToken);
        }
        Ok(model)
    }

    /// Deletes a stored refresh token by digest. Deleting a token that is
    /// already gone is not an error.
    pub async fn delete_refresh_token(&self, token_hash: &str) -> ResultEngine<()> {
        refresh_tokens::Entity::delete_many()
            .filter(refresh_tokens::Column::TokenHash.eq(token_hash))
            .exec(&self.database)
            .await?;
        Ok(())
    }
}
