use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, prelude::*};

use crate::{EngineError, NewUser, ResultEngine, users};

use super::Engine;

impl Engine {
    /// Creates a user. The email is normalized (trimmed, lower-cased); a
    /// user with the same email already present fails with `UserExists`.
    pub async fn create_user(&self, new_user: NewUser) -> ResultEngine<users::Model> {
        let email = new_user.email.trim().to_ascii_lowercase();
        if email.is_empty() {
            return Err(EngineError::BadRequest("email cannot be empty".to_string()));
        }

        let existing = users::Entity::find()
            .filter(users::Column::Email.eq(email.clone()))
            .one(&self.database)
            .await?;
        if existing.is_some() {
            return Err(EngineError::UserExists);
        }

        let now = Utc::now();
        let model = users::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            email: ActiveValue::Set(email),
            password_hash: ActiveValue::Set(new_user.password_hash),
            first_name: ActiveValue::Set(new_user.first_name),
            last_name: ActiveValue::Set(new_user.last_name),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        Ok(model.insert(&self.database).await?)
    }

    /// Looks a user up by normalized email.
    pub async fn user_by_email(&self, email: &str) -> ResultEngine<users::Model> {
        let email = email.trim().to_ascii_lowercase();
        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.database)
            .await?
            .ok_or(EngineError::UserNotFound)
    }

    pub async fn user_by_id(&self, id: Uuid) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .ok_or(EngineError::UserNotFound)
    }
}
