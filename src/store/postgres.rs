//! PostgreSQL identity store

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::{IdentityStore, StoreError};
use crate::models::{AuthMethod, AuthType, NewAuthMethod, NewUser, User};

/// Unique constraint on `users.username` (see migrations)
pub(super) const USERNAME_CONSTRAINT: &str = "users_username_key";

const USER_COLUMNS: &str = "id, username, email, role, reward_address, created_at, updated_at";

/// Identity store backed by the `users` and `auth_methods` tables
#[derive(Clone)]
pub struct PgIdentityStore {
    db_pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    async fn load_auth_methods(&self, user: &mut User) -> Result<(), StoreError> {
        user.auth_methods = sqlx::query_as(
            r#"
            SELECT id, user_id, auth_type, auth_identifier, created_at
            FROM auth_methods
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user.id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(())
    }
}

async fn insert_user<'e>(
    executor: impl PgExecutor<'e>,
    new_user: &NewUser,
) -> Result<User, StoreError> {
    let now = Utc::now();
    let user: User = sqlx::query_as(&format!(
        r#"
        INSERT INTO users (id, username, email, role, reward_address, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(&new_user.username)
    .bind(&new_user.email)
    .bind(new_user.role)
    .bind(&new_user.reward_address)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(user)
}

async fn insert_auth_method<'e>(
    executor: impl PgExecutor<'e>,
    binding: &NewAuthMethod,
) -> Result<AuthMethod, StoreError> {
    let method: AuthMethod = sqlx::query_as(
        r#"
        INSERT INTO auth_methods (id, user_id, auth_type, auth_identifier, created_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, auth_type, auth_identifier, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(binding.user_id)
    .bind(binding.auth_type)
    .bind(&binding.auth_identifier)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?;

    Ok(method)
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_user_by_binding(
        &self,
        auth_type: AuthType,
        identifier: &str,
    ) -> Result<Option<User>, StoreError> {
        let user: Option<User> = sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.email, u.role, u.reward_address, u.created_at, u.updated_at
            FROM users u
            JOIN auth_methods a ON a.user_id = u.id
            WHERE a.auth_type = $1 AND a.auth_identifier = $2
            "#,
        )
        .bind(auth_type)
        .bind(identifier)
        .fetch_optional(&self.db_pool)
        .await?;

        match user {
            Some(mut user) => {
                self.load_auth_methods(&mut user).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user: Option<User> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.db_pool)
                .await?;

        match user {
            Some(mut user) => {
                self.load_auth_methods(&mut user).await?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        insert_user(&self.db_pool, &new_user).await
    }

    async fn create_binding(&self, binding: NewAuthMethod) -> Result<AuthMethod, StoreError> {
        insert_auth_method(&self.db_pool, &binding).await
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        // auth_methods rows go with it (ON DELETE CASCADE)
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        Ok(())
    }

    async fn create_user_with_binding(
        &self,
        new_user: NewUser,
        auth_type: AuthType,
        identifier: &str,
    ) -> Result<User, StoreError> {
        let mut tx = self.db_pool.begin().await?;

        let mut user = insert_user(&mut *tx, &new_user).await?;
        let method = insert_auth_method(
            &mut *tx,
            &NewAuthMethod {
                user_id: user.id,
                auth_type,
                auth_identifier: identifier.to_string(),
            },
        )
        .await?;

        tx.commit().await?;

        user.auth_methods.push(method);
        Ok(user)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::db::check_health(&self.db_pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}
