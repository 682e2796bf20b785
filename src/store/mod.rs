//! Identity store
//!
//! Owns users and their auth bindings. The authentication service only reads
//! and creates records through [`IdentityStore`].

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AuthMethod, AuthType, NewAuthMethod, NewUser, User};

mod memory;
mod postgres;

pub use memory::InMemoryIdentityStore;
pub use postgres::PgIdentityStore;

/// Identity store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Auth method already bound to a user")]
    DuplicateBinding,

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return match db_err.constraint() {
                    Some(postgres::USERNAME_CONSTRAINT) => StoreError::DuplicateUsername,
                    _ => StoreError::DuplicateBinding,
                };
            }
        }
        StoreError::Database(e.to_string())
    }
}

/// Persistence operations needed by wallet authentication.
///
/// "Not found" is `Ok(None)`; `Err` always means the store itself failed or
/// rejected the write.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find the user owning the binding `(auth_type, identifier)`
    async fn find_user_by_binding(
        &self,
        auth_type: AuthType,
        identifier: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Find a user with all of its bindings
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn create_binding(&self, binding: NewAuthMethod) -> Result<AuthMethod, StoreError>;

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError>;

    /// Create a user together with its first binding as one unit.
    ///
    /// This default runs the two writes in sequence and deletes the new user if
    /// the binding cannot be created. Stores with transactions override it.
    async fn create_user_with_binding(
        &self,
        new_user: NewUser,
        auth_type: AuthType,
        identifier: &str,
    ) -> Result<User, StoreError> {
        let mut user = self.create_user(new_user).await?;

        let binding = NewAuthMethod {
            user_id: user.id,
            auth_type,
            auth_identifier: identifier.to_string(),
        };

        match self.create_binding(binding).await {
            Ok(method) => {
                user.auth_methods.push(method);
                Ok(user)
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user.id,
                    auth_type = auth_type.as_str(),
                    error = %e,
                    "Binding failed, removing orphaned user"
                );
                if let Err(cleanup) = self.delete_user(user.id).await {
                    tracing::error!(user_id = %user.id, error = %cleanup, "Failed to remove orphaned user");
                }
                Err(e)
            }
        }
    }

    /// Liveness check backing `/health`
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
