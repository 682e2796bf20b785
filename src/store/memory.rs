//! In-memory identity store
//!
//! Used when no database is configured and in tests. All state sits behind a
//! single lock, so user + binding creation is atomic.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{IdentityStore, StoreError};
use crate::models::{AuthMethod, AuthType, NewAuthMethod, NewUser, User};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    bindings: HashMap<(AuthType, String), AuthMethod>,
}

impl State {
    fn username_taken(&self, username: &str) -> bool {
        self.users.values().any(|u| u.username == username)
    }

    fn insert_user(&mut self, new_user: NewUser) -> Result<User, StoreError> {
        if self.username_taken(&new_user.username) {
            return Err(StoreError::DuplicateUsername);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            role: new_user.role,
            reward_address: new_user.reward_address,
            auth_methods: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn insert_binding(&mut self, binding: NewAuthMethod) -> Result<AuthMethod, StoreError> {
        if !self.users.contains_key(&binding.user_id) {
            return Err(StoreError::Database(format!(
                "user {} does not exist",
                binding.user_id
            )));
        }

        let key = (binding.auth_type, binding.auth_identifier.clone());
        if self.bindings.contains_key(&key) {
            return Err(StoreError::DuplicateBinding);
        }

        let method = AuthMethod {
            id: Uuid::new_v4(),
            user_id: binding.user_id,
            auth_type: binding.auth_type,
            auth_identifier: binding.auth_identifier,
            created_at: Utc::now(),
        };
        self.bindings.insert(key, method.clone());
        Ok(method)
    }

    fn user_with_bindings(&self, id: Uuid) -> Option<User> {
        let mut user = self.users.get(&id)?.clone();
        let mut methods: Vec<AuthMethod> = self
            .bindings
            .values()
            .filter(|m| m.user_id == id)
            .cloned()
            .collect();
        methods.sort_by_key(|m| m.created_at);
        user.auth_methods = methods;
        Some(user)
    }
}

/// Identity store backed by process memory
#[derive(Clone, Default)]
pub struct InMemoryIdentityStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_user_by_binding(
        &self,
        auth_type: AuthType,
        identifier: &str,
    ) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        let user_id = match state.bindings.get(&(auth_type, identifier.to_string())) {
            Some(method) => method.user_id,
            None => return Ok(None),
        };
        Ok(state.user_with_bindings(user_id))
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state.read().await.user_with_bindings(id))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        self.state.write().await.insert_user(new_user)
    }

    async fn create_binding(&self, binding: NewAuthMethod) -> Result<AuthMethod, StoreError> {
        self.state.write().await.insert_binding(binding)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.users.remove(&id);
        state.bindings.retain(|_, m| m.user_id != id);
        Ok(())
    }

    async fn create_user_with_binding(
        &self,
        new_user: NewUser,
        auth_type: AuthType,
        identifier: &str,
    ) -> Result<User, StoreError> {
        let mut state = self.state.write().await;

        // Check both constraints before writing anything
        if state
            .bindings
            .contains_key(&(auth_type, identifier.to_string()))
        {
            return Err(StoreError::DuplicateBinding);
        }

        let mut user = state.insert_user(new_user)?;
        let method = state.insert_binding(NewAuthMethod {
            user_id: user.id,
            auth_type,
            auth_identifier: identifier.to_string(),
        })?;
        user.auth_methods.push(method);
        Ok(user)
    }
}
