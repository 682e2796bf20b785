//! Authentication service
//!
//! Core business logic for wallet-based authentication: issue a challenge,
//! consume it, check the signature, then log the wallet in or register it.

use std::sync::Arc;

use thiserror::Error;

use crate::models::{AuthAction, AuthOutcome, AuthType, NewUser, User, UserRole, VerifyRequest};
use crate::store::{IdentityStore, StoreError};

use super::address::Address;
use super::crypto::verify_signature;
use super::nonce::{Challenge, NonceRegistry};

/// Auth service errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid wallet address")]
    InvalidAddress,

    #[error("Invalid or expired nonce")]
    InvalidOrExpiredNonce,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Identity conflict: {0}")]
    IdentityConflict(String),

    #[error("Identity store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateUsername => {
                AuthError::IdentityConflict("Username already exists".to_string())
            }
            StoreError::DuplicateBinding => {
                AuthError::IdentityConflict("Wallet already linked to another user".to_string())
            }
            other => AuthError::Store(other),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    nonces: Arc<NonceRegistry>,
    store: Arc<dyn IdentityStore>,
    allow_self_assigned_role: bool,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        nonces: Arc<NonceRegistry>,
        store: Arc<dyn IdentityStore>,
        allow_self_assigned_role: bool,
    ) -> Self {
        Self {
            nonces,
            store,
            allow_self_assigned_role,
        }
    }

    /// Generate a nonce challenge for wallet authentication
    pub async fn request_challenge(&self, address: &str) -> Result<Challenge, AuthError> {
        self.nonces
            .issue_challenge(address)
            .await
            .map_err(|_| AuthError::InvalidAddress)
    }

    /// Verify a signed challenge and log in or register the wallet owner
    pub async fn authenticate(&self, req: &VerifyRequest) -> Result<AuthOutcome, AuthError> {
        let address = Address::parse(&req.address).map_err(|_| AuthError::InvalidAddress)?;

        // Consume first so a nonce can never be tried twice, even with a bad signature
        if !self
            .nonces
            .verify_and_consume(address.as_str(), &req.nonce)
            .await
        {
            tracing::debug!(address = %address, "Rejected nonce");
            return Err(AuthError::InvalidOrExpiredNonce);
        }

        // The nonce text itself is the signed payload
        if !verify_signature(&req.nonce, &req.signature, address.as_str()) {
            tracing::warn!(address = %address, "Signature does not match wallet");
            return Err(AuthError::InvalidSignature);
        }

        let existing = self
            .store
            .find_user_by_binding(AuthType::Web3, address.as_str())
            .await?;

        let (action, user) = match existing {
            Some(user) => (AuthAction::Login, self.reload(user).await?),
            None => self.register(&address, req).await?,
        };

        tracing::info!(
            address = %address,
            user_id = %user.id,
            action = action.as_str(),
            "Wallet authenticated"
        );

        Ok(AuthOutcome {
            action,
            message: action.message().to_string(),
            user,
        })
    }

    /// Fetch a user with all of its bindings
    pub async fn get_user(&self, id: uuid::Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.store.find_user_by_id(id).await?)
    }

    /// Whether the identity store is reachable
    pub async fn store_healthy(&self) -> bool {
        self.store.ping().await.is_ok()
    }

    async fn register(
        &self,
        address: &Address,
        req: &VerifyRequest,
    ) -> Result<(AuthAction, User), AuthError> {
        let username = req
            .username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(address.as_str())
            .to_string();

        let new_user = NewUser {
            username,
            email: req.email.clone(),
            role: self.registration_role(address, req.role),
            reward_address: req.reward_address.clone(),
        };

        match self
            .store
            .create_user_with_binding(new_user, AuthType::Web3, address.as_str())
            .await
        {
            Ok(user) => Ok((AuthAction::Register, self.reload(user).await?)),
            // A concurrent registration of this wallet can surface as either
            // constraint, depending on which insert the store runs first
            Err(e @ (StoreError::DuplicateBinding | StoreError::DuplicateUsername)) => {
                match self
                    .store
                    .find_user_by_binding(AuthType::Web3, address.as_str())
                    .await?
                {
                    Some(user) => {
                        tracing::info!(address = %address, "Concurrent registration resolved as login");
                        Ok((AuthAction::Login, user))
                    }
                    None => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn registration_role(&self, address: &Address, requested: Option<UserRole>) -> UserRole {
        match requested {
            Some(role) if self.allow_self_assigned_role => role,
            Some(role) if role != UserRole::default() => {
                tracing::warn!(
                    address = %address,
                    requested = role.as_str(),
                    "Ignoring self-assigned role on registration"
                );
                UserRole::default()
            }
            _ => UserRole::default(),
        }
    }

    async fn reload(&self, user: User) -> Result<User, AuthError> {
        Ok(self.store.find_user_by_id(user.id).await?.unwrap_or(user))
    }
}
