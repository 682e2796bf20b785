//! Wallet authentication models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use validator::Validate;

use super::{User, UserRole};

/// What the authentication attempt did for the caller
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthAction {
    Login,
    Register,
}

impl AuthAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthAction::Login => "login",
            AuthAction::Register => "register",
        }
    }

    /// Human-readable result message
    pub fn message(&self) -> &'static str {
        match self {
            AuthAction::Login => "Web3 authentication successful",
            AuthAction::Register => "User registered and authenticated successfully",
        }
    }
}

/// Result of a successful authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub action: AuthAction,
    pub user: User,
    pub message: String,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Query for `GET /user/auth/web3/challenge`
#[derive(Debug, Deserialize, Validate)]
pub struct ChallengeQuery {
    #[validate(length(min = 1, message = "Address parameter is required"))]
    #[serde(default)]
    pub address: String,
}

/// Response containing the authentication challenge
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

/// Request to verify a signed challenge
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct VerifyRequest {
    #[validate(length(min = 1, message = "address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "signature is required"))]
    pub signature: String,
    #[validate(length(min = 1, message = "nonce is required"))]
    pub nonce: String,
    #[validate(length(max = 64))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub reward_address: Option<String>,
}

/// Response for a verified wallet
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub action: AuthAction,
    pub user: User,
    pub message: String,
}

impl From<AuthOutcome> for VerifyResponse {
    fn from(outcome: AuthOutcome) -> Self {
        Self {
            success: true,
            action: outcome.action,
            user: outcome.user,
            message: outcome.message,
        }
    }
}
