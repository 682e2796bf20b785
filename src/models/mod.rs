//! Data models for the MCPForge auth service

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod auth;
pub use auth::*;

/// User model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub reward_address: Option<String>,
    #[sqlx(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auth_methods: Vec<AuthMethod>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User roles
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Default)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Developer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Developer => "developer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(UserRole::User),
            "developer" => Some(UserRole::Developer),
            _ => None,
        }
    }
}

/// Kind of external identity bound to a user
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Hash)]
#[sqlx(type_name = "auth_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    Web3,
    Google,
    Github,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Web3 => "web3",
            AuthType::Google => "google",
            AuthType::Github => "github",
        }
    }
}

/// Binding between an external identity and a user
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq, Eq)]
pub struct AuthMethod {
    pub id: Uuid,
    pub user_id: Uuid,
    pub auth_type: AuthType,
    pub auth_identifier: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for a user that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub role: UserRole,
    pub reward_address: Option<String>,
}

/// Fields for a binding that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthMethod {
    pub user_id: Uuid,
    pub auth_type: AuthType,
    pub auth_identifier: String,
}
