//! Configuration management for the MCPForge auth service
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).

use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

use crate::auth::DEFAULT_NONCE_TTL_SECONDS;

const DEV_JWT_SECRET: &str = "development-secret-change-in-production";

/// Accepted `AUTH_NONCE_TTL_SECONDS`, up to one day
const NONCE_TTL_RANGE: RangeInclusive<i64> = 1..=86_400;

/// Accepted `JWT_EXPIRES_IN_HOURS`, up to one year
const JWT_LIFETIME_RANGE: RangeInclusive<i64> = 1..=8_760;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// Database connection URL; the in-memory identity store is used when unset
    pub database_url: Option<String>,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// CORS allowed origins
    pub cors_allowed_origins: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// JWT secret for session tokens
    pub jwt_secret: String,

    /// Session token lifetime in hours (default: 24)
    pub jwt_expires_in_hours: i64,

    /// Auth nonce TTL in seconds (default: 300 = 5 minutes)
    pub auth_nonce_ttl_seconds: i64,

    /// How often expired nonces are swept (default: 60)
    pub nonce_sweep_interval_seconds: u64,

    /// Per-request timeout (default: 10)
    pub request_timeout_seconds: u64,

    /// Honor a client-supplied role on first registration (default: false)
    pub allow_self_assigned_role: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .map(|s| s.parse::<Environment>())
            .unwrap_or(Ok(Environment::Development))?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", 5);

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS").ok();

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if environment.is_production() => {
                return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()))
            }
            _ => DEV_JWT_SECRET.to_string(),
        };

        let jwt_expires_in_hours = parse_bounded(
            "JWT_EXPIRES_IN_HOURS",
            env::var("JWT_EXPIRES_IN_HOURS").ok(),
            24,
            JWT_LIFETIME_RANGE,
        )?;

        let auth_nonce_ttl_seconds = parse_bounded(
            "AUTH_NONCE_TTL_SECONDS",
            env::var("AUTH_NONCE_TTL_SECONDS").ok(),
            DEFAULT_NONCE_TTL_SECONDS,
            NONCE_TTL_RANGE,
        )?;

        let nonce_sweep_interval_seconds = parse_or("NONCE_SWEEP_INTERVAL_SECONDS", 60);

        let request_timeout_seconds = parse_or("REQUEST_TIMEOUT_SECONDS", 10);

        let allow_self_assigned_role = env::var("ALLOW_SELF_ASSIGNED_ROLE")
            .map(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Config {
            environment,
            port,
            database_url,
            db_max_connections,
            cors_allowed_origins,
            log_level,
            jwt_secret,
            jwt_expires_in_hours,
            auth_nonce_ttl_seconds,
            nonce_sweep_interval_seconds,
            request_timeout_seconds,
            allow_self_assigned_role,
        })
    }

    /// Get database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> Option<String> {
        let url = self.database_url.as_ref()?;

        if let Some(at_pos) = url.find('@') {
            if let Some(colon_pos) = url[..at_pos].rfind(':') {
                let prefix = &url[..colon_pos + 1];
                let suffix = &url[at_pos..];
                return Some(format!("{}****{}", prefix, suffix));
            }
        }
        Some(url.clone())
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

/// Parse an optional integer setting that must fall inside `range`
fn parse_bounded(
    key: &str,
    raw: Option<String>,
    default: i64,
    range: RangeInclusive<i64>,
) -> Result<i64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    match raw.trim().parse::<i64>() {
        Ok(value) if range.contains(&value) => Ok(value),
        _ => Err(ConfigError::InvalidValue(format!(
            "{} must be an integer between {} and {}, got '{}'",
            key,
            range.start(),
            range.end(),
            raw
        ))),
    }
}
