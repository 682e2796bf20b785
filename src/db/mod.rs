//! Postgres backing for the identity store
//!
//! The database is optional. Without `DATABASE_URL` the service keeps users in
//! memory and nothing here runs.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Cannot reach identity database: {0}")]
    Connect(String),

    #[error("Identity schema migration failed: {0}")]
    Migrate(String),

    #[error("Identity database health check failed: {0}")]
    HealthCheck(String),
}

/// Open the configured identity database and bring its schema up to date.
///
/// Returns `Ok(None)` when no database is configured.
pub async fn connect(config: &Config) -> Result<Option<PgPool>, DbError> {
    let Some(url) = config.database_url.as_deref() else {
        return Ok(None);
    };

    tracing::info!(
        url = %config.database_url_masked().unwrap_or_default(),
        max_connections = config.db_max_connections,
        "Connecting to identity database"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(url)
        .await
        .map_err(|e| DbError::Connect(e.to_string()))?;

    run_migrations(&pool).await?;

    Ok(Some(pool))
}

/// Apply `migrations/` (users, auth_methods)
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::Migrate(e.to_string()))?;

    tracing::info!("Identity schema is up to date");
    Ok(())
}

/// Round-trip a trivial query
pub async fn check_health(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
        .map_err(|e| DbError::HealthCheck(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    #[tokio::test]
    async fn test_connect_without_database_url() {
        let config = Config {
            environment: Environment::Development,
            port: 8080,
            database_url: None,
            db_max_connections: 5,
            cors_allowed_origins: None,
            log_level: "info".to_string(),
            jwt_secret: "test-secret".to_string(),
            jwt_expires_in_hours: 24,
            auth_nonce_ttl_seconds: 300,
            nonce_sweep_interval_seconds: 60,
            request_timeout_seconds: 10,
            allow_self_assigned_role: false,
        };

        assert!(connect(&config).await.unwrap().is_none());
    }
}
