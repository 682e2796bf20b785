//! MCPForge auth server
//!
//! Serves the wallet challenge/verify endpoints and runs the nonce sweeper.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

use mcpforge_auth::auth::{nonce_sweeper, AuthService, NonceRegistry, SessionIssuer};
use mcpforge_auth::config::Config;
use mcpforge_auth::db;
use mcpforge_auth::routes;
use mcpforge_auth::state::AppState;
use mcpforge_auth::store::{IdentityStore, InMemoryIdentityStore, PgIdentityStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .with_line_number(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting MCPForge auth server");

    let store: Arc<dyn IdentityStore> = match db::connect(&config).await? {
        Some(pool) => Arc::new(PgIdentityStore::new(pool)),
        None => {
            tracing::warn!("DATABASE_URL not set, users are kept in memory only");
            Arc::new(InMemoryIdentityStore::new())
        }
    };

    let nonces = Arc::new(NonceRegistry::new(config.auth_nonce_ttl_seconds));

    let auth_service = Arc::new(AuthService::new(
        nonces.clone(),
        store,
        config.allow_self_assigned_role,
    ));
    let session_issuer = Arc::new(SessionIssuer::new(
        config.jwt_secret.clone(),
        config.jwt_expires_in_hours,
    ));

    let app_state = AppState::new(
        auth_service,
        session_issuer,
        config.environment.is_production(),
    );

    // Reclaim expired challenges in the background
    let sweep_interval = Duration::from_secs(config.nonce_sweep_interval_seconds.max(1));
    tokio::spawn(async move {
        nonce_sweeper(nonces, sweep_interval).await;
    });

    let app = routes::create_router(app_state)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_seconds,
        )))
        .layer(configure_cors(config.cors_allowed_origins.as_deref()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    // The session cookie needs credentialed requests, which rule out wildcard headers
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
