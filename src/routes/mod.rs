//! API routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{self, auth};
use crate::middleware;
use crate::state::AppState;

/// Wallet authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/user/auth/web3/challenge", get(auth::request_challenge))
        .route("/user/auth/web3/verify", post(auth::verify_signature))
        .route("/user/auth/me", get(auth::get_current_user))
}

/// Full application router with request tracing
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(auth_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::request_tracing))
}
