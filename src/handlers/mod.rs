//! HTTP handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::state::AppState;

pub mod auth;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    identity_store: String,
    version: String,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, code, store) = if state.auth_service.store_healthy().await {
        ("healthy", StatusCode::OK, "connected")
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE, "unreachable")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            identity_store: store.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
