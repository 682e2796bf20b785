//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{AuthService, SessionIssuer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub session_issuer: Arc<SessionIssuer>,
    /// Mark the session cookie `Secure` (production only)
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(
        auth_service: Arc<AuthService>,
        session_issuer: Arc<SessionIssuer>,
        secure_cookies: bool,
    ) -> Self {
        Self {
            auth_service,
            session_issuer,
            secure_cookies,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<SessionIssuer> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.session_issuer.clone()
    }
}
