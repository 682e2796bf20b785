//! Authentication HTTP handlers
//!
//! Endpoints for wallet-based authentication.

use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{session_cookie, AuthenticatedUser};
use crate::models::{ChallengeQuery, ChallengeResponse, User, VerifyRequest, VerifyResponse};
use crate::state::AppState;

/// GET /user/auth/web3/challenge - Request a nonce for wallet authentication
pub async fn request_challenge(
    State(state): State<AppState>,
    Query(query): Query<ChallengeQuery>,
) -> ApiResult<Json<ChallengeResponse>> {
    query.validate()?;

    let challenge = state.auth_service.request_challenge(&query.address).await?;

    Ok(Json(ChallengeResponse {
        nonce: challenge.nonce,
        expires_at: challenge.expires_at,
    }))
}

/// POST /user/auth/web3/verify - Verify signed nonce, log in or register, issue a session
pub async fn verify_signature(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<(CookieJar, Json<VerifyResponse>)> {
    req.validate()?;

    let outcome = state.auth_service.authenticate(&req).await?;

    let token = state.session_issuer.issue(&outcome.user)?;
    let jar = CookieJar::new().add(session_cookie(
        token,
        state.session_issuer.ttl(),
        state.secure_cookies,
    ));

    Ok((jar, Json(outcome.into())))
}

/// GET /user/auth/me - Get current authenticated user
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<User>> {
    let found = state
        .auth_service
        .get_user(user.user_id)
        .await?
        .ok_or_else(|| {
            tracing::debug!(
                user_id = %user.user_id,
                username = %user.username,
                "Session user no longer exists"
            );
            ApiError::NotFound("User not found".to_string())
        })?;

    if found.role != user.role {
        tracing::debug!(
            user_id = %user.user_id,
            session_role = user.role.as_str(),
            current_role = found.role.as_str(),
            "Role changed since session was issued"
        );
    }

    Ok(Json(found))
}
