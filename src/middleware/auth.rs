//! Authentication middleware
//!
//! Extracts the session credential from `Authorization: Bearer` or the
//! `auth_token` cookie.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    extract::cookie::{Cookie, CookieJar, SameSite},
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{JwtError, SessionIssuer};
use crate::models::UserRole;

/// Cookie carrying the session credential
pub const AUTH_COOKIE: &str = "auth_token";

/// Authenticated user extracted from the session token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

/// Error response for authentication failures
#[derive(Debug, Serialize)]
struct AuthRejection {
    error: AuthRejectionDetails,
}

#[derive(Debug, Serialize)]
struct AuthRejectionDetails {
    code: String,
    message: String,
}

impl AuthRejection {
    fn new(code: &str, message: &str) -> Self {
        Self {
            error: AuthRejectionDetails {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<SessionIssuer>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let bearer = TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string());

        let token = bearer
            .or_else(|| {
                CookieJar::from_headers(&parts.headers)
                    .get(AUTH_COOKIE)
                    .map(|cookie| cookie.value().to_string())
            })
            .ok_or_else(|| {
                AuthRejection::new("MISSING_TOKEN", "Authentication required").into_response()
            })?;

        let issuer = Arc::<SessionIssuer>::from_ref(state);

        let claims = issuer.verify(&token).map_err(|e| {
            let (code, message) = match e {
                JwtError::TokenExpired => ("TOKEN_EXPIRED", "Token has expired"),
                _ => ("INVALID_TOKEN", "Invalid or expired token"),
            };
            AuthRejection::new(code, message).into_response()
        })?;

        let user_id = claims.user_id().map_err(|_| {
            AuthRejection::new("INVALID_TOKEN", "Invalid user ID in token").into_response()
        })?;

        let role = claims.role().map_err(|_| {
            AuthRejection::new("INVALID_TOKEN", "Invalid role in token").into_response()
        })?;

        Ok(AuthenticatedUser {
            user_id,
            username: claims.username,
            role,
        })
    }
}

/// Session cookie for a freshly issued token
pub fn session_cookie(token: String, ttl: chrono::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionIssuer;
    use crate::models::User;
    use axum::http::{header, Request};

    struct TestState(Arc<SessionIssuer>);

    impl FromRef<TestState> for Arc<SessionIssuer> {
        fn from_ref(state: &TestState) -> Self {
            state.0.clone()
        }
    }

    fn issued_token(issuer: &SessionIssuer) -> (User, String) {
        let now = chrono::Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23".to_string(),
            email: None,
            role: UserRole::Developer,
            reward_address: None,
            auth_methods: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let token = issuer.issue(&user).unwrap();
        (user, token)
    }

    #[tokio::test]
    async fn test_extracts_session_from_cookie() {
        let state = TestState(Arc::new(SessionIssuer::new("test-secret", 24)));
        let (user, token) = issued_token(&state.0);

        let (mut parts, _) = Request::builder()
            .header(
                header::COOKIE,
                format!("theme=dark; {}={}; lang=en", AUTH_COOKIE, token),
            )
            .body(())
            .unwrap()
            .into_parts();

        let extracted = AuthenticatedUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(extracted.user_id, user.id);
        assert_eq!(extracted.username, user.username);
        assert_eq!(extracted.role, UserRole::Developer);
    }

    #[tokio::test]
    async fn test_missing_session_rejected() {
        let state = TestState(Arc::new(SessionIssuer::new("test-secret", 24)));
        let (mut parts, _) = Request::builder()
            .header(header::COOKIE, "theme=dark")
            .body(())
            .unwrap()
            .into_parts();

        let rejection = AuthenticatedUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_session_cookie_flags() {
        let cookie = session_cookie("tok".to_string(), chrono::Duration::hours(1), true);
        assert_eq!(cookie.name(), AUTH_COOKIE);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(1)));

        let rendered = cookie.to_string();
        assert!(rendered.starts_with("auth_token=tok"));
        assert!(rendered.contains("Max-Age=3600"));

        let insecure = session_cookie("tok".to_string(), chrono::Duration::hours(1), false);
        assert_ne!(insecure.secure(), Some(true));
    }
}
