//! HTTP surface tests driven through the router with `oneshot`

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use k256::ecdsa::SigningKey;
use serde_json::{json, Value};
use tower::ServiceExt;

use mcpforge_auth::auth::{
    hash_personal_message, AuthService, NonceRegistry, SessionIssuer, DEFAULT_NONCE_TTL_SECONDS,
};
use mcpforge_auth::routes::create_router;
use mcpforge_auth::state::AppState;
use mcpforge_auth::store::InMemoryIdentityStore;

const WALLET_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const WALLET_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

fn app() -> Router {
    let nonces = Arc::new(NonceRegistry::new(DEFAULT_NONCE_TTL_SECONDS));
    let store = Arc::new(InMemoryIdentityStore::new());
    let auth_service = Arc::new(AuthService::new(nonces, store, false));
    let session_issuer = Arc::new(SessionIssuer::new("test-secret", 24));
    create_router(AppState::new(auth_service, session_issuer, false))
}

fn sign(message: &str) -> String {
    let key = SigningKey::from_slice(&hex::decode(WALLET_KEY).unwrap()).unwrap();
    let (signature, recovery_id) = key
        .sign_prehash_recoverable(&hash_personal_message(message))
        .unwrap();

    let mut bytes = signature.to_bytes().to_vec();
    bytes.push(recovery_id.to_byte() + 27);
    format!("0x{}", hex::encode(bytes))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: &Router, uri: &str, body: Value) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn fetch_nonce(app: &Router) -> String {
    let response = get(
        app,
        &format!("/user/auth/web3/challenge?address={}", WALLET_ADDRESS),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    body["nonce"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let response = get(&app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_challenge_returns_nonce_and_expiry() {
    let app = app();
    let response = get(
        &app,
        &format!("/user/auth/web3/challenge?address={}", WALLET_ADDRESS),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["nonce"]
        .as_str()
        .unwrap()
        .starts_with("Login to MCPForge at "));
    assert!(body["expires_at"].is_string());
}

#[tokio::test]
async fn test_challenge_rejects_bad_address() {
    let app = app();

    let response = get(&app, "/user/auth/web3/challenge?address=0x1234").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get(&app, "/user/auth/web3/challenge").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_registers_and_sets_cookie() {
    let app = app();
    let nonce = fetch_nonce(&app).await;

    let response = post_json(
        &app,
        "/user/auth/web3/verify",
        json!({
            "address": WALLET_ADDRESS,
            "signature": sign(&nonce),
            "nonce": nonce,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("auth_token="));
    assert!(cookie.contains("HttpOnly"));

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["action"], "register");
    assert_eq!(body["user"]["username"], WALLET_ADDRESS);
    assert_eq!(
        body["message"],
        "User registered and authenticated successfully"
    );
}

#[tokio::test]
async fn test_verify_bad_signature_is_generic_401() {
    let app = app();
    let nonce = fetch_nonce(&app).await;

    let response = post_json(
        &app,
        "/user/auth/web3/verify",
        json!({
            "address": WALLET_ADDRESS,
            "signature": format!("0x{}", "11".repeat(65)),
            "nonce": nonce,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bad_signature = body_json(response).await;

    // Unknown nonce produces the same body
    let response = post_json(
        &app,
        "/user/auth/web3/verify",
        json!({
            "address": WALLET_ADDRESS,
            "signature": sign("never issued"),
            "nonce": "never issued",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bad_nonce = body_json(response).await;

    assert_eq!(bad_signature, bad_nonce);
    assert_eq!(bad_signature["error"]["message"], "Authentication failed");
}

#[tokio::test]
async fn test_verify_missing_fields_is_validation_error() {
    let app = app();

    let response = post_json(
        &app,
        "/user/auth/web3/verify",
        json!({ "address": WALLET_ADDRESS, "signature": "", "nonce": "" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "VALIDATION_ERROR"
    );
}

#[tokio::test]
async fn test_me_with_session_cookie() {
    let app = app();
    let nonce = fetch_nonce(&app).await;

    let response = post_json(
        &app,
        "/user/auth/web3/verify",
        json!({
            "address": WALLET_ADDRESS,
            "signature": sign(&nonce),
            "nonce": nonce,
        }),
    )
    .await;
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let cookie = set_cookie.split(';').next().unwrap().to_string();
    let token = cookie.trim_start_matches("auth_token=").to_string();

    let by_cookie = app
        .clone()
        .oneshot(
            Request::get("/user/auth/me")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(by_cookie.status(), StatusCode::OK);
    assert_eq!(body_json(by_cookie).await["username"], WALLET_ADDRESS);

    let by_bearer = app
        .clone()
        .oneshot(
            Request::get("/user/auth/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(by_bearer.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_requires_session() {
    let app = app();

    let response = get(&app, "/user/auth/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::get("/user/auth/me")
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
