//! Shared fixtures for router-level tests.
//!
//! Everything runs against the ephemeral backend; the storage traits make
//! the router indifferent to the swap.

use std::sync::Arc;

use auth_service::{
    routes,
    services::{Authenticator, SecurityEvents, SessionValidator, TracingEvents, TwoFactorService},
    storage::memory::{
        MemoryIdentityStore, MemoryLockoutStore, MemoryRevocationStore, MemorySecondFactorStore,
    },
    storage::LockoutPolicy,
    AppState,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use crypto_core::TokenIssuer;
use http_body_util::BodyExt;
use tower::ServiceExt;

pub const TEST_EMAIL: &str = "test@example.com";
pub const TEST_PASSWORD: &str = "SecurePass123!";

pub fn test_app() -> Router {
    let identities = Arc::new(MemoryIdentityStore::new());
    let lockouts = Arc::new(MemoryLockoutStore::new(LockoutPolicy::default()));
    let revocations = Arc::new(MemoryRevocationStore::new());
    let second_factors = Arc::new(MemorySecondFactorStore::new());

    let issuer = TokenIssuer::new(b"integration-test-secret");
    let events: Arc<dyn SecurityEvents> = Arc::new(TracingEvents);

    let state = AppState {
        authenticator: Arc::new(Authenticator::new(
            identities.clone(),
            lockouts,
            second_factors.clone(),
            issuer.clone(),
            events.clone(),
        )),
        sessions: Arc::new(SessionValidator::new(
            issuer,
            identities.clone(),
            revocations,
            events.clone(),
        )),
        two_factor: Arc::new(TwoFactorService::new(
            identities,
            second_factors,
            events,
            "Argent".to_string(),
        )),
    };

    routes::build_router(state)
}

pub async fn post_json(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    send(app, request).await
}

pub async fn post_json_auth(
    app: &Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();

    send(app, request).await
}

pub async fn post_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, body)
}

/// Register the standard test user and return its token pair body.
pub async fn register_test_user(app: &Router) -> serde_json::Value {
    let (status, body) = post_json(
        app,
        "/api/v1/auth/register",
        serde_json::json!({
            "email": TEST_EMAIL,
            "password": TEST_PASSWORD,
            "display_name": "Test User",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

pub fn current_totp(secret: &str) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    auth_service::security::totp::TotpGenerator::code_for(secret, now).unwrap()
}
