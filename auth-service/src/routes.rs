/// Route definitions and middleware setup
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{
        disable_two_factor, enable_two_factor, login, login_with_backup_code, login_with_totp,
        logout, me, refresh_token, register, verify_two_factor,
    },
    metrics, openapi, AppState,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Authentication endpoints
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/login/2fa", post(login_with_totp))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/refresh", post(refresh_token))
        .route("/api/v1/auth/me", get(me))
        // Second-factor lifecycle
        .route("/api/v1/auth/2fa/enable", post(enable_two_factor))
        .route("/api/v1/auth/2fa/verify", post(verify_two_factor))
        .route("/api/v1/auth/2fa/disable", post(disable_two_factor))
        .route("/api/v1/auth/2fa/backup-code", post(login_with_backup_code))
        // Health & observability
        .route("/health", get(health_check))
        .route("/readiness", get(readiness_check))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/api-docs/openapi.json", get(openapi::openapi_json))
        .layer(middleware::from_fn(metrics::track_http_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness_check() -> &'static str {
    "READY"
}
