//! Prometheus counters for the authentication flow.

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, TextEncoder};

fn register_counter(name: &str, help: &str) -> IntCounter {
    match IntCounter::new(name, help) {
        Ok(counter) => {
            let _ = prometheus::default_registry().register(Box::new(counter.clone()));
            counter
        }
        Err(err) => {
            tracing::error!("failed to create counter {name}: {err}");
            IntCounter::new("noop", "noop").expect("noop counter")
        }
    }
}

pub static LOGIN_SUCCESSES: Lazy<IntCounter> = Lazy::new(|| {
    register_counter("auth_login_success_total", "Successful logins")
});

pub static LOGIN_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_counter("auth_login_failure_total", "Failed login attempts")
});

pub static ACCOUNT_LOCKOUTS: Lazy<IntCounter> = Lazy::new(|| {
    register_counter(
        "auth_account_lockouts_total",
        "Accounts locked after repeated failures",
    )
});

pub static TOKEN_REVOCATIONS: Lazy<IntCounter> = Lazy::new(|| {
    register_counter("auth_token_revocations_total", "Tokens revoked")
});

static HTTP_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    let opts = Opts::new("http_requests_total", "HTTP requests by method and status");
    match IntCounterVec::new(opts, &["method", "status"]) {
        Ok(vec) => {
            let _ = prometheus::default_registry().register(Box::new(vec.clone()));
            vec
        }
        Err(err) => {
            tracing::error!("failed to create http_requests_total: {err}");
            IntCounterVec::new(Opts::new("noop_vec", "noop"), &["method", "status"])
                .expect("noop counter vec")
        }
    }
});

/// Request-counting middleware.
pub async fn track_http_metrics(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let response = next.run(req).await;

    HTTP_REQUESTS
        .with_label_values(&[method.as_str(), response.status().as_str()])
        .inc();
    response
}

/// Handler that serialises Prometheus metrics in text format.
pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            [("content-type", encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(err) => (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            err.to_string(),
        )
            .into_response(),
    }
}
