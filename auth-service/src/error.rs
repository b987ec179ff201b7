use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Expected, user-facing rejection reasons plus the internal fault bucket.
///
/// Everything except the last three variants is part of the API contract
/// and maps to a stable status code and JSON body. Internal faults are
/// logged in full and surface only as an opaque message with a
/// correlation id.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong password or unknown identity; the two are indistinguishable
    /// from the outside. Carries the remaining attempt budget so callers
    /// branch on data rather than parsing messages.
    #[error("Invalid credentials")]
    InvalidCredentials { attempts_remaining: Option<u32> },

    #[error("Account locked for {remaining_seconds} seconds")]
    AccountLocked { remaining_seconds: u64 },

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Email already registered")]
    EmailAlreadyExists,

    #[error("Password too weak: {0}")]
    WeakPassword(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Second factor required")]
    SecondFactorRequired,

    #[error("Invalid second factor code")]
    InvalidSecondFactorCode,

    #[error("Second factor not enabled")]
    SecondFactorNotEnabled,

    #[error("Malformed token")]
    TokenMalformed,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Wrong token type")]
    WrongTokenType,

    #[error("Unknown subject")]
    UnknownSubject,

    /// A bounded-timeout storage call did not complete in time.
    #[error("Storage unavailable")]
    StorageUnavailable,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl AuthError {
    fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials { .. }
            | AuthError::SecondFactorRequired
            | AuthError::InvalidSecondFactorCode
            | AuthError::SecondFactorNotEnabled
            | AuthError::TokenMalformed
            | AuthError::TokenExpired
            | AuthError::TokenRevoked
            | AuthError::WrongTokenType
            | AuthError::UnknownSubject => StatusCode::UNAUTHORIZED,
            AuthError::AccountLocked { .. } => StatusCode::LOCKED,
            AuthError::AccountDisabled
            | AuthError::WeakPassword(_)
            | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::EmailAlreadyExists => StatusCode::CONFLICT,
            AuthError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Database(_) | AuthError::Cache(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AuthError::InvalidCredentials { attempts_remaining } => {
                // Identical message shape whether the identity exists or
                // not; only the remaining budget varies.
                let message = match attempts_remaining {
                    Some(remaining) if *remaining <= 2 => format!(
                        "Invalid email or password. {remaining} attempts remaining before account lockout."
                    ),
                    _ => "Invalid email or password".to_string(),
                };
                json!({
                    "error": message,
                    "code": status.as_u16(),
                    "attempts_remaining": attempts_remaining,
                })
            }
            AuthError::AccountLocked { remaining_seconds } => json!({
                "error": format!(
                    "Account locked due to multiple failed login attempts. Try again in {remaining_seconds} seconds."
                ),
                "code": status.as_u16(),
                "locked_for_seconds": remaining_seconds,
            }),
            AuthError::Database(detail)
            | AuthError::Cache(detail)
            | AuthError::Internal(detail) => {
                // Full detail stays server-side; the caller gets an opaque
                // message plus an id to quote when reporting the problem.
                let correlation_id = Uuid::new_v4();
                tracing::error!(%correlation_id, detail = %detail, "internal error");
                json!({
                    "error": "Internal server error",
                    "code": status.as_u16(),
                    "correlation_id": correlation_id,
                })
            }
            other => json!({
                "error": other.to_string(),
                "code": status.as_u16(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => AuthError::StorageUnavailable,
            err => AuthError::Database(err.to_string()),
        }
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() || err.is_connection_refusal() || err.is_connection_dropped() {
            AuthError::StorageUnavailable
        } else {
            AuthError::Cache(err.to_string())
        }
    }
}

impl From<crypto_core::TokenError> for AuthError {
    fn from(err: crypto_core::TokenError) -> Self {
        match err {
            crypto_core::TokenError::Malformed => AuthError::TokenMalformed,
            crypto_core::TokenError::Signing(detail) => AuthError::Internal(detail),
        }
    }
}
