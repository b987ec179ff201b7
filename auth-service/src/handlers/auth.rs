/// Authentication handlers
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AuthError,
    middleware::{AuthSession, BearerToken},
    models::{
        AuthTokens, BackupCodeLoginRequest, ErrorResponse, LoginRequest, MessageResponse,
        RefreshResponse, RefreshTokenRequest, RegisterRequest, TotpLoginRequest, UserProfile,
    },
    AppState,
};

/// Register response: profile plus the first token pair.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Register endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Weak password or invalid email", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    payload
        .validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let (user, tokens) = state
        .authenticator
        .register(&payload.email, &payload.password, payload.display_name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
        }),
    ))
}

/// Login endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "User logged in", body = AuthTokens),
        (status = 401, description = "Invalid credentials or second factor required", body = ErrorResponse),
        (status = 423, description = "Account locked", body = ErrorResponse),
        (status = 400, description = "Account disabled", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthTokens>, AuthError> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AuthError::InvalidCredentials {
            attempts_remaining: None,
        });
    }

    let tokens = state
        .authenticator
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(tokens.into()))
}

/// Login with TOTP code, for identities with an active second factor
#[utoipa::path(
    post,
    path = "/api/v1/auth/login/2fa",
    tag = "Auth",
    request_body = TotpLoginRequest,
    responses(
        (status = 200, description = "User logged in", body = AuthTokens),
        (status = 401, description = "Invalid credentials, 2FA not enabled, or bad code", body = ErrorResponse),
        (status = 423, description = "Account locked", body = ErrorResponse)
    )
)]
pub async fn login_with_totp(
    State(state): State<AppState>,
    Json(payload): Json<TotpLoginRequest>,
) -> Result<Json<AuthTokens>, AuthError> {
    let tokens = state
        .authenticator
        .login_with_totp(&payload.email, &payload.password, &payload.totp_code)
        .await?;

    Ok(Json(tokens.into()))
}

/// Emergency login with a single-use backup code
#[utoipa::path(
    post,
    path = "/api/v1/auth/2fa/backup-code",
    tag = "Auth",
    request_body = BackupCodeLoginRequest,
    responses(
        (status = 200, description = "User logged in; the code is now spent", body = AuthTokens),
        (status = 401, description = "Invalid credentials or invalid/used code", body = ErrorResponse)
    )
)]
pub async fn login_with_backup_code(
    State(state): State<AppState>,
    Json(payload): Json<BackupCodeLoginRequest>,
) -> Result<Json<AuthTokens>, AuthError> {
    let tokens = state
        .authenticator
        .login_with_backup_code(&payload.email, &payload.password, &payload.backup_code)
        .await?;

    Ok(Json(tokens.into()))
}

/// Refresh token endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Invalid, expired, revoked, or wrong-type token", body = ErrorResponse)
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<RefreshResponse>, AuthError> {
    let access_token = state
        .sessions
        .refresh_access_token(&payload.refresh_token)
        .await?;

    Ok(Json(RefreshResponse {
        access_token,
        token_type: "bearer".to_string(),
        expires_in: state.sessions.access_ttl_seconds(),
    }))
}

/// Current user profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Authenticated identity", body = UserProfile),
        (status = 401, description = "Missing, malformed, expired, or revoked token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn me(session: AuthSession) -> Json<UserProfile> {
    Json(UserProfile::from(&session.user))
}

/// Logout endpoint handler
///
/// Revokes the presented token. Succeeds whatever the token's prior
/// revocation state; revoking twice is a no-op.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Token revoked", body = MessageResponse),
        (status = 401, description = "No bearer token presented", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<MessageResponse>, AuthError> {
    state.sessions.revoke(&token).await?;

    Ok(Json(MessageResponse {
        message: "Successfully logged out; the token has been revoked".to_string(),
    }))
}
