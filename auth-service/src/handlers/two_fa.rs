/// Two-factor enrollment handlers
use axum::{extract::State, Json};

use crate::{
    error::AuthError,
    middleware::AuthSession,
    models::{
        DisableTwoFactorRequest, EnableTwoFactorResponse, ErrorResponse, MessageResponse,
        VerifyTwoFactorRequest,
    },
    AppState,
};

/// Begin 2FA enrollment. The returned secret and backup codes stay pending
/// until verified.
#[utoipa::path(
    post,
    path = "/api/v1/auth/2fa/enable",
    tag = "TwoFactor",
    responses(
        (status = 200, description = "Pending enrollment material", body = EnableTwoFactorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn enable_two_factor(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<EnableTwoFactorResponse>, AuthError> {
    let setup = state.two_factor.initiate(&session.user).await?;

    Ok(Json(EnableTwoFactorResponse {
        secret: setup.secret,
        qr_payload: setup.provisioning_uri,
        backup_codes: setup.backup_codes,
        message: "Scan the QR payload with an authenticator app, store the backup codes, \
                  then confirm with /api/v1/auth/2fa/verify"
            .to_string(),
    }))
}

/// Confirm enrollment with the first code from the authenticator app.
#[utoipa::path(
    post,
    path = "/api/v1/auth/2fa/verify",
    tag = "TwoFactor",
    request_body = VerifyTwoFactorRequest,
    responses(
        (status = 200, description = "Second factor is now active", body = MessageResponse),
        (status = 401, description = "Invalid code or nothing pending", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn verify_two_factor(
    State(state): State<AppState>,
    session: AuthSession,
    Json(payload): Json<VerifyTwoFactorRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    state
        .two_factor
        .confirm(&session.user.email, &payload.secret, &payload.code)
        .await?;

    Ok(Json(MessageResponse {
        message: "Two-factor authentication enabled".to_string(),
    }))
}

/// Disable 2FA; requires a currently valid code.
#[utoipa::path(
    post,
    path = "/api/v1/auth/2fa/disable",
    tag = "TwoFactor",
    request_body = DisableTwoFactorRequest,
    responses(
        (status = 200, description = "Second factor removed", body = MessageResponse),
        (status = 401, description = "Invalid code or 2FA not enabled", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn disable_two_factor(
    State(state): State<AppState>,
    session: AuthSession,
    Json(payload): Json<DisableTwoFactorRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    state
        .two_factor
        .disable(&session.user, &payload.totp_code)
        .await?;

    Ok(Json(MessageResponse {
        message: "Two-factor authentication disabled".to_string(),
    }))
}
