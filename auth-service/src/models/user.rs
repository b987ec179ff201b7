use chrono::{DateTime, Utc};
/// Identity model and API request/response shapes
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// A stored identity. Keyed by email; never hard-deleted.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub disabled: bool,
    /// True only once a pending secret has been confirmed.
    pub two_factor_enabled: bool,
    pub two_factor_secret: Option<String>,
    /// Set during enrollment; promoted by a successful code check.
    pub pending_two_factor_secret: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// An identity with only a pending secret is 2FA-disabled for login
    /// purposes.
    pub fn has_second_factor(&self) -> bool {
        self.two_factor_enabled && self.two_factor_secret.is_some()
    }
}

/// Public projection of an identity, safe to return from the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub email: String,
    pub display_name: Option<String>,
    pub disabled: bool,
    pub two_factor_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            disabled: user.disabled,
            two_factor_enabled: user.has_second_factor(),
            created_at: user.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TotpLoginRequest {
    pub email: String,
    pub password: String,
    pub totp_code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BackupCodeLoginRequest {
    pub email: String,
    pub password: String,
    pub backup_code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyTwoFactorRequest {
    pub secret: String,
    pub code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DisableTwoFactorRequest {
    pub totp_code: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Token pair handed out on successful authentication.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl From<crypto_core::TokenPair> for AuthTokens {
    fn from(pair: crypto_core::TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type,
            expires_in: pair.expires_in,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Pending 2FA enrollment material. The secret becomes active only after
/// a successful verify call.
#[derive(Debug, Serialize, ToSchema)]
pub struct EnableTwoFactorResponse {
    pub secret: String,
    /// otpauth:// provisioning URI; render it as a QR code client-side.
    pub qr_payload: String,
    pub backup_codes: Vec<String>,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body shape, documented for OpenAPI consumers.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}
