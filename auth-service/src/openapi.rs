use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::auth::RegisterResponse;
use crate::models::{
    AuthTokens, BackupCodeLoginRequest, DisableTwoFactorRequest, EnableTwoFactorResponse,
    ErrorResponse, LoginRequest, MessageResponse, RefreshResponse, RefreshTokenRequest,
    RegisterRequest, TotpLoginRequest, UserProfile, VerifyTwoFactorRequest,
};

/// OpenAPI document covering the REST surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::login_with_totp,
        crate::handlers::auth::login_with_backup_code,
        crate::handlers::auth::refresh_token,
        crate::handlers::auth::me,
        crate::handlers::auth::logout,
        crate::handlers::two_fa::enable_two_factor,
        crate::handlers::two_fa::verify_two_factor,
        crate::handlers::two_fa::disable_two_factor
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        TotpLoginRequest,
        BackupCodeLoginRequest,
        RefreshTokenRequest,
        VerifyTwoFactorRequest,
        DisableTwoFactorRequest,
        RegisterResponse,
        AuthTokens,
        RefreshResponse,
        UserProfile,
        EnableTwoFactorResponse,
        MessageResponse,
        ErrorResponse
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication & token APIs"),
        (name = "TwoFactor", description = "TOTP second-factor lifecycle")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
