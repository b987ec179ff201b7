/// Bearer-token extraction for protected routes
use axum::{async_trait, extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use crypto_core::TokenType;

use crate::{error::AuthError, models::User, AppState};

/// Raw bearer token pulled from the Authorization header, without any
/// validation beyond its presence. Logout wants this: a token is revocable
/// whatever state it is in.
pub struct BearerToken(pub String);

#[async_trait]
impl FromRequestParts<AppState> for BearerToken {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::TokenMalformed)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::TokenMalformed)?;

        Ok(BearerToken(token.to_string()))
    }
}

/// A fully validated session: access-typed, unrevoked, unexpired token
/// resolving to an enabled identity.
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let user = state.sessions.validate(&token, TokenType::Access).await?;

        Ok(AuthSession { user, token })
    }
}
