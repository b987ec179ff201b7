//! JWT issuing and validation for Argent services.
//!
//! Tokens are HS256-signed with a process-wide secret handed to the
//! [`TokenIssuer`] at startup. The claim set is deliberately small:
//! `{sub, iat, exp, token_type}`, where `sub` is the identity key (email)
//! and `token_type` distinguishes short-lived access tokens from the
//! longer-lived refresh tokens that may only be exchanged for new access
//! tokens.
//!
//! [`TokenIssuer::decode`] verifies the signature and claim structure but
//! does NOT enforce expiry: callers need to consult the revocation list
//! before deciding whether to report a token as revoked or expired, so the
//! expiry judgement is theirs to make via [`Claims::is_expired`].

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature mismatch, bad structure, or claims that fail to decode.
    #[error("malformed token")]
    Malformed,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Token type carried in (and expected from) the `token_type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT claim set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the identity key (email).
    pub sub: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// "access" or "refresh".
    pub token_type: TokenType,
}

impl Claims {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp < now.timestamp()
    }
}

/// Access + refresh token pair returned to a freshly authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Issues and decodes HS256 tokens with a process-wide secret.
///
/// Constructed once at startup and injected into the services that need
/// it; there is no global key state.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Issuer with the standard lifetimes: 15 minute access tokens,
    /// 7 day refresh tokens.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttls(
            secret,
            Duration::minutes(ACCESS_TOKEN_TTL_MINUTES),
            Duration::days(REFRESH_TOKEN_TTL_DAYS),
        )
    }

    /// Issuer with explicit lifetimes. Mostly useful in tests that need
    /// already-expired tokens.
    pub fn with_ttls(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    /// The longest lifetime any token issued here can have. Revocation
    /// entries must outlive this.
    pub fn max_lifetime(&self) -> Duration {
        std::cmp::max(self.access_ttl, self.refresh_ttl)
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Sign a token of the given type for `subject`.
    pub fn issue(&self, subject: &str, token_type: TokenType) -> Result<String, TokenError> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };

        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            token_type,
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Sign an access/refresh pair for `subject`.
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, TokenError> {
        let access_token = self.issue(subject, TokenType::Access)?;
        let refresh_token = self.issue(subject, TokenType::Refresh)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Verify the signature and decode the claims.
    ///
    /// Expiry is NOT enforced here; see the module docs. Any decoding or
    /// signature failure collapses to [`TokenError::Malformed`] so callers
    /// cannot accidentally leak a more detailed reason.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = false;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &[u8] = b"test-secret-for-unit-tests-only";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(TEST_SECRET)
    }

    #[test]
    fn test_issue_and_decode_round_trip() {
        let token = issuer()
            .issue("a@x.com", TokenType::Access)
            .expect("issue should succeed");
        assert_eq!(token.matches('.').count(), 2); // JWT has 3 parts

        let claims = issuer().decode(&token).expect("decode should succeed");
        assert_eq!(claims.sub, "a@x.com");
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(!claims.is_expired(Utc::now()));
    }

    #[test]
    fn test_tampered_token_is_malformed() {
        let issuer = issuer();
        let token = issuer.issue("a@x.com", TokenType::Access).unwrap();
        let tampered = token.replace('a', "b");

        assert!(matches!(
            issuer.decode(&tampered),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn test_wrong_secret_is_malformed() {
        let token = issuer().issue("a@x.com", TokenType::Access).unwrap();
        let other = TokenIssuer::new(b"a-different-secret");

        assert!(matches!(other.decode(&token), Err(TokenError::Malformed)));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            issuer().decode("not.a.token"),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn test_expired_token_still_decodes() {
        // Decoding must succeed so the caller can check revocation before
        // surfacing the expiry.
        let issuer = TokenIssuer::with_ttls(
            TEST_SECRET,
            Duration::minutes(-5),
            Duration::days(7),
        );
        let token = issuer.issue("a@x.com", TokenType::Access).unwrap();

        let claims = issuer.decode(&token).expect("expired token must decode");
        assert!(claims.is_expired(Utc::now()));
    }

    #[test]
    fn test_refresh_outlives_access() {
        let pair = issuer().issue_pair("a@x.com").unwrap();
        let access = issuer().decode(&pair.access_token).unwrap();
        let refresh = issuer().decode(&pair.refresh_token).unwrap();

        assert_eq!(access.token_type, TokenType::Access);
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert!(refresh.exp > access.exp);
        assert_eq!(pair.token_type, "bearer");
        assert_eq!(pair.expires_in, 15 * 60);
    }
}
