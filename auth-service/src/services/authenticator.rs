//! Login orchestration.
//!
//! The flow per attempt: lockout gate, identity lookup and password
//! verification (with identical shape and cost whether or not the identity
//! exists), failure accounting with the exactly-once lock transition,
//! disabled-account gate, second-factor gate, and only then token
//! issuance. Every transition is surfaced through [`SecurityEvents`].

use chrono::Utc;
use crypto_core::{sha256_hex, TokenIssuer, TokenPair};
use std::sync::Arc;

use crate::error::{AuthError, Result};
use crate::metrics;
use crate::models::{User, UserProfile};
use crate::security::password;
use crate::security::totp::TotpGenerator;
use crate::services::SecurityEvents;
use crate::storage::{IdentityStore, LockoutStore, SecondFactorStore};

/// Drift tolerance for TOTP codes, in 30-second steps.
const TOTP_WINDOW: u32 = 1;

pub struct Authenticator {
    identities: Arc<dyn IdentityStore>,
    lockouts: Arc<dyn LockoutStore>,
    second_factors: Arc<dyn SecondFactorStore>,
    issuer: TokenIssuer,
    events: Arc<dyn SecurityEvents>,
}

impl Authenticator {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        lockouts: Arc<dyn LockoutStore>,
        second_factors: Arc<dyn SecondFactorStore>,
        issuer: TokenIssuer,
        events: Arc<dyn SecurityEvents>,
    ) -> Self {
        Self {
            identities,
            lockouts,
            second_factors,
            issuer,
            events,
        }
    }

    /// Create an identity and issue its first token pair.
    pub async fn register(
        &self,
        email: &str,
        password_plain: &str,
        display_name: Option<String>,
    ) -> Result<(UserProfile, TokenPair)> {
        let password_hash = password::hash_password(password_plain)?;

        let user = User {
            email: email.to_string(),
            password_hash,
            display_name,
            disabled: false,
            two_factor_enabled: false,
            two_factor_secret: None,
            pending_two_factor_secret: None,
            created_at: Utc::now(),
        };

        self.identities.create(user.clone()).await?;
        tracing::info!(email, "user registered");

        let tokens = self.issuer.issue_pair(email)?;
        Ok((UserProfile::from(&user), tokens))
    }

    /// Password login. Identities with an active second factor never get
    /// tokens from this path; they are redirected to the TOTP or
    /// backup-code variants.
    pub async fn login(&self, email: &str, password_plain: &str) -> Result<TokenPair> {
        let user = self.verify_credentials(email, password_plain).await?;

        if user.has_second_factor() {
            return Err(AuthError::SecondFactorRequired);
        }

        self.complete_login(email).await
    }

    /// Password + TOTP code login for identities with 2FA active.
    pub async fn login_with_totp(
        &self,
        email: &str,
        password_plain: &str,
        code: &str,
    ) -> Result<TokenPair> {
        let user = self.verify_credentials(email, password_plain).await?;

        let secret = user
            .two_factor_secret
            .as_deref()
            .filter(|_| user.two_factor_enabled)
            .ok_or(AuthError::SecondFactorNotEnabled)?;

        if !TotpGenerator::verify_code(secret, code, TOTP_WINDOW)? {
            tracing::warn!(email, "invalid TOTP code");
            return Err(AuthError::InvalidSecondFactorCode);
        }

        self.complete_login(email).await
    }

    /// Password + single-use backup code login.
    pub async fn login_with_backup_code(
        &self,
        email: &str,
        password_plain: &str,
        backup_code: &str,
    ) -> Result<TokenPair> {
        let user = self.verify_credentials(email, password_plain).await?;

        if !user.has_second_factor() {
            return Err(AuthError::SecondFactorNotEnabled);
        }

        let consumed = self
            .second_factors
            .consume_code(email, &sha256_hex(backup_code))
            .await?;
        if !consumed {
            tracing::warn!(email, "invalid or already-used backup code");
            return Err(AuthError::InvalidSecondFactorCode);
        }

        self.events.backup_code_used(email);
        self.complete_login(email).await
    }

    /// Steps shared by every login variant: lockout gate, lookup, disabled
    /// gate, password verification, failure accounting.
    async fn verify_credentials(&self, email: &str, password_plain: &str) -> Result<User> {
        if let Some(remaining_seconds) = self.lockouts.check(email).await? {
            // No password comparison happens for locked identities.
            return Err(AuthError::AccountLocked { remaining_seconds });
        }

        let user = match self.identities.find_by_email(email).await? {
            Some(user) => user,
            None => {
                // Burn the same hashing cost as a real comparison so the
                // response cannot reveal whether the identity exists.
                password::equalize_verification_cost(password_plain);
                return Err(self.record_failure(email).await?);
            }
        };

        if user.disabled {
            // Not a guessing signal; nothing is recorded.
            return Err(AuthError::AccountDisabled);
        }

        if password::verify_password(password_plain, &user.password_hash).is_err() {
            return Err(self.record_failure(email).await?);
        }

        Ok(user)
    }

    /// Count one failure and translate the updated record into the
    /// rejection the caller receives.
    async fn record_failure(&self, email: &str) -> Result<AuthError> {
        let record = self.lockouts.record_failure(email).await?;
        metrics::LOGIN_FAILURES.inc();
        self.events
            .failed_login(email, record.count, record.attempts_remaining);

        if record.newly_locked {
            metrics::ACCOUNT_LOCKOUTS.inc();
            self.events.account_locked(
                email,
                record.remaining_lock_seconds(Utc::now()).unwrap_or(0),
            );
        }

        if let Some(remaining_seconds) = record.remaining_lock_seconds(Utc::now()) {
            return Ok(AuthError::AccountLocked { remaining_seconds });
        }

        Ok(AuthError::InvalidCredentials {
            attempts_remaining: Some(record.attempts_remaining),
        })
    }

    async fn complete_login(&self, email: &str) -> Result<TokenPair> {
        self.lockouts.clear(email).await?;
        metrics::LOGIN_SUCCESSES.inc();
        self.events.successful_login(email);

        Ok(self.issuer.issue_pair(email)?)
    }
}
