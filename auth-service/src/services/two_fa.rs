//! Two-factor enrollment lifecycle.
//!
//! Enabling 2FA is a two-phase commit: [`TwoFactorService::initiate`]
//! stages a secret and backup codes as pending, and only a successful
//! code check in [`TwoFactorService::confirm`] promotes them to active.
//! An identity with nothing but a pending secret logs in without a second
//! factor.

use crypto_core::sha256_hex;
use std::sync::Arc;

use crate::error::{AuthError, Result};
use crate::models::User;
use crate::security::totp::TotpGenerator;
use crate::services::SecurityEvents;
use crate::storage::{IdentityStore, SecondFactorStore};

const TOTP_WINDOW: u32 = 1;

/// Enrollment material returned to the user exactly once.
pub struct TwoFactorSetup {
    pub secret: String,
    pub provisioning_uri: String,
    pub backup_codes: Vec<String>,
}

pub struct TwoFactorService {
    identities: Arc<dyn IdentityStore>,
    second_factors: Arc<dyn SecondFactorStore>,
    events: Arc<dyn SecurityEvents>,
    issuer_label: String,
}

impl TwoFactorService {
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        second_factors: Arc<dyn SecondFactorStore>,
        events: Arc<dyn SecurityEvents>,
        issuer_label: String,
    ) -> Self {
        Self {
            identities,
            second_factors,
            events,
            issuer_label,
        }
    }

    /// Phase 1: stage a fresh secret and backup codes as pending.
    ///
    /// The plaintext backup codes leave the server only here; at rest they
    /// exist as SHA-256 digests.
    pub async fn initiate(&self, user: &User) -> Result<TwoFactorSetup> {
        let secret = TotpGenerator::generate_secret();
        let provisioning_uri =
            TotpGenerator::provisioning_uri(&self.issuer_label, &user.email, &secret);
        let backup_codes = TotpGenerator::generate_backup_codes();

        self.identities
            .set_pending_second_factor(&user.email, &secret)
            .await?;

        let code_hashes = backup_codes.iter().map(|c| sha256_hex(c)).collect();
        self.second_factors
            .put_pending_codes(&user.email, code_hashes)
            .await?;

        tracing::info!(email = %user.email, "two-factor enrollment initiated");

        Ok(TwoFactorSetup {
            secret,
            provisioning_uri,
            backup_codes,
        })
    }

    /// Phase 2: verify one code against the pending secret and promote it.
    pub async fn confirm(&self, email: &str, secret: &str, code: &str) -> Result<()> {
        let user = self
            .identities
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        let pending = user
            .pending_two_factor_secret
            .as_deref()
            .ok_or(AuthError::SecondFactorNotEnabled)?;

        // The caller echoes the secret from phase 1; it must match what is
        // staged, and the code must verify against it.
        if secret != pending || !TotpGenerator::verify_code(pending, code, TOTP_WINDOW)? {
            return Err(AuthError::InvalidSecondFactorCode);
        }

        self.identities.activate_second_factor(email).await?;
        self.second_factors.promote_pending_codes(email).await?;
        self.events.two_factor_enabled(email);

        Ok(())
    }

    /// Disable 2FA. Requires a currently valid code so a stolen session
    /// alone cannot strip the account's second factor.
    pub async fn disable(&self, user: &User, code: &str) -> Result<()> {
        let secret = user
            .two_factor_secret
            .as_deref()
            .filter(|_| user.two_factor_enabled)
            .ok_or(AuthError::SecondFactorNotEnabled)?;

        if !TotpGenerator::verify_code(secret, code, TOTP_WINDOW)? {
            return Err(AuthError::InvalidSecondFactorCode);
        }

        self.identities.clear_second_factor(&user.email).await?;
        self.second_factors.clear_codes(&user.email).await?;
        self.events.two_factor_disabled(&user.email);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::password;
    use crate::services::TracingEvents;
    use crate::storage::memory::{MemoryIdentityStore, MemorySecondFactorStore};
    use chrono::Utc;

    const EMAIL: &str = "b@x.com";

    struct Harness {
        service: TwoFactorService,
        identities: Arc<MemoryIdentityStore>,
        second_factors: Arc<MemorySecondFactorStore>,
    }

    async fn harness() -> Harness {
        let identities = Arc::new(MemoryIdentityStore::new());
        let second_factors = Arc::new(MemorySecondFactorStore::new());

        identities
            .create(User {
                email: EMAIL.to_string(),
                password_hash: password::hash_password("P@ssw0rd1").unwrap(),
                display_name: None,
                disabled: false,
                two_factor_enabled: false,
                two_factor_secret: None,
                pending_two_factor_secret: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        Harness {
            service: TwoFactorService::new(
                identities.clone(),
                second_factors.clone(),
                Arc::new(TracingEvents),
                "Argent".to_string(),
            ),
            identities,
            second_factors,
        }
    }

    fn current_code(secret: &str) -> String {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        TotpGenerator::code_for(secret, now).unwrap()
    }

    #[tokio::test]
    async fn test_initiate_stages_pending_state() {
        let h = harness().await;
        let user = h.identities.find_by_email(EMAIL).await.unwrap().unwrap();

        let setup = h.service.initiate(&user).await.unwrap();
        assert_eq!(setup.backup_codes.len(), 10);
        assert!(setup.provisioning_uri.contains("otpauth://totp/"));

        let staged = h.identities.find_by_email(EMAIL).await.unwrap().unwrap();
        assert_eq!(
            staged.pending_two_factor_secret.as_deref(),
            Some(setup.secret.as_str())
        );
        assert!(!staged.has_second_factor());
    }

    #[tokio::test]
    async fn test_confirm_promotes_pending_secret() {
        let h = harness().await;
        let user = h.identities.find_by_email(EMAIL).await.unwrap().unwrap();
        let setup = h.service.initiate(&user).await.unwrap();

        h.service
            .confirm(EMAIL, &setup.secret, &current_code(&setup.secret))
            .await
            .unwrap();

        let active = h.identities.find_by_email(EMAIL).await.unwrap().unwrap();
        assert!(active.has_second_factor());

        // Backup codes were promoted along with the secret
        let consumed = h
            .second_factors
            .consume_code(EMAIL, &sha256_hex(&setup.backup_codes[0]))
            .await
            .unwrap();
        assert!(consumed);
    }

    #[tokio::test]
    async fn test_confirm_rejects_wrong_code() {
        let h = harness().await;
        let user = h.identities.find_by_email(EMAIL).await.unwrap().unwrap();
        let setup = h.service.initiate(&user).await.unwrap();

        assert!(matches!(
            h.service.confirm(EMAIL, &setup.secret, "000000").await,
            Err(AuthError::InvalidSecondFactorCode)
        ));

        // Still pending, not active
        let staged = h.identities.find_by_email(EMAIL).await.unwrap().unwrap();
        assert!(!staged.has_second_factor());
    }

    #[tokio::test]
    async fn test_confirm_rejects_mismatched_secret() {
        let h = harness().await;
        let user = h.identities.find_by_email(EMAIL).await.unwrap().unwrap();
        let setup = h.service.initiate(&user).await.unwrap();

        let other = TotpGenerator::generate_secret();
        assert!(matches!(
            h.service
                .confirm(EMAIL, &other, &current_code(&setup.secret))
                .await,
            Err(AuthError::InvalidSecondFactorCode)
        ));
    }

    #[tokio::test]
    async fn test_confirm_without_initiate() {
        let h = harness().await;
        assert!(matches!(
            h.service.confirm(EMAIL, "SECRET", "123456").await,
            Err(AuthError::SecondFactorNotEnabled)
        ));
    }

    #[tokio::test]
    async fn test_disable_requires_valid_code() {
        let h = harness().await;
        let user = h.identities.find_by_email(EMAIL).await.unwrap().unwrap();
        let setup = h.service.initiate(&user).await.unwrap();
        h.service
            .confirm(EMAIL, &setup.secret, &current_code(&setup.secret))
            .await
            .unwrap();

        let active = h.identities.find_by_email(EMAIL).await.unwrap().unwrap();

        assert!(matches!(
            h.service.disable(&active, "000000").await,
            Err(AuthError::InvalidSecondFactorCode)
        ));

        h.service
            .disable(&active, &current_code(&setup.secret))
            .await
            .unwrap();

        let cleared = h.identities.find_by_email(EMAIL).await.unwrap().unwrap();
        assert!(!cleared.has_second_factor());
        assert!(cleared.two_factor_secret.is_none());

        // Old backup codes are gone with it
        let consumed = h
            .second_factors
            .consume_code(EMAIL, &sha256_hex(&setup.backup_codes[0]))
            .await
            .unwrap();
        assert!(!consumed);
    }
}
