//! Capability stores behind the authentication services.
//!
//! Every piece of shared mutable state (identities, failure counters,
//! revocation digests, backup-code sets) lives behind one of the traits
//! below. The composition root picks a backend once at startup: the
//! in-process [`memory`] stores, or the Postgres/Redis-backed [`postgres`]
//! and [`redis`] stores for deployments where this state must survive a
//! restart. Nothing in the service layer branches on the backend.

pub mod memory;
pub mod postgres;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

use crate::error::{AuthError, Result};
use crate::models::User;

/// External stores must answer within this budget or the call is surfaced
/// as `StorageUnavailable` instead of hanging a login.
pub(crate) const STORAGE_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) async fn with_timeout<T, F>(fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(STORAGE_TIMEOUT, fut).await {
        Ok(result) => result,
        Err(_) => Err(AuthError::StorageUnavailable),
    }
}

/// Lockout tuning. The defaults implement the documented policy:
/// 5 consecutive failures lock the identity for an hour, with warning
/// annotations from the 3rd failure on.
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    pub threshold: u32,
    pub lock_duration_secs: u64,
    pub warn_from: u32,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: 5,
            lock_duration_secs: 3600,
            warn_from: 3,
        }
    }
}

/// Outcome of recording one failed attempt. Data, not a thrown warning:
/// callers branch on the fields.
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub count: u32,
    pub attempts_remaining: u32,
    pub locked_until: Option<DateTime<Utc>>,
    /// True for exactly one recording per lock transition, even when two
    /// concurrent failures cross the threshold together.
    pub newly_locked: bool,
}

impl FailureRecord {
    pub fn remaining_lock_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        self.locked_until
            .map(|until| (until - now).num_seconds().max(0) as u64)
    }
}

/// Credential store: identity records keyed by email.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Insert a new identity; `EmailAlreadyExists` on a duplicate key.
    async fn create(&self, user: User) -> Result<()>;

    /// Stage a second-factor secret without activating it.
    async fn set_pending_second_factor(&self, email: &str, secret: &str) -> Result<()>;

    /// Promote the pending secret to the active one. Fails with
    /// `SecondFactorNotEnabled` when nothing is pending.
    async fn activate_second_factor(&self, email: &str) -> Result<()>;

    /// Drop both the active and any pending secret.
    async fn clear_second_factor(&self, email: &str) -> Result<()>;
}

/// Lockout tracker state: `Clean -> Accumulating(count) -> Locked(until)`,
/// with lazy lock expiry (no background sweep).
#[async_trait]
pub trait LockoutStore: Send + Sync {
    /// `Some(remaining_seconds)` while the identity is locked. An expired
    /// lock resets the identity to clean as a side effect.
    async fn check(&self, email: &str) -> Result<Option<u64>>;

    /// Atomically count one failure and apply the lock transition when the
    /// threshold is crossed. Two concurrent failures must both be counted.
    async fn record_failure(&self, email: &str) -> Result<FailureRecord>;

    /// Reset to clean after a successful login.
    async fn clear(&self, email: &str) -> Result<()>;
}

/// Revocation list keyed by token digest. Inserts are idempotent and
/// entries outlive the longest token lifetime; nothing here needs to prune
/// proactively.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn revoke(&self, digest: &str, ttl_secs: u64) -> Result<()>;
    async fn is_revoked(&self, digest: &str) -> Result<bool>;
}

/// Backup-code sets, stored as SHA-256 digests. Pending codes are staged
/// alongside the pending TOTP secret and promoted together with it.
#[async_trait]
pub trait SecondFactorStore: Send + Sync {
    async fn put_pending_codes(&self, email: &str, code_hashes: Vec<String>) -> Result<()>;
    async fn promote_pending_codes(&self, email: &str) -> Result<()>;

    /// Remove-and-test: `true` exactly once per stored code.
    async fn consume_code(&self, email: &str, code_hash: &str) -> Result<bool>;

    async fn clear_codes(&self, email: &str) -> Result<()>;
}
