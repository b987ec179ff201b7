//! In-process stores: the ephemeral backend.
//!
//! Default for local runs and the backend every test exercises. DashMap
//! entry guards give per-identity atomicity for the failure counter; no
//! cross-identity locking exists anywhere.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::HashSet;

use crate::error::{AuthError, Result};
use crate::models::User;
use crate::storage::{
    FailureRecord, IdentityStore, LockoutPolicy, LockoutStore, RevocationStore, SecondFactorStore,
};

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryIdentityStore {
    users: DashMap<String, User>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users.get(email).map(|entry| entry.value().clone()))
    }

    async fn create(&self, user: User) -> Result<()> {
        match self.users.entry(user.email.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AuthError::EmailAlreadyExists),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(())
            }
        }
    }

    async fn set_pending_second_factor(&self, email: &str, secret: &str) -> Result<()> {
        let mut user = self
            .users
            .get_mut(email)
            .ok_or(AuthError::UnknownSubject)?;
        user.pending_two_factor_secret = Some(secret.to_string());
        Ok(())
    }

    async fn activate_second_factor(&self, email: &str) -> Result<()> {
        let mut user = self
            .users
            .get_mut(email)
            .ok_or(AuthError::UnknownSubject)?;
        match user.pending_two_factor_secret.take() {
            Some(secret) => {
                user.two_factor_secret = Some(secret);
                user.two_factor_enabled = true;
                Ok(())
            }
            None => Err(AuthError::SecondFactorNotEnabled),
        }
    }

    async fn clear_second_factor(&self, email: &str) -> Result<()> {
        let mut user = self
            .users
            .get_mut(email)
            .ok_or(AuthError::UnknownSubject)?;
        user.two_factor_enabled = false;
        user.two_factor_secret = None;
        user.pending_two_factor_secret = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Lockout tracker
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone)]
struct AttemptEntry {
    count: u32,
    last_attempt: Option<DateTime<Utc>>,
    locked_until: Option<DateTime<Utc>>,
}

pub struct MemoryLockoutStore {
    policy: LockoutPolicy,
    attempts: DashMap<String, AttemptEntry>,
}

impl MemoryLockoutStore {
    pub fn new(policy: LockoutPolicy) -> Self {
        Self {
            policy,
            attempts: DashMap::new(),
        }
    }
}

#[async_trait]
impl LockoutStore for MemoryLockoutStore {
    async fn check(&self, email: &str) -> Result<Option<u64>> {
        let now = Utc::now();
        let mut expired = false;

        if let Some(mut entry) = self.attempts.get_mut(email) {
            if let Some(until) = entry.locked_until {
                if now < until {
                    return Ok(Some((until - now).num_seconds().max(0) as u64));
                }
                // Lock expired: the identity is clean again.
                entry.locked_until = None;
                entry.count = 0;
                expired = true;
            }
        }

        if expired {
            self.attempts.remove(email);
        }
        Ok(None)
    }

    async fn record_failure(&self, email: &str) -> Result<FailureRecord> {
        let now = Utc::now();
        // The entry guard is held for the whole read-modify-write, so two
        // concurrent failures for one identity serialize here and neither
        // update is lost.
        let mut entry = self.attempts.entry(email.to_string()).or_default();

        if let Some(until) = entry.locked_until {
            if now >= until {
                entry.locked_until = None;
                entry.count = 0;
            }
        }

        entry.count += 1;
        entry.last_attempt = Some(now);

        let mut newly_locked = false;
        if entry.count >= self.policy.threshold && entry.locked_until.is_none() {
            entry.locked_until =
                Some(now + Duration::seconds(self.policy.lock_duration_secs as i64));
            newly_locked = true;
        }

        Ok(FailureRecord {
            count: entry.count,
            attempts_remaining: self.policy.threshold.saturating_sub(entry.count),
            locked_until: entry.locked_until,
            newly_locked,
        })
    }

    async fn clear(&self, email: &str) -> Result<()> {
        self.attempts.remove(email);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Revocation list
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryRevocationStore {
    revoked: DashMap<String, ()>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, digest: &str, _ttl_secs: u64) -> Result<()> {
        // Entries become irrelevant once the token itself expires; the
        // ephemeral backend does not prune.
        self.revoked.insert(digest.to_string(), ());
        Ok(())
    }

    async fn is_revoked(&self, digest: &str) -> Result<bool> {
        Ok(self.revoked.contains_key(digest))
    }
}

// ---------------------------------------------------------------------------
// Backup codes
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemorySecondFactorStore {
    pending: DashMap<String, HashSet<String>>,
    active: DashMap<String, HashSet<String>>,
}

impl MemorySecondFactorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecondFactorStore for MemorySecondFactorStore {
    async fn put_pending_codes(&self, email: &str, code_hashes: Vec<String>) -> Result<()> {
        self.pending
            .insert(email.to_string(), code_hashes.into_iter().collect());
        Ok(())
    }

    async fn promote_pending_codes(&self, email: &str) -> Result<()> {
        if let Some((_, codes)) = self.pending.remove(email) {
            self.active.insert(email.to_string(), codes);
        }
        Ok(())
    }

    async fn consume_code(&self, email: &str, code_hash: &str) -> Result<bool> {
        // Removal under the entry guard: a code can be consumed once even
        // under concurrent attempts.
        match self.active.get_mut(email) {
            Some(mut codes) => Ok(codes.remove(code_hash)),
            None => Ok(false),
        }
    }

    async fn clear_codes(&self, email: &str) -> Result<()> {
        self.pending.remove(email);
        self.active.remove(email);
        Ok(())
    }
}
