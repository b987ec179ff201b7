//! Redis-backed stores for the durable configuration.
//!
//! Lockout counters, revocation digests, and backup-code sets live in
//! Redis so they survive a process restart and are shared across
//! replicas. Key layout:
//!
//! - `argent:auth:failed:{email}`        failure counter (INCR)
//! - `argent:auth:lock:{email}`          lock marker, EX = lock duration
//! - `argent:revoked:token:{digest}`     revocation entry, EX >= token TTL
//! - `argent:2fa:pending_codes:{email}`  staged backup-code digests (SET)
//! - `argent:2fa:backup_codes:{email}`   active backup-code digests (SET)
//!
//! The lock marker's own expiry implements the lazy `Locked -> Clean`
//! transition; `SET NX` makes the transition fire exactly once even when
//! two failures cross the threshold together.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use redis::aio::ConnectionManager;

use crate::error::Result;
use crate::storage::{
    with_timeout, FailureRecord, LockoutPolicy, LockoutStore, RevocationStore, SecondFactorStore,
};

/// Counters for identities that never log in again still expire eventually.
const COUNTER_TTL_SECS: u64 = 86_400;

fn failed_key(email: &str) -> String {
    format!("argent:auth:failed:{email}")
}

fn lock_key(email: &str) -> String {
    format!("argent:auth:lock:{email}")
}

fn revoked_key(digest: &str) -> String {
    format!("argent:revoked:token:{digest}")
}

fn pending_codes_key(email: &str) -> String {
    format!("argent:2fa:pending_codes:{email}")
}

fn backup_codes_key(email: &str) -> String {
    format!("argent:2fa:backup_codes:{email}")
}

// ---------------------------------------------------------------------------
// Lockout tracker
// ---------------------------------------------------------------------------

pub struct RedisLockoutStore {
    conn: ConnectionManager,
    policy: LockoutPolicy,
}

impl RedisLockoutStore {
    pub fn new(conn: ConnectionManager, policy: LockoutPolicy) -> Self {
        Self { conn, policy }
    }
}

#[async_trait]
impl LockoutStore for RedisLockoutStore {
    async fn check(&self, email: &str) -> Result<Option<u64>> {
        let mut conn = self.conn.clone();
        let policy = self.policy;

        with_timeout(async move {
            let ttl: i64 = redis::cmd("TTL")
                .arg(lock_key(email))
                .query_async(&mut conn)
                .await?;

            if ttl >= 0 {
                return Ok(Some(ttl as u64));
            }

            // No lock marker. If a stale counter at or past the threshold
            // remains, a lock existed and has expired: reset to clean.
            let count: Option<u32> = redis::cmd("GET")
                .arg(failed_key(email))
                .query_async(&mut conn)
                .await?;
            if count.unwrap_or(0) >= policy.threshold {
                redis::cmd("DEL")
                    .arg(failed_key(email))
                    .query_async::<_, ()>(&mut conn)
                    .await?;
            }

            Ok(None)
        })
        .await
    }

    async fn record_failure(&self, email: &str) -> Result<FailureRecord> {
        let mut conn = self.conn.clone();
        let policy = self.policy;

        with_timeout(async move {
            // INCR is atomic server-side: concurrent failures all count.
            let count: u32 = redis::cmd("INCR")
                .arg(failed_key(email))
                .query_async(&mut conn)
                .await?;
            redis::cmd("EXPIRE")
                .arg(failed_key(email))
                .arg(COUNTER_TTL_SECS)
                .query_async::<_, ()>(&mut conn)
                .await?;

            let mut newly_locked = false;
            let mut locked_until = None;

            if count >= policy.threshold {
                // NX: only the first crosser creates the marker.
                let created: Option<String> = redis::cmd("SET")
                    .arg(lock_key(email))
                    .arg("1")
                    .arg("NX")
                    .arg("EX")
                    .arg(policy.lock_duration_secs)
                    .query_async(&mut conn)
                    .await?;
                newly_locked = created.is_some();

                let ttl: i64 = redis::cmd("TTL")
                    .arg(lock_key(email))
                    .query_async(&mut conn)
                    .await?;
                if ttl >= 0 {
                    locked_until = Some(Utc::now() + Duration::seconds(ttl));
                }
            }

            Ok(FailureRecord {
                count,
                attempts_remaining: policy.threshold.saturating_sub(count),
                locked_until,
                newly_locked,
            })
        })
        .await
    }

    async fn clear(&self, email: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        with_timeout(async move {
            redis::cmd("DEL")
                .arg(failed_key(email))
                .arg(lock_key(email))
                .query_async::<_, ()>(&mut conn)
                .await?;
            Ok(())
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Revocation list
// ---------------------------------------------------------------------------

pub struct RedisRevocationStore {
    conn: ConnectionManager,
}

impl RedisRevocationStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, digest: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        with_timeout(async move {
            // Plain SET: revoking twice is a no-op with the same effect.
            redis::cmd("SET")
                .arg(revoked_key(digest))
                .arg("1")
                .arg("EX")
                .arg(ttl_secs)
                .query_async::<_, ()>(&mut conn)
                .await?;
            Ok(())
        })
        .await
    }

    async fn is_revoked(&self, digest: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        with_timeout(async move {
            let exists: bool = redis::cmd("EXISTS")
                .arg(revoked_key(digest))
                .query_async(&mut conn)
                .await?;
            Ok(exists)
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Backup codes
// ---------------------------------------------------------------------------

pub struct RedisSecondFactorStore {
    conn: ConnectionManager,
}

impl RedisSecondFactorStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SecondFactorStore for RedisSecondFactorStore {
    async fn put_pending_codes(&self, email: &str, code_hashes: Vec<String>) -> Result<()> {
        let mut conn = self.conn.clone();
        with_timeout(async move {
            redis::cmd("DEL")
                .arg(pending_codes_key(email))
                .query_async::<_, ()>(&mut conn)
                .await?;

            let mut cmd = redis::cmd("SADD");
            cmd.arg(pending_codes_key(email));
            for hash in &code_hashes {
                cmd.arg(hash);
            }
            cmd.query_async::<_, ()>(&mut conn).await?;
            Ok(())
        })
        .await
    }

    async fn promote_pending_codes(&self, email: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        with_timeout(async move {
            let exists: bool = redis::cmd("EXISTS")
                .arg(pending_codes_key(email))
                .query_async(&mut conn)
                .await?;
            if exists {
                redis::cmd("RENAME")
                    .arg(pending_codes_key(email))
                    .arg(backup_codes_key(email))
                    .query_async::<_, ()>(&mut conn)
                    .await?;
            }
            Ok(())
        })
        .await
    }

    async fn consume_code(&self, email: &str, code_hash: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        with_timeout(async move {
            // SREM is atomic: exactly one concurrent attempt wins the code.
            let removed: i32 = redis::cmd("SREM")
                .arg(backup_codes_key(email))
                .arg(code_hash)
                .query_async(&mut conn)
                .await?;
            Ok(removed > 0)
        })
        .await
    }

    async fn clear_codes(&self, email: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        with_timeout(async move {
            redis::cmd("DEL")
                .arg(pending_codes_key(email))
                .arg(backup_codes_key(email))
                .query_async::<_, ()>(&mut conn)
                .await?;
            Ok(())
        })
        .await
    }
}
