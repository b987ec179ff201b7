//! Security event observer.
//!
//! Login failures, lockout transitions, and 2FA changes are interesting to
//! alerting pipelines. The services emit through this trait and know
//! nothing about delivery; the default sink writes structured tracing
//! events, a deployment can swap in a message-bus producer.

pub trait SecurityEvents: Send + Sync {
    fn failed_login(&self, email: &str, count: u32, attempts_remaining: u32);
    fn account_locked(&self, email: &str, lock_seconds: u64);
    fn successful_login(&self, email: &str);
    fn token_revoked(&self, subject: Option<&str>);
    fn backup_code_used(&self, email: &str);
    fn two_factor_enabled(&self, email: &str);
    fn two_factor_disabled(&self, email: &str);
}

/// Default sink: structured tracing events.
pub struct TracingEvents;

impl SecurityEvents for TracingEvents {
    fn failed_login(&self, email: &str, count: u32, attempts_remaining: u32) {
        if attempts_remaining <= 2 {
            tracing::warn!(email, count, attempts_remaining, "failed login attempt");
        } else {
            tracing::info!(email, count, "failed login attempt");
        }
    }

    fn account_locked(&self, email: &str, lock_seconds: u64) {
        tracing::warn!(email, lock_seconds, "account locked");
    }

    fn successful_login(&self, email: &str) {
        tracing::info!(email, "user logged in");
    }

    fn token_revoked(&self, subject: Option<&str>) {
        tracing::info!(subject, "token revoked");
    }

    fn backup_code_used(&self, email: &str) {
        tracing::warn!(email, "backup code consumed");
    }

    fn two_factor_enabled(&self, email: &str) {
        tracing::info!(email, "two-factor authentication enabled");
    }

    fn two_factor_disabled(&self, email: &str) {
        tracing::warn!(email, "two-factor authentication disabled");
    }
}
