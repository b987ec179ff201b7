//! One-way digests for values that must never be stored in the clear.
//!
//! Revoked tokens and backup codes are both persisted as SHA-256 digests:
//! a store dump must not yield a usable credential.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of `input`.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_consistency() {
        let token = "test_token_12345";
        assert_eq!(sha256_hex(token), sha256_hex(token));
    }

    #[test]
    fn test_digest_uniqueness() {
        assert_ne!(sha256_hex("token1"), sha256_hex("token2"));
    }

    #[test]
    fn test_digest_length() {
        // SHA-256 produces 64 hex characters
        assert_eq!(sha256_hex("any_token").len(), 64);
    }
}
