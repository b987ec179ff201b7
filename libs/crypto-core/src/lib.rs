//! Shared cryptographic primitives for Argent services.
//!
//! Token issuing/validation lives here so that services which only need to
//! check bearer tokens do not have to depend on the full auth service.

pub mod hash;
pub mod jwt;

pub use hash::sha256_hex;
pub use jwt::{Claims, TokenError, TokenIssuer, TokenPair, TokenType};
