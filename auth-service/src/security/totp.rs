/// Time-based one-time passwords (RFC 6238) for the second-factor gate.
///
/// Secrets are random 160-bit values carried as RFC 4648 base32 so they can
/// be typed into any authenticator app. Verification tolerates clock drift
/// of ±`window` 30-second steps and normalizes user input (spaces and
/// dashes stripped) before comparing.
use rand::Rng;
use totp_lite::{totp_custom, Sha1};

use crate::error::{AuthError, Result};

const STEP_SECONDS: u64 = 30;
const CODE_DIGITS: u32 = 6;
const SECRET_BYTES: usize = 20;
const BACKUP_CODE_COUNT: usize = 10;

pub struct TotpGenerator;

impl TotpGenerator {
    /// Generate a new base32-encoded shared secret.
    pub fn generate_secret() -> String {
        let mut rng = rand::thread_rng();
        let mut secret_bytes = [0u8; SECRET_BYTES];
        rng.fill(&mut secret_bytes);

        base32_encode(&secret_bytes)
    }

    /// otpauth:// provisioning URI for QR display in authenticator apps.
    pub fn provisioning_uri(issuer: &str, email: &str, secret: &str) -> String {
        format!(
            "otpauth://totp/{issuer}:{account}?secret={secret}&issuer={issuer}&algorithm=SHA1&digits={CODE_DIGITS}&period={STEP_SECONDS}",
            issuer = urlencoding::encode(issuer),
            account = urlencoding::encode(email),
        )
    }

    /// Verify a user-supplied code against the shared secret, allowing
    /// ±`window` adjacent time steps for clock drift.
    pub fn verify_code(secret: &str, code: &str, window: u32) -> Result<bool> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|_| AuthError::Internal("System clock before Unix epoch".to_string()))?
            .as_secs();

        Self::verify_code_at(secret, code, window, now)
    }

    /// Deterministic variant of [`verify_code`]; the seam tests use.
    pub fn verify_code_at(secret: &str, code: &str, window: u32, now: u64) -> Result<bool> {
        // Normalize: authenticator apps and humans insert separators
        let code = code.replace([' ', '-'], "");

        if code.len() != CODE_DIGITS as usize || !code.chars().all(|c| c.is_ascii_digit()) {
            return Ok(false);
        }

        let secret_bytes =
            base32_decode(secret).ok_or(AuthError::InvalidSecondFactorCode)?;

        for offset in -(window as i64)..=(window as i64) {
            let step_time = now as i64 + offset * STEP_SECONDS as i64;
            if step_time < 0 {
                continue;
            }
            let expected = Self::code_at(&secret_bytes, step_time as u64);
            if constant_time_compare(code.as_bytes(), expected.as_bytes()) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// The code an authenticator app would display at `time` (Unix seconds).
    pub fn code_for(secret: &str, time: u64) -> Result<String> {
        let secret_bytes =
            base32_decode(secret).ok_or(AuthError::InvalidSecondFactorCode)?;
        Ok(Self::code_at(&secret_bytes, time))
    }

    fn code_at(secret: &[u8], time: u64) -> String {
        totp_custom::<Sha1>(STEP_SECONDS, CODE_DIGITS, secret, time)
    }

    /// Generate single-use recovery codes in `XXXX-XXXX` form.
    pub fn generate_backup_codes() -> Vec<String> {
        let mut rng = rand::thread_rng();
        (0..BACKUP_CODE_COUNT)
            .map(|_| {
                format!(
                    "{:04}-{:04}",
                    rng.gen_range(0..10_000u32),
                    rng.gen_range(0..10_000u32)
                )
            })
            .collect()
    }
}

/// Base32 encoding (RFC 4648)
fn base32_encode(data: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
    let mut output = String::new();
    let mut buffer = 0u32;
    let mut buffer_size = 0;

    for byte in data {
        buffer = (buffer << 8) | u32::from(*byte);
        buffer_size += 8;

        while buffer_size >= 5 {
            buffer_size -= 5;
            let index = ((buffer >> buffer_size) & 0x1f) as usize;
            output.push(ALPHABET[index] as char);
        }
    }

    if buffer_size > 0 {
        buffer <<= 5 - buffer_size;
        let index = (buffer & 0x1f) as usize;
        output.push(ALPHABET[index] as char);
    }

    while output.len() % 8 != 0 {
        output.push('=');
    }

    output
}

/// Base32 decoding (RFC 4648)
fn base32_decode(data: &str) -> Option<Vec<u8>> {
    let data = data.trim_end_matches('=');
    let mut buffer = 0u32;
    let mut buffer_size = 0;
    let mut output = Vec::new();

    for ch in data.chars() {
        let value = match ch {
            'A'..='Z' => (ch as u32) - ('A' as u32),
            '2'..='7' => (ch as u32) - ('2' as u32) + 26,
            _ => return None,
        };

        buffer = (buffer << 5) | value;
        buffer_size += 5;

        if buffer_size >= 8 {
            buffer_size -= 8;
            output.push(((buffer >> buffer_size) & 0xff) as u8);
        }
    }

    Some(output)
}

/// Constant-time comparison so code checks do not leak match prefixes.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: u64 = 1_700_000_000;

    #[test]
    fn test_generate_secret_is_base32() {
        let secret = TotpGenerator::generate_secret();
        assert_eq!(secret.len(), 32); // 20 bytes -> 32 base32 chars
        assert!(base32_decode(&secret).is_some());
    }

    #[test]
    fn test_base32_round_trip() {
        let data = [0u8, 1, 2, 3, 254, 255, 42, 13, 7, 99];
        let encoded = base32_encode(&data);
        assert_eq!(base32_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_provisioning_uri() {
        let uri = TotpGenerator::provisioning_uri("Argent", "user@example.com", "JBSWY3DPEHPK3PXP");
        assert!(uri.starts_with("otpauth://totp/Argent:"));
        assert!(uri.contains("secret=JBSWY3DPEHPK3PXP"));
        assert!(uri.contains("issuer=Argent"));
        assert!(uri.contains("user%40example.com"));
    }

    #[test]
    fn test_current_code_verifies() {
        let secret = TotpGenerator::generate_secret();
        let code = TotpGenerator::code_for(&secret, T).unwrap();
        assert!(TotpGenerator::verify_code_at(&secret, &code, 1, T).unwrap());
    }

    #[test]
    fn test_adjacent_window_tolerated() {
        let secret = TotpGenerator::generate_secret();
        let previous = TotpGenerator::code_for(&secret, T - STEP_SECONDS).unwrap();
        let next = TotpGenerator::code_for(&secret, T + STEP_SECONDS).unwrap();

        assert!(TotpGenerator::verify_code_at(&secret, &previous, 1, T).unwrap());
        assert!(TotpGenerator::verify_code_at(&secret, &next, 1, T).unwrap());
    }

    #[test]
    fn test_outside_window_rejected() {
        let secret = TotpGenerator::generate_secret();
        let stale = TotpGenerator::code_for(&secret, T - 3 * STEP_SECONDS).unwrap();
        assert!(!TotpGenerator::verify_code_at(&secret, &stale, 1, T).unwrap());
    }

    #[test]
    fn test_code_normalization() {
        let secret = TotpGenerator::generate_secret();
        let code = TotpGenerator::code_for(&secret, T).unwrap();
        let spaced = format!("{} {}", &code[..3], &code[3..]);
        let dashed = format!("{}-{}", &code[..3], &code[3..]);

        assert!(TotpGenerator::verify_code_at(&secret, &spaced, 1, T).unwrap());
        assert!(TotpGenerator::verify_code_at(&secret, &dashed, 1, T).unwrap());
    }

    #[test]
    fn test_non_numeric_code_rejected() {
        let secret = TotpGenerator::generate_secret();
        assert!(!TotpGenerator::verify_code_at(&secret, "12a456", 1, T).unwrap());
        assert!(!TotpGenerator::verify_code_at(&secret, "12345", 1, T).unwrap());
    }

    #[test]
    fn test_generate_backup_codes() {
        let codes = TotpGenerator::generate_backup_codes();
        assert_eq!(codes.len(), 10);
        for code in codes {
            assert_eq!(code.len(), 9);
            assert_eq!(&code[4..5], "-");
            assert!(code
                .chars()
                .all(|c| c.is_ascii_digit() || c == '-'));
        }
    }
}
