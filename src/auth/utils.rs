//! Helpers for email normalization and secret/token generation.

use rand::{rngs::OsRng, Rng, RngCore};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Pairing codes are the leading half of a full opaque token.
const PAIRING_CODE_LEN: usize = 16;

/// Family codes avoid ambiguous characters (0/O, 1/I/L) since they are read
/// aloud between family members.
const FAMILY_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const FAMILY_CODE_LEN: usize = 6;

/// Normalize an email for lookup and uniqueness checks. Registration and
/// login both go through here so the two can never disagree on casing.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic format check on already-normalized input.
pub(crate) fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

/// High-entropy opaque token (refresh tokens, verify tokens). The raw value
/// goes to the caller once; only its hash may be stored.
pub(crate) fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// One-time pairing code handed to the device completing child activation.
pub(crate) fn generate_pairing_code() -> String {
    let mut code = generate_token();
    code.truncate(PAIRING_CODE_LEN);
    code
}

/// Uniformly random fixed-length numeric PIN for a child account.
pub(crate) fn generate_pin() -> String {
    let value: u32 = OsRng.gen_range(0..1_000_000);
    format!("{value:06}")
}

/// Stable family-scoped identifier shared between a parent and its children.
pub(crate) fn generate_family_code() -> String {
    let mut code = String::with_capacity(FAMILY_CODE_LEN);
    for _ in 0..FAMILY_CODE_LEN {
        let idx = OsRng.gen_range(0..FAMILY_CODE_ALPHABET.len());
        code.push(FAMILY_CODE_ALPHABET[idx] as char);
    }
    code
}

/// Hash an opaque token so raw values never touch the database. The hash is
/// used for lookups when the token is presented again.
pub(crate) fn hash_token(plain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plain.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn generate_token_is_hex_of_32_bytes() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(hex::decode(&token).is_ok());
    }

    #[test]
    fn pairing_code_is_token_prefix_length() {
        assert_eq!(generate_pairing_code().len(), 16);
    }

    #[test]
    fn pin_is_six_digits() {
        for _ in 0..32 {
            let pin = generate_pin();
            assert_eq!(pin.len(), 6);
            assert!(pin.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn family_code_uses_unambiguous_alphabet() {
        for _ in 0..32 {
            let code = generate_family_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| FAMILY_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn hash_token_stable_and_distinct() {
        let first = hash_token("token");
        let second = hash_token("token");
        let different = hash_token("other");
        assert_eq!(first, second);
        assert_ne!(first, different);
        assert_eq!(first.len(), 64);
    }
}
