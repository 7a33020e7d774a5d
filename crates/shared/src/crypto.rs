//! Cryptographic utilities for bearer tokens, reset tokens and webhook signatures.

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Prefix carried by every bearer token issued at login.
pub const ACCESS_TOKEN_PREFIX: &str = "hd_";

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates 32 random bytes, hex encoded (64 chars).
pub fn generate_secure_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Generates a new opaque bearer token (`hd_` + 64 hex chars).
///
/// Only the SHA-256 of the returned value is ever persisted.
pub fn generate_access_token() -> String {
    format!("{}{}", ACCESS_TOKEN_PREFIX, generate_secure_token())
}

/// Returns true when the string has the shape of a token produced by
/// [`generate_access_token`]. Used to reject garbage before hitting the database.
pub fn is_well_formed_access_token(token: &str) -> bool {
    token
        .strip_prefix(ACCESS_TOKEN_PREFIX)
        .map(|rest| rest.len() == 64 && rest.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Signs a payload with HMAC-SHA256, returning `sha256=<hex>`.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    // HMAC accepts keys of any length, so construction cannot fail.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a `sha256=<hex>` signature in constant time.
pub fn verify_signature(payload: &[u8], secret: &str, signature: &str) -> bool {
    let Some(hex_sig) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sha256_hex_deterministic() {
        assert_eq!(sha256_hex("same_input"), sha256_hex("same_input"));
        assert_ne!(sha256_hex("input1"), sha256_hex("input2"));
    }

    #[test]
    fn test_generate_secure_token_shape() {
        let token = generate_secure_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_secure_token());
    }

    #[test]
    fn test_access_token_format() {
        let token = generate_access_token();
        assert!(token.starts_with(ACCESS_TOKEN_PREFIX));
        assert!(is_well_formed_access_token(&token));
    }

    #[test]
    fn test_malformed_access_tokens() {
        assert!(!is_well_formed_access_token(""));
        assert!(!is_well_formed_access_token("hd_short"));
        assert!(!is_well_formed_access_token(&"a".repeat(67)));
        assert!(!is_well_formed_access_token(&format!("hd_{}", "z".repeat(64))));
    }

    #[test]
    fn test_signature_roundtrip() {
        let body = br#"{"from":"5511999999999","text":"oi"}"#;
        let sig = sign_payload(body, "secret");
        assert!(sig.starts_with("sha256="));
        assert!(verify_signature(body, "secret", &sig));
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let sig = sign_payload(b"payload", "secret");
        assert!(!verify_signature(b"payload2", "secret", &sig));
        assert!(!verify_signature(b"payload", "other", &sig));
        assert!(!verify_signature(b"payload", "secret", "md5=abc"));
        assert!(!verify_signature(b"payload", "secret", "sha256=zz"));
    }
}
