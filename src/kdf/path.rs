//! Derivation Path Labels
//!
//! A path is the opaque label that selects which child key a signing
//! request targets. It binds a user identity to a user-chosen secret:
//! `"{identity}-{sha3_256(secret)}"`. The hash function is part of the
//! derivation protocol version; swapping it would silently move every
//! user's funds to different addresses, so it must never change.

use sha3::{Digest, Sha3_256};

/// Derive the opaque path label for a (user identity, secret) pair.
///
/// Pure and infallible: the same inputs always produce the same path,
/// different secrets produce unlinkable paths, and the secret itself is
/// never recoverable from the label.
pub fn derive_path(user_identity: &str, secret: &str) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(secret.as_bytes());
    let hashed_secret = hex::encode(hasher.finalize());
    format!("{}-{}", user_identity, hashed_secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_is_deterministic() {
        let a = derive_path("0xabc", "pw1");
        let b = derive_path("0xabc", "pw1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_secrets_diverge() {
        let a = derive_path("0xabc", "pw1");
        let b = derive_path("0xabc", "pw2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_path_shape() {
        let path = derive_path("0xabc", "pw1");
        let (identity, digest) = path.split_once('-').unwrap();
        assert_eq!(identity, "0xabc");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        // The label must not leak the secret itself
        assert!(!path.contains("pw1"));
    }
}
