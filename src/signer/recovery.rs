//! Signature Finalization
//!
//! The signer network's `recovery_id` is not trusted when a signature
//! has to be bound to a specific sender. Both candidate parities are
//! tried through standard ECDSA public-key recovery and the first one
//! whose recovered signer matches the expectation wins. A signature
//! matching neither parity means a signer/path mismatch or a corrupted
//! response, and is always surfaced as an error - never broadcast.

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1};

use crate::error::{WardenError, WardenResult};
use crate::signer::MpcSignature;
use crate::utils::crypto::keccak256;

/// Recover the EIP-155 `v` value that binds `sig` to `expected_address`.
///
/// Tries both parities mapped to `v = parity + chain_id*2 + 35` and
/// compares the recovered address case-insensitively. Returns the full
/// `v` for transaction serialization.
pub fn recover_ethereum_signature(
    payload: &[u8; 32],
    sig: &MpcSignature,
    chain_id: u64,
    expected_address: &str,
) -> WardenResult<u64> {
    let expected = expected_address.to_lowercase();
    let parity = find_matching_parity(payload, sig, |public_key| {
        let bytes = public_key.serialize_uncompressed();
        let hash = keccak256(&bytes[1..]);
        format!("0x{}", hex::encode(&hash[12..])) == expected
    })?;
    Ok(parity as u64 + chain_id * 2 + 35)
}

/// Check that `sig` was produced by `expected` over `payload`.
///
/// Returns the recovery parity that matched. Used by the Bitcoin spend
/// path, where the script carries the public key rather than an
/// address.
pub fn verify_against_public_key(
    payload: &[u8; 32],
    sig: &MpcSignature,
    expected: &PublicKey,
) -> WardenResult<u8> {
    find_matching_parity(payload, sig, |public_key| public_key == expected)
}

fn find_matching_parity(
    payload: &[u8; 32],
    sig: &MpcSignature,
    matches: impl Fn(&PublicKey) -> bool,
) -> WardenResult<u8> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(payload)
        .map_err(|e| WardenError::crypto_error(format!("Invalid payload digest: {}", e)))?;
    let compact = sig.to_compact();

    for parity in 0..2i32 {
        let recovery_id = match RecoveryId::from_i32(parity) {
            Ok(id) => id,
            Err(_) => continue,
        };
        let recoverable = match RecoverableSignature::from_compact(&compact, recovery_id) {
            Ok(s) => s,
            Err(_) => continue,
        };
        let public_key = match secp.recover_ecdsa(&message, &recoverable) {
            Ok(pk) => pk,
            Err(_) => continue,
        };
        if matches(&public_key) {
            return Ok(parity as u8);
        }
    }

    Err(WardenError::signature_recovery(
        "Signature does not recover the expected signer",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::SecretKey;

    fn sign_locally(payload: &[u8; 32], secret: &SecretKey) -> MpcSignature {
        let secp = Secp256k1::new();
        let message = Message::from_digest_slice(payload).unwrap();
        let signature = secp.sign_ecdsa_recoverable(&message, secret);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);
        MpcSignature {
            r,
            s,
            recovery_id: recovery_id.to_i32() as u8,
        }
    }

    fn eth_address(public_key: &PublicKey) -> String {
        let bytes = public_key.serialize_uncompressed();
        let hash = keccak256(&bytes[1..]);
        format!("0x{}", hex::encode(&hash[12..]))
    }

    #[test]
    fn test_exactly_one_parity_recovers_eth_address() {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[3u8; 32]).unwrap();
        let public_key = PublicKey::from_secret_key(&secp, &secret);
        let payload = keccak256(b"unsigned transaction bytes");

        let sig = sign_locally(&payload, &secret);
        let chain_id = 11155111u64;
        let v = recover_ethereum_signature(&payload, &sig, chain_id, &eth_address(&public_key))
            .unwrap();

        let parity = v - chain_id * 2 - 35;
        assert!(parity < 2);
        assert_eq!(parity as u8, sig.recovery_id);
    }

    #[test]
    fn test_address_comparison_ignores_case() {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[4u8; 32]).unwrap();
        let public_key = PublicKey::from_secret_key(&secp, &secret);
        let payload = keccak256(b"payload");

        let sig = sign_locally(&payload, &secret);
        let upper = eth_address(&public_key).to_uppercase().replace("0X", "0x");
        assert!(recover_ethereum_signature(&payload, &sig, 1, &upper).is_ok());
    }

    #[test]
    fn test_wrong_address_fails_recovery() {
        let secret = SecretKey::from_slice(&[5u8; 32]).unwrap();
        let payload = keccak256(b"payload");
        let sig = sign_locally(&payload, &secret);

        let err = recover_ethereum_signature(
            &payload,
            &sig,
            1,
            "0x7ab98f6b22ecb42e27dc9c7d2d488f69b5cdd0b2",
        )
        .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::SignatureRecovery);
    }

    #[test]
    fn test_corrupted_s_fails_both_parities() {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[6u8; 32]).unwrap();
        let public_key = PublicKey::from_secret_key(&secp, &secret);
        let payload = keccak256(b"payload");

        let mut sig = sign_locally(&payload, &secret);
        sig.s[7] ^= 0xff;

        assert!(recover_ethereum_signature(&payload, &sig, 1, &eth_address(&public_key)).is_err());
        assert!(verify_against_public_key(&payload, &sig, &public_key).is_err());
    }

    #[test]
    fn test_public_key_verification() {
        let secp = Secp256k1::new();
        let secret = SecretKey::from_slice(&[8u8; 32]).unwrap();
        let public_key = PublicKey::from_secret_key(&secp, &secret);
        let other = PublicKey::from_secret_key(&secp, &SecretKey::from_slice(&[9u8; 32]).unwrap());
        let payload = keccak256(b"sighash");

        let sig = sign_locally(&payload, &secret);
        let parity = verify_against_public_key(&payload, &sig, &public_key).unwrap();
        assert_eq!(parity, sig.recovery_id);
        assert!(verify_against_public_key(&payload, &sig, &other).is_err());
    }
}
