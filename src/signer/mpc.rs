//! MPC Signing Client
//!
//! Submits signing requests to the signer contract and decodes the
//! returned payload. The round trip routinely takes tens of seconds -
//! the remote network runs its threshold protocol inside the function
//! call - so the future is long-blocking by design and is bounded by an
//! explicit timeout. Attempts are never retried automatically: every
//! call burns the attached deposit whether or not it succeeds.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{WardenError, WardenResult};
use crate::ledger::LedgerClient;
use crate::log_info;
use crate::signer::MpcSignature;

/// Client for the signer network's `sign` entry point
#[derive(Debug, Clone)]
pub struct MpcSigner {
    contract_id: String,
    deposit_yocto: u128,
    gas: u64,
    timeout: Duration,
}

/// Wire format of the signer contract's return value
#[derive(Deserialize)]
struct SignatureResponse {
    big_r: SerializableAffinePoint,
    s: SerializableScalar,
    recovery_id: u8,
}

#[derive(Deserialize)]
struct SerializableAffinePoint {
    affine_point: String,
}

#[derive(Deserialize)]
struct SerializableScalar {
    scalar: String,
}

impl MpcSigner {
    pub fn new(
        contract_id: impl Into<String>,
        deposit_yocto: u128,
        gas: u64,
        timeout_secs: u64,
    ) -> Self {
        Self {
            contract_id: contract_id.into(),
            deposit_yocto,
            gas,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    /// Request a signature over a 32-byte payload for the child key
    /// selected by `path`.
    ///
    /// Fails with `SigningTimeout` when the network does not respond in
    /// time, and `SigningFailed` when the ledger rejects the call or the
    /// contract reports an execution failure.
    pub async fn sign<L: LedgerClient>(
        &self,
        payload: [u8; 32],
        path: &str,
        ledger: &L,
    ) -> WardenResult<MpcSignature> {
        let args = serde_json::json!({
            "request": {
                "payload": payload,
                "path": path,
                "key_version": 0,
            }
        });

        log_info!(
            "signer",
            "Requesting remote signature",
            contract = self.contract_id,
            path = path,
        );

        let call = ledger.function_call(
            &self.contract_id,
            "sign",
            args,
            self.gas,
            self.deposit_yocto,
        );
        let outcome = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                WardenError::signing_timeout(format!(
                    "Remote signer did not respond within {}s",
                    self.timeout.as_secs()
                ))
            })??;

        if let Some(failure) = outcome.failure {
            return Err(
                WardenError::signing_failed("Signer contract call failed").with_details(failure)
            );
        }

        let encoded = outcome.success_value.ok_or_else(|| {
            WardenError::signing_failed("Signer contract returned no value")
        })?;

        decode_signature_response(&encoded)
    }
}

/// Decode the base64-encoded JSON signature returned by the contract.
///
/// `r` is the affine point of big R with its 1-byte parity prefix
/// dropped; `s` is the scalar, left-padded to 32 bytes.
pub fn decode_signature_response(encoded: &str) -> WardenResult<MpcSignature> {
    let raw = BASE64.decode(encoded.trim())?;
    let response: SignatureResponse = serde_json::from_slice(&raw)?;

    let big_r = hex::decode(&response.big_r.affine_point)?;
    if big_r.len() != 33 {
        return Err(WardenError::parse_error(format!(
            "Signature big R must be a 33-byte compressed point, got {} bytes",
            big_r.len()
        )));
    }
    let mut r = [0u8; 32];
    r.copy_from_slice(&big_r[1..]);

    let s_raw = hex::decode(&response.s.scalar)?;
    if s_raw.len() > 32 {
        return Err(WardenError::parse_error(format!(
            "Signature scalar too long: {} bytes",
            s_raw.len()
        )));
    }
    let mut s = [0u8; 32];
    s[32 - s_raw.len()..].copy_from_slice(&s_raw);

    Ok(MpcSignature {
        r,
        s,
        recovery_id: response.recovery_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_response(affine_point: &str, scalar: &str, recovery_id: u8) -> String {
        let json = serde_json::json!({
            "big_r": { "affine_point": affine_point },
            "s": { "scalar": scalar },
            "recovery_id": recovery_id,
        });
        BASE64.encode(serde_json::to_vec(&json).unwrap())
    }

    #[test]
    fn test_decode_signature_response() {
        let r_bytes = [0x11u8; 32];
        let s_bytes = [0x22u8; 32];
        let affine = format!("03{}", hex::encode(r_bytes));
        let encoded = encode_response(&affine, &hex::encode(s_bytes), 1);

        let sig = decode_signature_response(&encoded).unwrap();
        assert_eq!(sig.r, r_bytes);
        assert_eq!(sig.s, s_bytes);
        assert_eq!(sig.recovery_id, 1);
    }

    #[test]
    fn test_decode_pads_short_scalar() {
        let affine = format!("02{}", hex::encode([0x11u8; 32]));
        let encoded = encode_response(&affine, "ff00", 0);

        let sig = decode_signature_response(&encoded).unwrap();
        assert_eq!(&sig.s[..30], &[0u8; 30]);
        assert_eq!(&sig.s[30..], &[0xff, 0x00]);
    }

    #[test]
    fn test_decode_rejects_bad_point_length() {
        let encoded = encode_response("0211", &hex::encode([0u8; 32]), 0);
        assert!(decode_signature_response(&encoded).is_err());
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        assert!(decode_signature_response("not-base64!!!").is_err());
    }
}
