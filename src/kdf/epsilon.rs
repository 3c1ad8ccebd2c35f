//! Additive ("epsilon") Key Derivation
//!
//! Child public keys are derived from the MPC network's root public key
//! as `child = root + e·G`, where the scalar `e` is a hash of the
//! custodial signer account and the derivation path. Anyone holding the
//! root public key can compute any child *public* key; only the signer
//! network, which holds the root private key in shares, can sign for it.
//!
//! The scalar derivation string is a versioned protocol constant shared
//! with the signer network. Changing it re-keys every derived address.

use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Sha3_256};

use crate::error::{WardenError, WardenResult};

/// Versioned domain separator for the epsilon scalar, fixed by the
/// signer network's key derivation protocol
const EPSILON_DERIVATION_PREFIX: &str = "near-mpc-recovery v0.1.0 epsilon derivation:";

/// An uncompressed secp256k1 child public key derived from the root key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildPublicKey {
    point: PublicKey,
}

impl ChildPublicKey {
    pub fn as_point(&self) -> &PublicKey {
        &self.point
    }

    /// The full 65-byte uncompressed SEC1 encoding (0x04 prefix)
    pub fn uncompressed(&self) -> [u8; 65] {
        self.point.serialize_uncompressed()
    }

    /// Uncompressed encoding as lowercase hex, `04`-prefixed
    pub fn to_hex(&self) -> String {
        hex::encode(self.uncompressed())
    }
}

/// Compute the epsilon scalar bytes for (signer account, path)
pub fn derive_epsilon(signer_id: &str, path: &str) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(format!("{}{},{}", EPSILON_DERIVATION_PREFIX, signer_id, path).as_bytes());
    hasher.finalize().into()
}

/// Derivation engine bound to one root key and one custodial signer account
///
/// `signer_id` is part of the scalar derivation, so the same (identity,
/// secret) pair yields different child keys under different deployments.
#[derive(Debug, Clone)]
pub struct DerivationEngine {
    master: PublicKey,
    signer_id: String,
}

impl DerivationEngine {
    pub fn new(master: PublicKey, signer_id: impl Into<String>) -> Self {
        Self {
            master,
            signer_id: signer_id.into(),
        }
    }

    /// Build an engine from the ledger-encoded root key
    /// (`secp256k1:<base58 of x||y>`, or raw SEC1 hex)
    pub fn from_encoded_key(encoded: &str, signer_id: impl Into<String>) -> WardenResult<Self> {
        Ok(Self::new(parse_root_public_key(encoded)?, signer_id))
    }

    pub fn master_key(&self) -> &PublicKey {
        &self.master
    }

    pub fn signer_id(&self) -> &str {
        &self.signer_id
    }

    /// Derive the child public key selected by `path`.
    ///
    /// Pure function of (root key, signer account, path): identical
    /// inputs always yield the identical point. Results are deliberately
    /// not cached anywhere - spend flows re-derive on every request to
    /// authenticate the caller-supplied path.
    pub fn derive_child_public_key(&self, path: &str) -> WardenResult<ChildPublicKey> {
        let epsilon = derive_epsilon(&self.signer_id, path);

        // A SHA3 output at or above the curve order is rejected by
        // from_slice; probability ~2^-128, but surface it rather than panic.
        let scalar = SecretKey::from_slice(&epsilon).map_err(|e| {
            WardenError::crypto_error(format!("Epsilon scalar out of range: {}", e))
        })?;

        let secp = Secp256k1::new();
        let epsilon_point = PublicKey::from_secret_key(&secp, &scalar);
        let point = self.master.combine(&epsilon_point).map_err(|e| {
            WardenError::crypto_error(format!("Child point addition failed: {}", e))
        })?;

        Ok(ChildPublicKey { point })
    }
}

/// Parse the root public key from its ledger wire form.
///
/// The coordination ledger encodes secp256k1 keys as
/// `secp256k1:<base58>` over the raw 64-byte x||y coordinates; the SEC1
/// 0x04 prefix is implied. Raw hex (with or without the prefix byte) is
/// accepted for tests and local tooling.
pub fn parse_root_public_key(encoded: &str) -> WardenResult<PublicKey> {
    let bytes = if let Some(b58) = encoded.strip_prefix("secp256k1:") {
        let raw = bs58::decode(b58)
            .into_vec()
            .map_err(|e| WardenError::parse_error(format!("Invalid base58 root key: {}", e)))?;
        if raw.len() != 64 {
            return Err(WardenError::parse_error(format!(
                "Root key must be 64 bytes of coordinates, got {}",
                raw.len()
            )));
        }
        let mut buf = vec![0x04u8];
        buf.extend_from_slice(&raw);
        buf
    } else {
        let raw = hex::decode(encoded.trim_start_matches("0x"))?;
        match raw.len() {
            65 => raw,
            64 => {
                let mut buf = vec![0x04u8];
                buf.extend_from_slice(&raw);
                buf
            }
            n => {
                return Err(WardenError::parse_error(format!(
                    "Root key must be 64 or 65 bytes, got {}",
                    n
                )))
            }
        }
    };

    PublicKey::from_slice(&bytes)
        .map_err(|e| WardenError::crypto_error(format!("Invalid root public key: {}", e)))
}
