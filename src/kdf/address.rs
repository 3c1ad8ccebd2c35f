//! Chain Address Encoding
//!
//! Maps a derived child public key onto each supported chain's address
//! format. The coordination-ledger case also yields a fresh ed25519
//! keypair seeded from the child point; the secret half is only ever
//! used once, to register the account's access key at provisioning.

use bitcoin::Network;
use ed25519_dalek::SigningKey;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{WardenError, WardenResult};
use crate::kdf::ChildPublicKey;
use crate::types::Chain;
use crate::utils::crypto::{keccak256, sha256};

type HmacSha512 = Hmac<Sha512>;

/// A chain-specific rendering of one child key
#[derive(Debug, Clone)]
pub enum DerivedAddress {
    /// Lowercase `0x`-prefixed hex, 20 bytes of keccak(point)
    Ethereum(String),
    /// Base58Check P2PKH address for the configured network
    Bitcoin(String),
    /// Implicit coordination-ledger account plus its derived keypair
    Near(NearCredentials),
}

impl DerivedAddress {
    /// The plain address/account identifier for display and storage
    pub fn address(&self) -> &str {
        match self {
            DerivedAddress::Ethereum(addr) | DerivedAddress::Bitcoin(addr) => addr,
            DerivedAddress::Near(creds) => &creds.account_id,
        }
    }
}

/// Implicit-account credentials for the coordination ledger
///
/// The secret key exists so the account's first access key can be
/// registered; it is zeroized on drop and must not be persisted.
#[derive(Clone)]
pub struct NearCredentials {
    /// 64-char hex account id (the ed25519 public key)
    pub account_id: String,
    /// Ledger wire form, `ed25519:<base58 public>`
    pub public_key: String,
    /// Ledger wire form, `ed25519:<base58 secret||public>`
    pub secret_key: Zeroizing<String>,
}

impl fmt::Debug for NearCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NearCredentials")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Encode a child key as an address on `chain`.
///
/// `network` selects the Bitcoin version byte; it is ignored for the
/// other chains.
pub fn derive_address(
    child: &ChildPublicKey,
    chain: Chain,
    network: Network,
) -> WardenResult<DerivedAddress> {
    match chain {
        Chain::Ethereum => Ok(DerivedAddress::Ethereum(ethereum_address(child))),
        Chain::Bitcoin => Ok(DerivedAddress::Bitcoin(bitcoin_address(child, network)?)),
        Chain::Near => Ok(DerivedAddress::Near(near_credentials(child)?)),
    }
}

/// EVM address: keccak256 over the 64-byte point body (0x04 dropped),
/// last 20 bytes, lowercase hex
pub fn ethereum_address(child: &ChildPublicKey) -> String {
    let point = child.uncompressed();
    let hash = keccak256(&point[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Bitcoin P2PKH address: Base58Check(version || hash160(point))
///
/// The hash covers the full uncompressed point, matching the key the
/// spend path later places in scriptSig.
pub fn bitcoin_address(child: &ChildPublicKey, network: Network) -> WardenResult<String> {
    let pubkey = bitcoin::PublicKey::from_slice(&child.uncompressed())
        .map_err(|e| WardenError::crypto_error(format!("Invalid child point: {}", e)))?;
    Ok(bitcoin::Address::p2pkh(&pubkey, network).to_string())
}

/// Coordination-ledger implicit account derived from the child point.
///
/// A 32-byte seed (SHA-256 of the point) feeds the ledger's standard
/// seed-phrase keypair generation: entropy -> BIP-39 mnemonic -> seed ->
/// HMAC-SHA512 ed25519 expansion. The account id is the hex of the
/// resulting public key.
pub fn near_credentials(child: &ChildPublicKey) -> WardenResult<NearCredentials> {
    let entropy = sha256(&child.uncompressed());
    let mnemonic = bip39::Mnemonic::from_entropy(&entropy)?;
    let seed = Zeroizing::new(mnemonic.to_seed(""));

    let mut mac = HmacSha512::new_from_slice(b"ed25519 near seed")
        .map_err(|e| WardenError::crypto_error(format!("HMAC init failed: {}", e)))?;
    mac.update(seed.as_ref());
    let expanded = mac.finalize().into_bytes();

    let mut private_bytes = Zeroizing::new([0u8; 32]);
    private_bytes.copy_from_slice(&expanded[..32]);

    let signing_key = SigningKey::from_bytes(&private_bytes);
    let verifying_key = signing_key.verifying_key();

    let account_id = hex::encode(verifying_key.as_bytes());
    let public_key = format!("ed25519:{}", bs58::encode(verifying_key.as_bytes()).into_string());

    let mut keypair_bytes = Zeroizing::new([0u8; 64]);
    keypair_bytes[..32].copy_from_slice(private_bytes.as_ref());
    keypair_bytes[32..].copy_from_slice(verifying_key.as_bytes());
    let secret_key = Zeroizing::new(format!(
        "ed25519:{}",
        bs58::encode(keypair_bytes.as_ref() as &[u8]).into_string()
    ));

    Ok(NearCredentials {
        account_id,
        public_key,
        secret_key,
    })
}
