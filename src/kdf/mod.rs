//! Key Derivation Module
//!
//! Turns (user identity, secret) into derivation paths, derivation paths
//! into child public keys under the MPC root key, and child keys into
//! chain-specific addresses. Everything here is pure and deterministic;
//! no key material for the spendable chains ever exists locally.

mod address;
mod epsilon;
mod path;

pub use address::*;
pub use epsilon::*;
pub use path::*;

use bitcoin::Network;

use crate::error::WardenResult;
use crate::types::Chain;

/// A derived account: the chain address plus the child key behind it
#[derive(Debug, Clone)]
pub struct GeneratedAccount {
    pub address: DerivedAddress,
    pub public_key: ChildPublicKey,
}

/// Resolve (user identity, secret, chain) to an address in one step.
///
/// This is the full read path: secret-bound path label, child key under
/// the engine's root key, chain encoding. Callers that need to verify a
/// spend re-run exactly this and compare.
pub fn generate_account(
    engine: &DerivationEngine,
    user_identity: &str,
    secret: &str,
    chain: Chain,
    network: Network,
) -> WardenResult<GeneratedAccount> {
    let path = derive_path(user_identity, secret);
    let child = engine.derive_child_public_key(&path)?;
    let address = derive_address(&child, chain, network)?;
    Ok(GeneratedAccount {
        address,
        public_key: child,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{PublicKey, Secp256k1, SecretKey};

    #[test]
    fn test_generate_account_is_stable_and_secret_bound() {
        let secp = Secp256k1::new();
        let master = PublicKey::from_secret_key(&secp, &SecretKey::from_slice(&[13u8; 32]).unwrap());
        let engine = DerivationEngine::new(master, "agent.testnet");

        let a = generate_account(&engine, "0xabc", "pw1", Chain::Ethereum, Network::Testnet)
            .unwrap();
        let b = generate_account(&engine, "0xabc", "pw1", Chain::Ethereum, Network::Testnet)
            .unwrap();
        assert_eq!(a.address.address(), b.address.address());
        assert_eq!(a.address.address().len(), 42);

        let c = generate_account(&engine, "0xabc", "pw2", Chain::Ethereum, Network::Testnet)
            .unwrap();
        assert_ne!(a.address.address(), c.address.address());

        let btc = generate_account(&engine, "0xabc", "pw1", Chain::Bitcoin, Network::Testnet)
            .unwrap();
        assert!(matches!(btc.address, DerivedAddress::Bitcoin(_)));
        // Same secret, different chain, same child key
        assert_eq!(btc.public_key.to_hex(), a.public_key.to_hex());
    }
}
