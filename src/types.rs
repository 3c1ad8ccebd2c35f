//! Shared types for Warden Core
//!
//! Data structures that cross module boundaries are defined here for
//! consistent serialization across the derivation, signing, and chain
//! adapter layers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{WardenError, WardenResult};

// =============================================================================
// Chain Types
// =============================================================================

/// Supported blockchain networks
///
/// `Near` is the coordination ledger that hosts the MPC signer contract;
/// spendable user wallets live on the other chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Chain {
    Ethereum,
    Bitcoin,
    Near,
}

impl Chain {
    pub fn is_evm(&self) -> bool {
        matches!(self, Chain::Ethereum)
    }

    pub fn is_utxo(&self) -> bool {
        matches!(self, Chain::Bitcoin)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ETH",
            Chain::Bitcoin => "BTC",
            Chain::Near => "NEAR",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Ethereum => write!(f, "ethereum"),
            Chain::Bitcoin => write!(f, "bitcoin"),
            Chain::Near => write!(f, "near"),
        }
    }
}

impl FromStr for Chain {
    type Err = WardenError;

    fn from_str(s: &str) -> WardenResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ethereum" | "eth" => Ok(Chain::Ethereum),
            "bitcoin" | "btc" => Ok(Chain::Bitcoin),
            "near" => Ok(Chain::Near),
            other => Err(WardenError::unsupported_chain(format!(
                "Unsupported chain: {}",
                other
            ))),
        }
    }
}

// =============================================================================
// Send Results
// =============================================================================

/// Outcome of a successful broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOutcome {
    /// Transaction hash as reported by the network
    pub tx_hash: String,
    /// Block explorer link for the transaction, when the adapter knows one
    pub explorer_url: Option<String>,
}

impl SendOutcome {
    pub fn new(tx_hash: impl Into<String>, explorer_base: &str) -> Self {
        let tx_hash = tx_hash.into();
        let explorer_url = if explorer_base.is_empty() {
            None
        } else {
            Some(format!("{}/tx/{}", explorer_base.trim_end_matches('/'), tx_hash))
        };
        Self { tx_hash, explorer_url }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_parsing() {
        assert_eq!("ethereum".parse::<Chain>().unwrap(), Chain::Ethereum);
        assert_eq!("BTC".parse::<Chain>().unwrap(), Chain::Bitcoin);
        assert_eq!("near".parse::<Chain>().unwrap(), Chain::Near);

        let err = "dogecoin".parse::<Chain>().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::UnsupportedChain);
    }

    #[test]
    fn test_chain_classification() {
        assert!(Chain::Ethereum.is_evm());
        assert!(!Chain::Ethereum.is_utxo());
        assert!(Chain::Bitcoin.is_utxo());
        assert!(!Chain::Near.is_evm());
    }

    #[test]
    fn test_send_outcome_explorer_link() {
        let outcome = SendOutcome::new("0xabc", "https://example.com");
        assert_eq!(outcome.explorer_url.as_deref(), Some("https://example.com/tx/0xabc"));

        let bare = SendOutcome::new("0xabc", "");
        assert!(bare.explorer_url.is_none());
    }
}
