//! Runtime Configuration
//!
//! Environment loading is confined to this module; everything else
//! receives explicit configuration values or constructed components.
//! Defaults target the testnet deployment (Sepolia, Bitcoin testnet)
//! the service runs against.

use bitcoin::Network;
use std::env;

use crate::chains::{BitcoinAdapter, EthereumAdapter};
use crate::error::{WardenError, WardenResult};
use crate::kdf::DerivationEngine;
use crate::ledger::AccountProvisioner;
use crate::signer::MpcSigner;

/// Default deposit attached to every signing call (0.2 NEAR)
const DEFAULT_SIGN_DEPOSIT_YOCTO: u128 = 200_000_000_000_000_000_000_000;
/// Default gas attached to every signing call (300 Tgas)
const DEFAULT_SIGN_GAS: u64 = 300_000_000_000_000;
/// Default remote-signer timeout; the MPC round trip routinely takes
/// tens of seconds
const DEFAULT_SIGN_TIMEOUT_SECS: u64 = 120;
/// Default funding for a freshly provisioned implicit account (0.1 NEAR)
const DEFAULT_FUNDING_AMOUNT_YOCTO: u128 = 100_000_000_000_000_000_000_000;

/// EVM network endpoints and transaction parameters
#[derive(Debug, Clone)]
pub struct EvmNetworkConfig {
    pub rpc_url: String,
    /// Gasnow-style oracle reporting rapid/fast/standard tiers
    pub gas_oracle_url: String,
    pub chain_id: u64,
    /// Gas limit for plain value transfers
    pub gas_limit: u64,
    pub explorer_url: String,
}

impl Default for EvmNetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://eth-sepolia.blockscout.com/api/eth-rpc".to_string(),
            gas_oracle_url: "https://sepolia.beaconcha.in/api/v1/execution/gasnow".to_string(),
            chain_id: 11155111,
            gas_limit: 21000,
            explorer_url: "https://eth-sepolia.blockscout.com".to_string(),
        }
    }
}

/// Bitcoin esplora endpoints and fee parameters
#[derive(Debug, Clone)]
pub struct BtcNetworkConfig {
    /// Esplora-compatible API base, e.g. blockstream.info
    pub api_url: String,
    pub network: Network,
    pub explorer_url: String,
    /// Confirmation target (in blocks) used against `/fee-estimates`
    pub fee_target_blocks: u16,
    /// Flat sat/vB added on top of the reported fee rate
    pub fee_safety_margin: f64,
}

impl Default for BtcNetworkConfig {
    fn default() -> Self {
        Self {
            api_url: "https://blockstream.info/testnet/api".to_string(),
            network: Network::Testnet,
            explorer_url: "https://blockstream.info/testnet".to_string(),
            fee_target_blocks: 6,
            fee_safety_margin: 3.0,
        }
    }
}

/// Parameters of the remote signing round trip
#[derive(Debug, Clone)]
pub struct SigningConfig {
    pub deposit_yocto: u128,
    pub gas: u64,
    pub timeout_secs: u64,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            deposit_yocto: DEFAULT_SIGN_DEPOSIT_YOCTO,
            gas: DEFAULT_SIGN_GAS,
            timeout_secs: DEFAULT_SIGN_TIMEOUT_SECS,
        }
    }
}

/// Top-level configuration for the signing core
#[derive(Debug, Clone)]
pub struct WardenConfig {
    /// Account id of the MPC signer contract
    pub mpc_contract_id: String,
    /// Root public key of the signer network (`secp256k1:<base58>`)
    pub mpc_root_key: String,
    /// Custodial account that submits signing calls; also the signer id
    /// bound into every derivation
    pub ledger_account_id: String,
    pub funding_amount_yocto: u128,
    pub signing: SigningConfig,
    pub ethereum: EvmNetworkConfig,
    pub bitcoin: BtcNetworkConfig,
}

impl WardenConfig {
    /// Testnet configuration with explicit deployment identity
    pub fn testnet(
        mpc_contract_id: impl Into<String>,
        mpc_root_key: impl Into<String>,
        ledger_account_id: impl Into<String>,
    ) -> Self {
        Self {
            mpc_contract_id: mpc_contract_id.into(),
            mpc_root_key: mpc_root_key.into(),
            ledger_account_id: ledger_account_id.into(),
            funding_amount_yocto: DEFAULT_FUNDING_AMOUNT_YOCTO,
            signing: SigningConfig::default(),
            ethereum: EvmNetworkConfig::default(),
            bitcoin: BtcNetworkConfig::default(),
        }
    }

    /// Load configuration from the environment.
    ///
    /// `WARDEN_MPC_CONTRACT_ID`, `WARDEN_MPC_ROOT_KEY`, and
    /// `WARDEN_LEDGER_ACCOUNT_ID` are required; everything else falls
    /// back to the testnet defaults.
    pub fn from_env() -> WardenResult<Self> {
        let mut config = Self::testnet(
            require_env("WARDEN_MPC_CONTRACT_ID")?,
            require_env("WARDEN_MPC_ROOT_KEY")?,
            require_env("WARDEN_LEDGER_ACCOUNT_ID")?,
        );

        if let Some(value) = optional_env("WARDEN_FUNDING_AMOUNT_YOCTO") {
            config.funding_amount_yocto = parse_env("WARDEN_FUNDING_AMOUNT_YOCTO", &value)?;
        }
        if let Some(value) = optional_env("WARDEN_SIGN_DEPOSIT_YOCTO") {
            config.signing.deposit_yocto = parse_env("WARDEN_SIGN_DEPOSIT_YOCTO", &value)?;
        }
        if let Some(value) = optional_env("WARDEN_SIGN_GAS") {
            config.signing.gas = parse_env("WARDEN_SIGN_GAS", &value)?;
        }
        if let Some(value) = optional_env("WARDEN_SIGN_TIMEOUT_SECS") {
            config.signing.timeout_secs = parse_env("WARDEN_SIGN_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = optional_env("WARDEN_ETH_RPC_URL") {
            config.ethereum.rpc_url = value;
        }
        if let Some(value) = optional_env("WARDEN_ETH_GAS_ORACLE_URL") {
            config.ethereum.gas_oracle_url = value;
        }
        if let Some(value) = optional_env("WARDEN_ETH_CHAIN_ID") {
            config.ethereum.chain_id = parse_env("WARDEN_ETH_CHAIN_ID", &value)?;
        }
        if let Some(value) = optional_env("WARDEN_ETH_EXPLORER_URL") {
            config.ethereum.explorer_url = value;
        }

        if let Some(value) = optional_env("WARDEN_BTC_API_URL") {
            config.bitcoin.api_url = value;
        }
        if let Some(value) = optional_env("WARDEN_BTC_EXPLORER_URL") {
            config.bitcoin.explorer_url = value;
        }
        if let Some(value) = optional_env("WARDEN_BTC_NETWORK") {
            config.bitcoin.network = parse_btc_network(&value)?;
        }

        Ok(config)
    }

    /// Derivation engine bound to this deployment's root key and signer
    pub fn derivation_engine(&self) -> WardenResult<DerivationEngine> {
        DerivationEngine::from_encoded_key(&self.mpc_root_key, self.ledger_account_id.clone())
    }

    pub fn mpc_signer(&self) -> MpcSigner {
        MpcSigner::new(
            self.mpc_contract_id.clone(),
            self.signing.deposit_yocto,
            self.signing.gas,
            self.signing.timeout_secs,
        )
    }

    pub fn account_provisioner(&self) -> WardenResult<AccountProvisioner> {
        Ok(AccountProvisioner::new(
            self.derivation_engine()?,
            self.funding_amount_yocto,
        ))
    }

    pub fn ethereum_adapter(&self) -> WardenResult<EthereumAdapter> {
        Ok(EthereumAdapter::new(
            self.derivation_engine()?,
            self.mpc_signer(),
            self.ethereum.clone(),
        ))
    }

    pub fn bitcoin_adapter(&self) -> WardenResult<BitcoinAdapter> {
        Ok(BitcoinAdapter::new(
            self.derivation_engine()?,
            self.mpc_signer(),
            self.bitcoin.clone(),
        ))
    }
}

fn require_env(key: &str) -> WardenResult<String> {
    env::var(key).map_err(|_| {
        WardenError::invalid_input(format!("Missing required environment variable {}", key))
    })
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> WardenResult<T> {
    value
        .parse::<T>()
        .map_err(|_| WardenError::parse_error(format!("Invalid value for {}: {}", key, value)))
}

fn parse_btc_network(value: &str) -> WardenResult<Network> {
    match value.to_ascii_lowercase().as_str() {
        "bitcoin" | "mainnet" => Ok(Network::Bitcoin),
        "testnet" => Ok(Network::Testnet),
        "signet" => Ok(Network::Signet),
        "regtest" => Ok(Network::Regtest),
        other => Err(WardenError::invalid_input(format!(
            "Unknown bitcoin network: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testnet_defaults() {
        let config = WardenConfig::testnet("v1.signer.testnet", "secp256k1:abc", "agent.testnet");
        assert_eq!(config.ethereum.chain_id, 11155111);
        assert_eq!(config.ethereum.gas_limit, 21000);
        assert_eq!(config.bitcoin.network, Network::Testnet);
        assert_eq!(config.bitcoin.fee_target_blocks, 6);
        assert_eq!(config.signing.timeout_secs, 120);
    }

    #[test]
    fn test_parse_btc_network() {
        assert_eq!(parse_btc_network("mainnet").unwrap(), Network::Bitcoin);
        assert_eq!(parse_btc_network("Testnet").unwrap(), Network::Testnet);
        assert!(parse_btc_network("litecoin").is_err());
    }
}
