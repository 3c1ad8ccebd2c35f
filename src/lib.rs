//! Warden Core Library
//!
//! Deterministic key derivation and remote transaction signing for a
//! custodial multi-chain agent wallet. A user is identified by a stable
//! external identity string plus a user-chosen secret; every signature
//! is produced by a remote threshold (MPC) signer network reached
//! through a single custodial account on a coordination ledger. No
//! chain private key ever exists on this side.
//!
//! # Architecture
//!
//! - **kdf**: derivation paths, additive child-key derivation from the
//!   signer network's root key, chain address encoding
//! - **signer**: the remote signing round trip and signature recovery
//! - **chains**: Ethereum and Bitcoin transaction construction, fee
//!   estimation, and broadcast
//! - **ledger**: the coordination-ledger capability and implicit
//!   account provisioning
//! - **registry**: the account persistence interface (per-owner
//!   compare-and-swap)
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_core::{WardenConfig, kdf};
//!
//! let config = WardenConfig::from_env()?;
//! let engine = config.derivation_engine()?;
//!
//! let path = kdf::derive_path("0xd8da...", "user secret");
//! let child = engine.derive_child_public_key(&path)?;
//! let address = kdf::ethereum_address(&child);
//! ```
//!
//! Spend flows re-derive the address from the supplied secret on every
//! request; a caller that cannot produce the right path cannot spend.
//! Nothing here caches derived keys or addresses.

pub mod chains;
pub mod config;
pub mod error;
pub mod kdf;
pub mod ledger;
pub mod registry;
pub mod signer;
pub mod types;
pub mod utils;

// Re-export key types for convenience
pub use chains::{BitcoinAdapter, BtcSendRequest, EthereumAdapter, EvmSendRequest, InputPolicy};
pub use config::{BtcNetworkConfig, EvmNetworkConfig, SigningConfig, WardenConfig};
pub use error::{ErrorCode, WardenError, WardenResult};
pub use kdf::{
    derive_address, derive_path, generate_account, ChildPublicKey, DerivationEngine,
    DerivedAddress, GeneratedAccount,
};
pub use ledger::{AccountProvisioner, FunctionCallOutcome, LedgerAccountHandle, LedgerClient};
pub use registry::{AccountRegistry, MemoryRegistry, UserAccount};
pub use signer::{MpcSignature, MpcSigner};
pub use types::{Chain, SendOutcome};
