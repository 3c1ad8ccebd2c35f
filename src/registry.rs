//! Account Registry Interface
//!
//! The registry persists which user owns which named account. The
//! storage itself is an external collaborator; this module defines the
//! capability the core expects plus an in-memory implementation used by
//! tests and local runs.
//!
//! Writes are a per-owner compare-and-swap on a version token. A plain
//! read-modify-write over the whole map loses updates when two requests
//! rename or create accounts for the same owner concurrently; the
//! version token turns that race into a retryable `Conflict`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;

use crate::error::{WardenError, WardenResult};
use crate::types::Chain;

/// One named account owned by a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub name: String,
    pub chain: Chain,
    pub address: String,
    /// Child public key hex, kept for chains whose spend path needs it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

/// An owner's account list together with its version token
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnedAccounts {
    pub accounts: Vec<UserAccount>,
    pub version: u64,
}

impl OwnedAccounts {
    /// Look up an account by name, case-insensitively
    pub fn find(&self, name: &str) -> Option<&UserAccount> {
        self.accounts
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Whether `name` is free; (owner, name) pairs are unique ignoring case
    pub fn name_available(&self, name: &str) -> bool {
        self.find(name).is_none()
    }
}

/// Get/put-by-owner persistence capability
pub trait AccountRegistry {
    /// Read an owner's accounts and the current version token
    fn get(&self, owner_id: &str) -> impl Future<Output = WardenResult<OwnedAccounts>> + Send;

    /// Replace an owner's accounts if `expected_version` still matches.
    ///
    /// Returns the new version on success; a stale token fails with
    /// `Conflict` and the caller re-reads and reapplies its change.
    fn put(
        &self,
        owner_id: &str,
        accounts: Vec<UserAccount>,
        expected_version: u64,
    ) -> impl Future<Output = WardenResult<u64>> + Send;
}

/// In-memory registry for tests and local runs
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    owners: RwLock<HashMap<String, OwnedAccounts>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountRegistry for MemoryRegistry {
    async fn get(&self, owner_id: &str) -> WardenResult<OwnedAccounts> {
        let owners = self
            .owners
            .read()
            .map_err(|_| WardenError::internal("Registry lock poisoned"))?;
        Ok(owners.get(owner_id).cloned().unwrap_or_default())
    }

    async fn put(
        &self,
        owner_id: &str,
        accounts: Vec<UserAccount>,
        expected_version: u64,
    ) -> WardenResult<u64> {
        let mut owners = self
            .owners
            .write()
            .map_err(|_| WardenError::internal("Registry lock poisoned"))?;
        let entry = owners.entry(owner_id.to_string()).or_default();
        if entry.version != expected_version {
            return Err(WardenError::conflict(format!(
                "Registry version changed for {}: expected {}, found {}",
                owner_id, expected_version, entry.version
            )));
        }
        entry.accounts = accounts;
        entry.version += 1;
        Ok(entry.version)
    }
}
