//! Coordination Ledger Interface
//!
//! The ledger collaborator submits transactions on behalf of the
//! custodial account: MPC signing calls, funding transfers, and access
//! key registration. It is injected as an explicit capability with its
//! own lifecycle (opened at process start, closed at shutdown) rather
//! than reached through a module-level singleton. Sequence numbers and
//! balances of the shared accounts are arbitrated by the ledger itself.

mod provision;

pub use provision::*;

use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::error::WardenResult;

/// Result of a ledger function call
#[derive(Debug, Clone, Default)]
pub struct FunctionCallOutcome {
    /// Base64-encoded return value, when the call produced one
    pub success_value: Option<String>,
    /// Execution failure description, when the call was rejected or failed
    pub failure: Option<String>,
    /// Log lines emitted by the receipts
    pub logs: Vec<String>,
}

impl FunctionCallOutcome {
    pub fn succeeded(value: impl Into<String>) -> Self {
        Self {
            success_value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn failed(cause: impl Into<String>) -> Self {
        Self {
            failure: Some(cause.into()),
            ..Default::default()
        }
    }
}

/// View of one access key registered on an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessKeyView {
    /// Ledger wire form, e.g. `ed25519:<base58>`
    pub public_key: String,
    /// Whether the key grants full access to the account
    pub full_access: bool,
}

/// Transaction-submission capability for the coordination ledger
///
/// Implementations sign with the custodial account for `function_call`
/// and `send_money`; `add_key` registers a key on the named account.
/// The futures may take tens of seconds to resolve - the remote MPC
/// computation completes inside the `sign` function call.
pub trait LedgerClient {
    /// Call a method on a contract, attaching gas and a deposit
    fn function_call(
        &self,
        contract_id: &str,
        method: &str,
        args: serde_json::Value,
        gas: u64,
        deposit_yocto: u128,
    ) -> impl Future<Output = WardenResult<FunctionCallOutcome>> + Send;

    /// Transfer yoctoNEAR from the custodial account
    fn send_money(
        &self,
        receiver_id: &str,
        amount_yocto: u128,
    ) -> impl Future<Output = WardenResult<()>> + Send;

    /// Register a full-access key on the named account
    fn add_key(
        &self,
        account_id: &str,
        public_key: &str,
    ) -> impl Future<Output = WardenResult<()>> + Send;

    /// List the access keys currently registered on the named account
    fn get_access_keys(
        &self,
        account_id: &str,
    ) -> impl Future<Output = WardenResult<Vec<AccessKeyView>>> + Send;
}
