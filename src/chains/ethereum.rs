//! Ethereum Transaction Adapter
//!
//! Builds legacy EIP-155 value transfers, obtains the signature from
//! the remote signer, and broadcasts through plain JSON-RPC. Balance
//! and nonce come from the configured RPC endpoint; the gas price comes
//! from a gasnow-style oracle, taking the highest reported tier.

use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Address, Signature, TransactionRequest, U256};
use ethers_core::utils::format_units;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::str::FromStr;

use crate::config::EvmNetworkConfig;
use crate::error::{WardenError, WardenResult};
use crate::kdf::{ethereum_address, DerivationEngine};
use crate::ledger::LedgerClient;
use crate::signer::{recover_ethereum_signature, MpcSigner};
use crate::types::SendOutcome;
use crate::utils::http;
use crate::{log_info, log_warn};

/// A validated request to spend from a derived EVM account
#[derive(Debug, Clone)]
pub struct EvmSendRequest {
    /// Claimed sending address; must re-derive from `path`
    pub from: String,
    pub to: String,
    pub amount_wei: U256,
    /// Derivation path selecting the child key
    pub path: String,
}

impl EvmSendRequest {
    fn validate(&self) -> WardenResult<Address> {
        Address::from_str(&self.from).map_err(|e| {
            WardenError::new(
                crate::error::ErrorCode::InvalidAddress,
                format!("Invalid sender address: {}", e),
            )
        })?;
        let to = Address::from_str(&self.to).map_err(|e| {
            WardenError::new(
                crate::error::ErrorCode::InvalidAddress,
                format!("Invalid destination address: {}", e),
            )
        })?;
        if self.path.is_empty() {
            return Err(WardenError::invalid_input("Derivation path is empty"));
        }
        Ok(to)
    }
}

/// Gasnow-style oracle response
#[derive(Debug, Deserialize)]
struct GasOracleResponse {
    data: GasTiers,
}

#[derive(Debug, Default, Deserialize)]
struct GasTiers {
    rapid: Option<u64>,
    fast: Option<u64>,
    standard: Option<u64>,
}

impl GasTiers {
    /// Highest reported tier, if any tier is present and non-zero
    fn max(&self) -> Option<u64> {
        [self.rapid, self.fast, self.standard]
            .into_iter()
            .flatten()
            .filter(|price| *price > 0)
            .max()
    }
}

/// Ethereum adapter bound to one network and one signing deployment
pub struct EthereumAdapter {
    engine: DerivationEngine,
    signer: MpcSigner,
    config: EvmNetworkConfig,
}

impl EthereumAdapter {
    pub fn new(engine: DerivationEngine, signer: MpcSigner, config: EvmNetworkConfig) -> Self {
        Self {
            engine,
            signer,
            config,
        }
    }

    /// Balance in wei. Provider failures are logged and reported as
    /// zero; the spend path then fails its funds check instead of the
    /// whole request erroring out on a flaky provider.
    pub async fn get_balance(&self, address: &str) -> U256 {
        match self.fetch_balance(address).await {
            Ok(balance) => balance,
            Err(e) => {
                log_warn!(
                    "ethereum",
                    "Balance query failed, treating as zero",
                    address = address,
                    error = e,
                );
                U256::zero()
            }
        }
    }

    /// Current gas price in wei: the highest of the oracle's tiers.
    ///
    /// An oracle response with no usable tier is an operational problem
    /// and surfaces as an error rather than a silent zero price.
    pub async fn get_gas_price(&self) -> WardenResult<u64> {
        let response: GasOracleResponse = http::get_json(&self.config.gas_oracle_url).await?;
        match response.data.max() {
            Some(price) => Ok(price),
            None => {
                log_warn!("ethereum", "Gas oracle returned no usable price tier");
                Err(WardenError::network_error(
                    "Unable to get gas price from oracle",
                ))
            }
        }
    }

    /// Sign and broadcast a value transfer from a derived account.
    ///
    /// The claimed sender is re-derived from the request path before
    /// anything touches the network; a mismatch is an authentication
    /// failure, not a signing problem.
    pub async fn send<L: LedgerClient>(
        &self,
        request: &EvmSendRequest,
        ledger: &L,
    ) -> WardenResult<SendOutcome> {
        let to = request.validate()?;

        let child = self.engine.derive_child_public_key(&request.path)?;
        let derived = ethereum_address(&child);
        if !derived.eq_ignore_ascii_case(&request.from) {
            return Err(WardenError::invalid_input(
                "Derivation path does not control the sending address",
            ));
        }

        if request.amount_wei.is_zero() {
            return Err(WardenError::invalid_amount(
                "Amount is zero. Please try a non-zero amount.",
            ));
        }

        let balance = self.get_balance(&request.from).await;
        log_info!(
            "ethereum",
            "Preparing transfer",
            from = request.from,
            to = request.to,
            balance_eth = format_units(balance, "ether").unwrap_or_default(),
        );

        let nonce = self.fetch_nonce(&request.from).await?;
        let gas_price = self.get_gas_price().await?;
        check_spendable(
            balance,
            request.amount_wei,
            gas_price,
            self.config.gas_limit,
        )?;

        let tx = TransactionRequest::new()
            .to(to)
            .nonce(nonce)
            .value(request.amount_wei)
            .gas(self.config.gas_limit)
            .gas_price(gas_price)
            .chain_id(self.config.chain_id);
        let typed: TypedTransaction = tx.into();

        let payload: [u8; 32] = typed.sighash().to_fixed_bytes();
        let sig = self.signer.sign(payload, &request.path, ledger).await?;

        // Bind the signature to the sender before broadcasting; the
        // reported recovery id is not trusted for this
        let v = recover_ethereum_signature(&payload, &sig, self.config.chain_id, &request.from)?;
        let signature = Signature {
            r: U256::from_big_endian(&sig.r),
            s: U256::from_big_endian(&sig.s),
            v,
        };

        let raw = typed.rlp_signed(&signature);
        self.broadcast(format!("0x{}", hex::encode(raw.as_ref()))).await
    }

    async fn fetch_balance(&self, address: &str) -> WardenResult<U256> {
        let hex_balance: String = self
            .rpc("eth_getBalance", serde_json::json!([address, "latest"]))
            .await?;
        parse_hex_quantity(&hex_balance)
    }

    async fn fetch_nonce(&self, address: &str) -> WardenResult<u64> {
        let hex_nonce: String = self
            .rpc(
                "eth_getTransactionCount",
                serde_json::json!([address, "latest"]),
            )
            .await?;
        Ok(parse_hex_quantity(&hex_nonce)?.as_u64())
    }

    async fn broadcast(&self, raw_tx_hex: String) -> WardenResult<SendOutcome> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_sendRawTransaction",
            "params": [raw_tx_hex],
        });
        let response: serde_json::Value = http::post_json(&self.config.rpc_url, &payload)
            .await
            .map_err(|e| {
                WardenError::broadcast_failed("Broadcast request failed")
                    .with_details(e.to_string())
            })?;

        if let Some(error) = response.get("error") {
            return Err(map_broadcast_error(&error.to_string()));
        }

        let tx_hash = response
            .get("result")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                WardenError::broadcast_failed("Broadcast response carried no transaction hash")
            })?;

        let outcome = SendOutcome::new(tx_hash, &self.config.explorer_url);
        log_info!(
            "ethereum",
            "Transaction broadcast",
            tx_hash = outcome.tx_hash,
            explorer = outcome.explorer_url.as_deref().unwrap_or(""),
        );
        Ok(outcome)
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> WardenResult<T> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response: serde_json::Value = http::post_json(&self.config.rpc_url, &payload).await?;

        if let Some(error) = response.get("error") {
            return Err(WardenError::network_error(format!(
                "RPC {} failed: {}",
                method, error
            )));
        }

        let result = response
            .get("result")
            .ok_or_else(|| WardenError::parse_error(format!("RPC {} returned no result", method)))?;
        serde_json::from_value(result.clone())
            .map_err(|e| WardenError::parse_error(format!("RPC {} result: {}", method, e)))
    }
}

/// Reject a transfer the account cannot cover: the balance must pay the
/// amount plus the full gas allowance. Equality passes.
pub fn check_spendable(
    balance: U256,
    amount_wei: U256,
    gas_price: u64,
    gas_limit: u64,
) -> WardenResult<()> {
    let required = amount_wei + U256::from(gas_price) * U256::from(gas_limit);
    if balance < required {
        return Err(WardenError::insufficient_funds(format!(
            "Balance {} wei is below amount plus gas {} wei",
            balance, required
        )));
    }
    Ok(())
}

fn parse_hex_quantity(value: &str) -> WardenResult<U256> {
    U256::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|e| WardenError::parse_error(format!("Invalid hex quantity {}: {}", value, e)))
}

/// Classify a broadcast rejection by its provider error text
fn map_broadcast_error(message: &str) -> WardenError {
    let lower = message.to_lowercase();
    if lower.contains("nonce too low") {
        WardenError::already_submitted("tx has been tried").with_details(message.to_string())
    } else if lower.contains("underpriced") || lower.contains("gas too low") {
        WardenError::underpriced("Transaction underpriced").with_details(message.to_string())
    } else {
        WardenError::broadcast_failed("Broadcast rejected").with_details(message.to_string())
    }
}
