//! Bitcoin Transaction Adapter
//!
//! Builds raw P2PKH spends from derived addresses against an
//! esplora-style API, signs each input through the remote signer, and
//! broadcasts the finalized transaction.
//!
//! Input selection is restricted to the single largest UTXO by default:
//! the signer network authorizes one signature per coordination-ledger
//! call, so one input keeps a spend to a single signing round trip.
//! The restriction lives in [`InputPolicy`], not in derivation or
//! signing, so a batch-capable signer can lift it in one place.

use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode;
use bitcoin::hashes::Hash as _;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use futures::future::try_join_all;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

use crate::config::BtcNetworkConfig;
use crate::error::{ErrorCode, WardenError, WardenResult};
use crate::kdf::{bitcoin_address, DerivationEngine};
use crate::ledger::LedgerClient;
use crate::signer::{verify_against_public_key, MpcSigner};
use crate::types::SendOutcome;
use crate::utils::http;
use crate::{log_info, log_warn};

/// Estimated vbytes per legacy input in the fee model
const INPUT_VBYTES: usize = 148;
/// Estimated vbytes per output in the fee model
const OUTPUT_VBYTES: usize = 34;
/// Fixed transaction overhead vbytes in the fee model
const OVERHEAD_VBYTES: usize = 10;

/// How many unspent outputs a single spend may consume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputPolicy {
    /// One input per transaction: the current signer authorizes a
    /// single signature per coordination-ledger call
    #[default]
    SingleLargest,
    /// Spend every available output; requires a signer that accepts
    /// one signing call per input without separate deposits piling up
    AllAvailable,
}

/// An unspent output as reported by the esplora API
#[derive(Debug, Clone, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub value: u64,
}

/// The funding output an input spends, with its witness classification
#[derive(Debug, Clone)]
struct Prevout {
    script_pubkey: ScriptBuf,
    value: u64,
}

impl Prevout {
    fn is_segwit(&self) -> bool {
        self.script_pubkey.witness_version().is_some()
    }
}

#[derive(Debug, Deserialize)]
struct EsploraTransaction {
    vout: Vec<EsploraVout>,
}

#[derive(Debug, Deserialize)]
struct EsploraVout {
    scriptpubkey: String,
    value: u64,
}

/// A validated request to spend from a derived Bitcoin address
#[derive(Debug, Clone)]
pub struct BtcSendRequest {
    /// Claimed sending address; must re-derive from `path`
    pub from: String,
    pub to: String,
    pub amount_sat: u64,
    /// Derivation path selecting the child key
    pub path: String,
    /// Uncompressed child public key hex; placed in the input scripts
    pub public_key: String,
}

/// Bitcoin adapter bound to one network and one signing deployment
pub struct BitcoinAdapter {
    engine: DerivationEngine,
    signer: MpcSigner,
    config: BtcNetworkConfig,
    input_policy: InputPolicy,
}

impl BitcoinAdapter {
    pub fn new(engine: DerivationEngine, signer: MpcSigner, config: BtcNetworkConfig) -> Self {
        Self {
            engine,
            signer,
            config,
            input_policy: InputPolicy::default(),
        }
    }

    pub fn with_input_policy(mut self, policy: InputPolicy) -> Self {
        self.input_policy = policy;
        self
    }

    /// Unspent outputs for an address
    pub async fn get_utxos(&self, address: &str) -> WardenResult<Vec<Utxo>> {
        let url = format!("{}/address/{}/utxo", self.config.api_url, address);
        let utxos: Vec<Utxo> = http::get_json(&url).await?;
        if utxos.is_empty() {
            log_info!(
                "bitcoin",
                "No unspent outputs; address must be funded first",
                address = address,
            );
        }
        Ok(utxos)
    }

    /// Spendable balance in satoshis under the configured input policy
    pub async fn get_balance(&self, address: &str) -> WardenResult<u64> {
        let utxos = self.get_utxos(address).await?;
        Ok(select_inputs(&utxos, self.input_policy)
            .iter()
            .map(|u| u.value)
            .sum())
    }

    /// Sign and broadcast a transfer from a derived address.
    ///
    /// Inputs are selected per the adapter's policy, classified as
    /// witness or legacy from their funding transactions, signed through
    /// the remote signer (concurrently when there is more than one), and
    /// finalized only once every signature has arrived and been verified
    /// against the derived child key.
    pub async fn send<L: LedgerClient>(
        &self,
        request: &BtcSendRequest,
        ledger: &L,
    ) -> WardenResult<SendOutcome> {
        if request.amount_sat == 0 {
            return Err(WardenError::invalid_amount(
                "Amount is zero. Please try a non-zero amount.",
            ));
        }
        if request.path.is_empty() {
            return Err(WardenError::invalid_input("Derivation path is empty"));
        }

        let child = self.engine.derive_child_public_key(&request.path)?;
        let derived = bitcoin_address(&child, self.config.network)?;
        if derived != request.from {
            return Err(WardenError::invalid_input(
                "Derivation path does not control the sending address",
            ));
        }
        if !request.public_key.eq_ignore_ascii_case(&child.to_hex()) {
            return Err(WardenError::invalid_input(
                "Supplied public key does not match the derivation path",
            ));
        }

        let to_script = parse_address(&request.to, self.config.network)?.script_pubkey();
        let from_script = parse_address(&request.from, self.config.network)?.script_pubkey();

        let utxos = self.get_utxos(&request.from).await?;
        let inputs = select_inputs(&utxos, self.input_policy);
        let input_total: u64 = inputs.iter().map(|u| u.value).sum();
        if input_total < request.amount_sat {
            return Err(WardenError::insufficient_funds(format!(
                "Selected inputs hold {} sats, need {} sats",
                input_total, request.amount_sat
            )));
        }

        log_info!(
            "bitcoin",
            "Preparing transfer",
            from = request.from,
            to = request.to,
            amount_sat = request.amount_sat,
            inputs = inputs.len(),
        );

        // Classify each spent output from its funding transaction
        let prevouts = try_join_all(
            inputs
                .iter()
                .map(|utxo| self.fetch_prevout(&utxo.txid, utxo.vout)),
        )
        .await?;

        let fee_rate = self.fetch_fee_rate().await?;
        let fee = estimate_fee(inputs.len(), fee_rate, self.config.fee_safety_margin);
        let spend_total = request
            .amount_sat
            .checked_add(fee)
            .ok_or_else(|| WardenError::invalid_amount("Amount overflow"))?;
        if input_total < spend_total {
            return Err(WardenError::insufficient_funds(format!(
                "Selected inputs hold {} sats, need {} sats including {} sats fee",
                input_total, spend_total, fee
            )));
        }
        let change = input_total - spend_total;

        let mut tx = build_unsigned_transaction(
            &inputs,
            &to_script,
            request.amount_sat,
            &from_script,
            change,
        )?;
        log_info!("bitcoin", "Fee computed", fee_sat = fee, change_sat = change);

        let sighash_type = EcdsaSighashType::All;
        let digests = compute_sighashes(&tx, &prevouts, sighash_type)?;

        // One remote round trip per input; the whole set completes
        // before any finalization
        let signatures = try_join_all(digests.iter().map(|digest| {
            let path = request.path.as_str();
            async move {
                let sig = self.signer.sign(*digest, path, ledger).await?;
                verify_against_public_key(digest, &sig, child.as_point())?;
                secp256k1::ecdsa::Signature::from_compact(&sig.to_compact()).map_err(|e| {
                    WardenError::signature_recovery(format!("Signature not canonical: {}", e))
                })
            }
        }))
        .await?;

        let pubkey_bytes = child.uncompressed();
        for (index, signature) in signatures.iter().enumerate() {
            let mut encoded = signature.serialize_der().to_vec();
            encoded.push(sighash_type.to_u32() as u8);

            if prevouts[index].is_segwit() {
                let mut witness = Witness::new();
                witness.push(&encoded);
                witness.push(&pubkey_bytes);
                tx.input[index].witness = witness;
            } else {
                tx.input[index].script_sig = Builder::new()
                    .push_slice(push_bytes(encoded)?)
                    .push_slice(push_bytes(pubkey_bytes.to_vec())?)
                    .into_script();
            }
        }

        let raw_hex = hex::encode(encode::serialize(&tx));
        self.broadcast(raw_hex).await
    }

    async fn fetch_prevout(&self, txid: &str, vout: u32) -> WardenResult<Prevout> {
        let url = format!("{}/tx/{}", self.config.api_url, txid);
        let tx: EsploraTransaction = http::get_json(&url).await?;
        let output = tx.vout.get(vout as usize).ok_or_else(|| {
            WardenError::parse_error(format!("Funding transaction {} has no output {}", txid, vout))
        })?;
        let script_pubkey = ScriptBuf::from_hex(&output.scriptpubkey).map_err(|e| {
            WardenError::parse_error(format!("Invalid script on {}:{}: {}", txid, vout, e))
        })?;
        Ok(Prevout {
            script_pubkey,
            value: output.value,
        })
    }

    /// Fee rate in sat/vB for the configured confirmation target
    async fn fetch_fee_rate(&self) -> WardenResult<f64> {
        let url = format!("{}/fee-estimates", self.config.api_url);
        let estimates: HashMap<String, f64> = http::get_json(&url).await?;
        estimates
            .get(&self.config.fee_target_blocks.to_string())
            .copied()
            .ok_or_else(|| {
                log_warn!(
                    "bitcoin",
                    "Fee estimate missing for confirmation target",
                    target = self.config.fee_target_blocks,
                );
                WardenError::network_error("Unable to get fee rate from esplora")
            })
    }

    async fn broadcast(&self, raw_hex: String) -> WardenResult<SendOutcome> {
        let url = format!("{}/tx", self.config.api_url);
        let (status, body) = http::post_text(&url, raw_hex).await.map_err(|e| {
            WardenError::broadcast_failed("Broadcast request failed").with_details(e.to_string())
        })?;

        if status != 200 {
            return Err(WardenError::broadcast_failed(format!(
                "Broadcast rejected with status {}",
                status
            ))
            .with_details(body));
        }

        let outcome = SendOutcome::new(body.trim(), &self.config.explorer_url);
        log_info!(
            "bitcoin",
            "Transaction broadcast; inclusion in the mempool may take a minute",
            tx_hash = outcome.tx_hash,
            explorer = outcome.explorer_url.as_deref().unwrap_or(""),
        );
        Ok(outcome)
    }
}

/// Select the inputs a spend may consume under `policy`.
///
/// `SingleLargest` picks exactly one output even when several tie on
/// the maximum value.
pub fn select_inputs(utxos: &[Utxo], policy: InputPolicy) -> Vec<Utxo> {
    match policy {
        InputPolicy::SingleLargest => utxos
            .iter()
            .max_by_key(|u| u.value)
            .cloned()
            .into_iter()
            .collect(),
        InputPolicy::AllAvailable => utxos.to_vec(),
    }
}

/// Fee for the 148/34/10 vbyte size model at `fee_rate` plus a flat
/// safety margin, both in sat/vB
pub fn estimate_fee(input_count: usize, fee_rate: f64, safety_margin: f64) -> u64 {
    let estimated_vbytes = input_count * INPUT_VBYTES + 2 * OUTPUT_VBYTES + OVERHEAD_VBYTES;
    (estimated_vbytes as f64 * (fee_rate + safety_margin)).ceil() as u64
}

fn build_unsigned_transaction(
    inputs: &[Utxo],
    to_script: &ScriptBuf,
    amount_sat: u64,
    change_script: &ScriptBuf,
    change_sat: u64,
) -> WardenResult<Transaction> {
    let tx_inputs = inputs
        .iter()
        .map(|utxo| {
            let txid = Txid::from_str(&utxo.txid).map_err(|e| {
                WardenError::parse_error(format!("Invalid txid {}: {}", utxo.txid, e))
            })?;
            Ok(TxIn {
                previous_output: OutPoint::new(txid, utxo.vout),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            })
        })
        .collect::<WardenResult<Vec<_>>>()?;

    let mut outputs = vec![TxOut {
        value: Amount::from_sat(amount_sat),
        script_pubkey: to_script.clone(),
    }];
    if change_sat > 0 {
        outputs.push(TxOut {
            value: Amount::from_sat(change_sat),
            script_pubkey: change_script.clone(),
        });
    }

    Ok(Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: tx_inputs,
        output: outputs,
    })
}

fn compute_sighashes(
    tx: &Transaction,
    prevouts: &[Prevout],
    sighash_type: EcdsaSighashType,
) -> WardenResult<Vec<[u8; 32]>> {
    let mut cache = SighashCache::new(tx);
    prevouts
        .iter()
        .enumerate()
        .map(|(index, prevout)| {
            if prevout.is_segwit() {
                cache
                    .p2wpkh_signature_hash(
                        index,
                        &prevout.script_pubkey,
                        Amount::from_sat(prevout.value),
                        sighash_type,
                    )
                    .map(|hash| hash.to_byte_array())
                    .map_err(|e| {
                        WardenError::crypto_error(format!(
                            "Segwit sighash for input {}: {}",
                            index, e
                        ))
                    })
            } else {
                cache
                    .legacy_signature_hash(index, &prevout.script_pubkey, sighash_type.to_u32())
                    .map(|hash| hash.to_byte_array())
                    .map_err(|e| {
                        WardenError::crypto_error(format!(
                            "Legacy sighash for input {}: {}",
                            index, e
                        ))
                    })
            }
        })
        .collect()
}

fn parse_address(address: &str, network: bitcoin::Network) -> WardenResult<Address> {
    Address::from_str(address)
        .map_err(WardenError::from)?
        .require_network(network)
        .map_err(|e| {
            WardenError::new(
                ErrorCode::InvalidAddress,
                format!("Address {} is not valid for this network: {}", address, e),
            )
        })
}

fn push_bytes(bytes: Vec<u8>) -> WardenResult<PushBytesBuf> {
    PushBytesBuf::try_from(bytes)
        .map_err(|_| WardenError::internal("Script push exceeds size limit"))
}
