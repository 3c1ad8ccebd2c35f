//! End-to-end signing and provisioning flows against an in-process
//! ledger double. The mock holds the master secret locally and answers
//! `sign` calls exactly like the signer network: it tweaks the master
//! key by the epsilon scalar for the requested path and returns the
//! base64-encoded `big_r`/`s`/`recovery_id` payload.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use secp256k1::{Message, PublicKey, Scalar, Secp256k1, SecretKey};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use warden_core::kdf::{derive_epsilon, derive_path, ethereum_address, DerivationEngine};
use warden_core::ledger::{AccessKeyView, FunctionCallOutcome, LedgerClient};
use warden_core::signer::{
    recover_ethereum_signature, verify_against_public_key, MpcSigner,
};
use warden_core::utils::crypto::keccak256;
use warden_core::{AccountProvisioner, ErrorCode, WardenError, WardenResult};

const SIGNER_ID: &str = "warden-agent.testnet";

struct MockLedger {
    master_secret: SecretKey,
    signer_id: String,
    access_keys: Mutex<HashMap<String, Vec<AccessKeyView>>>,
    transfers: Mutex<Vec<(String, u128)>>,
    fail_signing: bool,
    response_delay: Option<Duration>,
}

impl MockLedger {
    fn new() -> Self {
        Self {
            master_secret: SecretKey::from_slice(&[42u8; 32]).unwrap(),
            signer_id: SIGNER_ID.to_string(),
            access_keys: Mutex::new(HashMap::new()),
            transfers: Mutex::new(Vec::new()),
            fail_signing: false,
            response_delay: None,
        }
    }

    fn master_public_key(&self) -> PublicKey {
        PublicKey::from_secret_key(&Secp256k1::new(), &self.master_secret)
    }

    fn engine(&self) -> DerivationEngine {
        DerivationEngine::new(self.master_public_key(), self.signer_id.clone())
    }

    fn transfer_count(&self) -> usize {
        self.transfers.lock().unwrap().len()
    }

    /// Produce the signer network's response for one request
    fn answer_sign(&self, args: &serde_json::Value) -> FunctionCallOutcome {
        let request = &args["request"];
        let payload: Vec<u8> = request["payload"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_u64().unwrap() as u8)
            .collect();
        let path = request["path"].as_str().unwrap();
        assert_eq!(request["key_version"].as_u64(), Some(0));

        let epsilon = derive_epsilon(&self.signer_id, path);
        let child_secret = self
            .master_secret
            .add_tweak(&Scalar::from_be_bytes(epsilon).unwrap())
            .unwrap();

        let secp = Secp256k1::new();
        let message = Message::from_digest_slice(&payload).unwrap();
        let signature = secp.sign_ecdsa_recoverable(&message, &child_secret);
        let (recovery_id, compact) = signature.serialize_compact();

        let parity_prefix = 0x02 + (recovery_id.to_i32() as u8 & 1);
        let mut affine_point = vec![parity_prefix];
        affine_point.extend_from_slice(&compact[..32]);

        let response = serde_json::json!({
            "big_r": { "affine_point": hex::encode(affine_point) },
            "s": { "scalar": hex::encode(&compact[32..]) },
            "recovery_id": recovery_id.to_i32() as u8,
        });
        FunctionCallOutcome::succeeded(BASE64.encode(serde_json::to_vec(&response).unwrap()))
    }
}

impl LedgerClient for MockLedger {
    async fn function_call(
        &self,
        _contract_id: &str,
        method: &str,
        args: serde_json::Value,
        _gas: u64,
        _deposit_yocto: u128,
    ) -> WardenResult<FunctionCallOutcome> {
        if let Some(delay) = self.response_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_signing {
            return Ok(FunctionCallOutcome::failed("Exceeded the prepaid gas."));
        }
        match method {
            "sign" => Ok(self.answer_sign(&args)),
            other => Err(WardenError::internal(format!("Unexpected method {}", other))),
        }
    }

    async fn send_money(&self, receiver_id: &str, amount_yocto: u128) -> WardenResult<()> {
        self.transfers
            .lock()
            .unwrap()
            .push((receiver_id.to_string(), amount_yocto));
        Ok(())
    }

    async fn add_key(&self, account_id: &str, public_key: &str) -> WardenResult<()> {
        self.access_keys
            .lock()
            .unwrap()
            .entry(account_id.to_string())
            .or_default()
            .push(AccessKeyView {
                public_key: public_key.to_string(),
                full_access: true,
            });
        Ok(())
    }

    async fn get_access_keys(&self, account_id: &str) -> WardenResult<Vec<AccessKeyView>> {
        Ok(self
            .access_keys
            .lock()
            .unwrap()
            .get(account_id)
            .cloned()
            .unwrap_or_default())
    }
}

fn test_signer() -> MpcSigner {
    MpcSigner::new("mpc.testnet", 1, 300_000_000_000_000, 60)
}

#[tokio::test]
async fn remote_signature_binds_to_derived_address() {
    let ledger = MockLedger::new();
    let engine = ledger.engine();
    let signer = test_signer();

    let path = derive_path("0xd8da6bf26964af9d7eed9e03e53415d37aa96045", "pw1");
    let child = engine.derive_child_public_key(&path).unwrap();
    let address = ethereum_address(&child);

    let payload = keccak256(b"rlp of an unsigned transfer");
    let sig = signer.sign(payload, &path, &ledger).await.unwrap();

    let chain_id = 11155111u64;
    let v = recover_ethereum_signature(&payload, &sig, chain_id, &address).unwrap();
    assert!(v == chain_id * 2 + 35 || v == chain_id * 2 + 36);

    // The same signature cannot be claimed by a different user's address
    let other_path = derive_path("0xd8da6bf26964af9d7eed9e03e53415d37aa96045", "pw2");
    let other_child = engine.derive_child_public_key(&other_path).unwrap();
    let err = recover_ethereum_signature(
        &payload,
        &sig,
        chain_id,
        &ethereum_address(&other_child),
    )
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::SignatureRecovery);
}

#[tokio::test]
async fn corrupted_scalar_never_recovers() {
    let ledger = MockLedger::new();
    let engine = ledger.engine();
    let signer = test_signer();

    let path = derive_path("0xabc", "pw1");
    let child = engine.derive_child_public_key(&path).unwrap();

    let payload = keccak256(b"payload");
    let mut sig = signer.sign(payload, &path, &ledger).await.unwrap();
    assert!(verify_against_public_key(&payload, &sig, child.as_point()).is_ok());

    sig.s[19] ^= 0x40;
    let err = verify_against_public_key(&payload, &sig, child.as_point()).unwrap_err();
    assert_eq!(err.code, ErrorCode::SignatureRecovery);
}

#[tokio::test]
async fn ledger_failure_surfaces_as_signing_failed() {
    let mut ledger = MockLedger::new();
    ledger.fail_signing = true;
    let signer = test_signer();

    let err = signer
        .sign([7u8; 32], "anyone-any", &ledger)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::SigningFailed);
    assert!(err.details.unwrap().contains("prepaid gas"));
}

#[tokio::test(start_paused = true)]
async fn slow_signer_times_out() {
    let mut ledger = MockLedger::new();
    ledger.response_delay = Some(Duration::from_secs(600));
    let signer = MpcSigner::new("mpc.testnet", 1, 300_000_000_000_000, 30);

    let err = signer
        .sign([7u8; 32], "anyone-any", &ledger)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::SigningTimeout);
}

#[tokio::test]
async fn provisioning_is_idempotent() {
    let ledger = MockLedger::new();
    let provisioner = AccountProvisioner::new(ledger.engine(), 1_000);

    let first = provisioner.provision("0xuser1", &ledger).await.unwrap();
    assert!(first.newly_provisioned);
    assert_eq!(first.account_id.len(), 64);
    assert!(first.public_key.starts_with("ed25519:"));
    assert_eq!(ledger.transfer_count(), 1);

    let keys = ledger.get_access_keys(&first.account_id).await.unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].public_key, first.public_key);

    // Second call sees the on-chain key and neither funds nor re-registers
    let second = provisioner.provision("0xuser1", &ledger).await.unwrap();
    assert!(!second.newly_provisioned);
    assert_eq!(second.account_id, first.account_id);
    assert_eq!(ledger.transfer_count(), 1);

    // A different identity provisions a different account
    let other = provisioner.provision("0xuser2", &ledger).await.unwrap();
    assert!(other.newly_provisioned);
    assert_ne!(other.account_id, first.account_id);
    assert_eq!(ledger.transfer_count(), 2);
}
