use proptest::prelude::*;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use warden_core::kdf::{
    bitcoin_address, derive_path, ethereum_address, near_credentials, DerivationEngine,
};

fn test_engine() -> DerivationEngine {
    let secp = Secp256k1::new();
    let master_secret = SecretKey::from_slice(&[42u8; 32]).expect("valid scalar");
    DerivationEngine::new(
        PublicKey::from_secret_key(&secp, &master_secret),
        "warden-agent.testnet",
    )
}

proptest! {
    #[test]
    fn derivation_is_deterministic(
        identity in "[a-z0-9]{1,16}",
        secret in "[ -~]{1,24}",
    ) {
        let engine = test_engine();
        let path = derive_path(&identity, &secret);

        let a = engine.derive_child_public_key(&path).unwrap();
        let b = engine.derive_child_public_key(&path).unwrap();
        prop_assert_eq!(a.uncompressed(), b.uncompressed());
        prop_assert_eq!(ethereum_address(&a), ethereum_address(&b));
    }

    #[test]
    fn different_secrets_are_unlinkable(
        identity in "[a-z0-9]{1,16}",
        secret_a in "[a-z]{4,16}",
        secret_b in "[A-Z]{4,16}",
    ) {
        let engine = test_engine();
        let path_a = derive_path(&identity, &secret_a);
        let path_b = derive_path(&identity, &secret_b);
        prop_assert_ne!(&path_a, &path_b);

        let child_a = engine.derive_child_public_key(&path_a).unwrap();
        let child_b = engine.derive_child_public_key(&path_b).unwrap();
        prop_assert_ne!(
            ethereum_address(&child_a),
            ethereum_address(&child_b)
        );
    }

    #[test]
    fn ethereum_addresses_are_well_formed(path in "[ -~]{1,48}") {
        let child = test_engine().derive_child_public_key(&path).unwrap();
        let address = ethereum_address(&child);

        prop_assert_eq!(address.len(), 42);
        prop_assert!(address.starts_with("0x"));
        prop_assert!(address[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn bitcoin_addresses_decode_under_base58check(path in "[ -~]{1,48}") {
        let child = test_engine().derive_child_public_key(&path).unwrap();

        let address = bitcoin_address(&child, bitcoin::Network::Testnet).unwrap();
        let decoded = bs58::decode(&address).with_check(None).into_vec().unwrap();
        prop_assert_eq!(decoded.len(), 21);
        prop_assert_eq!(decoded[0], 0x6f);
    }

    #[test]
    fn ledger_accounts_are_valid_hex(path in "[ -~]{1,48}") {
        let child = test_engine().derive_child_public_key(&path).unwrap();
        let creds = near_credentials(&child).unwrap();

        prop_assert_eq!(creds.account_id.len(), 64);
        prop_assert!(creds.account_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn paths_never_leak_the_secret(
        identity in "[a-z0-9]{1,16}",
        secret in "[a-z]{8,24}",
    ) {
        let path = derive_path(&identity, &secret);
        prop_assert!(path.starts_with(&format!("{}-", identity)), "path must start with identity prefix");
        prop_assert!(!path[identity.len() + 1..].contains(&secret));
    }
}

#[test]
fn scenario_two_runs_agree_and_secrets_diverge() {
    // Same inputs across two independently built engines
    let first = {
        let engine = test_engine();
        let path = derive_path("0xabc1234567890", "pw1");
        ethereum_address(&engine.derive_child_public_key(&path).unwrap())
    };
    let second = {
        let engine = test_engine();
        let path = derive_path("0xabc1234567890", "pw1");
        ethereum_address(&engine.derive_child_public_key(&path).unwrap())
    };
    assert_eq!(first, second);
    assert_eq!(first.len(), 42);

    let other = {
        let engine = test_engine();
        let path = derive_path("0xabc1234567890", "pw2");
        ethereum_address(&engine.derive_child_public_key(&path).unwrap())
    };
    assert_ne!(first, other);
}
