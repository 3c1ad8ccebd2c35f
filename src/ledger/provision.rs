//! Implicit Account Provisioning
//!
//! Each user identity maps to one implicit account on the coordination
//! ledger, derived from the root key with the custodial service account
//! as signer id. First use funds the account and registers its derived
//! access key; later calls return a handle without touching the chain
//! state again.

use zeroize::Zeroizing;

use crate::error::WardenResult;
use crate::kdf::{near_credentials, DerivationEngine};
use crate::ledger::LedgerClient;
use crate::{log_debug, log_info};

/// Handle for a provisioned coordination-ledger account
///
/// Carries the derived keypair so the embedding application can sign
/// and send as the account. The secret is zeroized on drop.
pub struct LedgerAccountHandle {
    pub account_id: String,
    pub public_key: String,
    pub secret_key: Zeroizing<String>,
    /// True when this call funded and registered the account
    pub newly_provisioned: bool,
}

/// Derives and provisions per-user ledger accounts
#[derive(Debug, Clone)]
pub struct AccountProvisioner {
    engine: DerivationEngine,
    funding_amount_yocto: u128,
}

impl AccountProvisioner {
    pub fn new(engine: DerivationEngine, funding_amount_yocto: u128) -> Self {
        Self {
            engine,
            funding_amount_yocto,
        }
    }

    /// Provision the implicit account for `user_identity`.
    ///
    /// The derivation runs on every call - the on-chain access key
    /// listing, not any local cache, decides whether the account is new.
    /// Safe to call repeatedly; funding and key registration happen at
    /// most once per account.
    pub async fn provision<L: LedgerClient>(
        &self,
        user_identity: &str,
        ledger: &L,
    ) -> WardenResult<LedgerAccountHandle> {
        let child = self.engine.derive_child_public_key(user_identity)?;
        let creds = near_credentials(&child)?;

        let keys = ledger.get_access_keys(&creds.account_id).await?;
        if !keys.is_empty() {
            log_debug!(
                "provision",
                "Account already provisioned",
                account = creds.account_id,
            );
            return Ok(LedgerAccountHandle {
                account_id: creds.account_id,
                public_key: creds.public_key,
                secret_key: creds.secret_key,
                newly_provisioned: false,
            });
        }

        log_info!(
            "provision",
            "Funding and registering new implicit account",
            account = creds.account_id,
            amount_yocto = self.funding_amount_yocto,
        );
        ledger
            .send_money(&creds.account_id, self.funding_amount_yocto)
            .await?;
        ledger.add_key(&creds.account_id, &creds.public_key).await?;

        Ok(LedgerAccountHandle {
            account_id: creds.account_id,
            public_key: creds.public_key,
            secret_key: creds.secret_key,
            newly_provisioned: true,
        })
    }
}
