//! Remote MPC Signing Module
//!
//! Obtains ECDSA signatures from the threshold signer network through
//! its contract on the coordination ledger, and reconstructs usable
//! signatures (including the recovery parity) from the opaque response.

mod mpc;
mod recovery;

pub use mpc::*;
pub use recovery::*;

/// Normalized ECDSA signature returned by the signer network
///
/// `recovery_id` is carried as reported but is not trusted for address
/// binding; callers recover the parity themselves against the expected
/// signer (see [`recover_ethereum_signature`] and
/// [`verify_against_public_key`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MpcSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

impl MpcSignature {
    /// Compact `r || s` form used by recovery and DER encoding
    pub fn to_compact(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }
}
