//! Unified error types for Warden Core
//!
//! All errors flow through this module so callers always receive a
//! typed outcome. Nothing in this crate retries a failed signing or
//! broadcast attempt: a signing round trip costs a real deposit, and a
//! failed broadcast may still have applied state on-chain.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all Warden operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl WardenError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Whether the caller may treat the operation as already applied
    /// (`AlreadySubmitted`) or retry it with adjusted parameters
    /// (`Underpriced`)
    pub fn is_recoverable(&self) -> bool {
        matches!(self.code, ErrorCode::AlreadySubmitted | ErrorCode::Underpriced)
    }

    // Convenience constructors

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAmount, msg)
    }

    pub fn unsupported_chain(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedChain, msg)
    }

    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InsufficientFunds, msg)
    }

    pub fn signing_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SigningFailed, msg)
    }

    pub fn signature_recovery(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SignatureRecovery, msg)
    }

    pub fn signing_timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SigningTimeout, msg)
    }

    pub fn already_submitted(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadySubmitted, msg)
    }

    pub fn underpriced(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Underpriced, msg)
    }

    pub fn broadcast_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::BroadcastFailed, msg)
    }

    pub fn network_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, msg)
    }

    pub fn crypto_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::CryptoError, msg)
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for WardenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for WardenError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors, surfaced before any network call
    InvalidInput,
    InvalidAddress,
    InvalidAmount,
    UnsupportedChain,

    // Signing round-trip errors
    SigningFailed,
    SignatureRecovery,
    SigningTimeout,

    // Transaction errors
    InsufficientFunds,
    AlreadySubmitted,
    Underpriced,
    BroadcastFailed,

    // Network errors
    NetworkError,
    Timeout,

    // Registry errors
    Conflict,

    // Crypto errors
    CryptoError,

    // Parse errors
    ParseError,
    JsonError,
    HexError,

    // Internal
    Internal,
}

/// Result type alias for Warden operations
pub type WardenResult<T> = Result<T, WardenError>;

// Conversions from common error types

impl From<serde_json::Error> for WardenError {
    fn from(e: serde_json::Error) -> Self {
        WardenError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for WardenError {
    fn from(e: hex::FromHexError) -> Self {
        WardenError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<reqwest::Error> for WardenError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            WardenError::new(ErrorCode::Timeout, "Request timed out")
        } else if e.is_connect() {
            WardenError::new(ErrorCode::NetworkError, "Connection failed")
        } else {
            WardenError::new(ErrorCode::NetworkError, e.to_string())
        }
    }
}

impl From<secp256k1::Error> for WardenError {
    fn from(e: secp256k1::Error) -> Self {
        WardenError::new(ErrorCode::CryptoError, format!("Secp256k1 error: {}", e))
    }
}

impl From<bitcoin::address::ParseError> for WardenError {
    fn from(e: bitcoin::address::ParseError) -> Self {
        WardenError::new(ErrorCode::InvalidAddress, format!("Bitcoin address error: {}", e))
    }
}

impl From<bip39::Error> for WardenError {
    fn from(e: bip39::Error) -> Self {
        WardenError::new(ErrorCode::CryptoError, format!("BIP39 error: {}", e))
    }
}

impl From<base64::DecodeError> for WardenError {
    fn from(e: base64::DecodeError) -> Self {
        WardenError::new(ErrorCode::ParseError, format!("Base64 error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = WardenError::insufficient_funds("Not enough ETH")
            .with_details("Required: value plus gas headroom");

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("insufficient_funds"));
        assert!(json.contains("Not enough ETH"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(WardenError::already_submitted("tx has been tried").is_recoverable());
        assert!(WardenError::underpriced("gas too low").is_recoverable());
        assert!(!WardenError::broadcast_failed("rejected").is_recoverable());
    }
}
