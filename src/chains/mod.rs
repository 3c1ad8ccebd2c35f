//! Chain Adapters
//!
//! Transaction construction, fee estimation, and broadcast for the
//! spendable chains. Both adapters authenticate every spend by
//! re-deriving the child key from the caller-supplied path and checking
//! it against the claimed sending address before any network call.

mod bitcoin;
mod ethereum;

pub use self::bitcoin::*;
pub use self::ethereum::*;
