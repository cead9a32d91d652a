use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use thiserror::Error;

/// SDK-specific error types for subscription billing operations
#[derive(Debug, Error)]
pub enum SubscriptionSdkError {
    /// Connection or RPC error
    #[error("Connection error: {0}")]
    Connection(String),

    /// A ledger call did not complete within the configured timeout
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Account not found on-chain
    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    /// Textual address could not be parsed
    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    /// Account bytes rejected by the codec
    #[error("Invalid account data: {0}")]
    Decode(#[from] DecodeError),

    /// Instruction arguments did not match the instruction's layout
    #[error("Encoding error: {0}")]
    Encode(String),

    /// The signing collaborator refused or failed to sign
    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, SubscriptionSdkError>;

/// Rejection of a raw subscription account buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("account data too small: {len} bytes, need at least {min}")]
    TooSmall { len: usize, min: usize },

    #[error("account discriminator {found:02x?} is not a Subscription")]
    WrongDiscriminator { found: [u8; 8] },

    #[error("implausible value in `{field}`: {reason}")]
    GarbageValue { field: &'static str, reason: String },
}

impl DecodeError {
    pub fn reason(&self) -> MalformedReason {
        match self {
            DecodeError::TooSmall { .. } => MalformedReason::TooSmall,
            DecodeError::WrongDiscriminator { .. } => MalformedReason::WrongDiscriminator,
            DecodeError::GarbageValue { .. } => MalformedReason::GarbageValues,
        }
    }
}

/// Skip classification for an account the codec refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MalformedReason {
    TooSmall,
    WrongDiscriminator,
    GarbageValues,
}
