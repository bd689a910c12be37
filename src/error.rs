//! Error types for solochain

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed or insufficient transaction fields; the transaction is
    /// rejected and the pending pool is left unchanged.
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Hash, linkage, proof-of-work or transaction-validity mismatch found
    /// during a chain audit or load. Never repaired silently.
    #[error("Chain integrity failure at block {index}: {reason}")]
    ChainIntegrity { index: u64, reason: String },

    /// File missing, corrupt or unwritable.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A block was appended in memory but the save that follows failed.
    /// The block must not be reported as durably committed.
    #[error("Block {index} mined but not persisted: {reason}")]
    MinedButNotPersisted { index: u64, reason: String },

    /// Malformed key material; wallet construction aborts.
    #[error("Key format error: {0}")]
    KeyFormat(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Persistence(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, LedgerError>;
