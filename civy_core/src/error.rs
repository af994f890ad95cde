//! Error types for the civy_core library.

use crate::Holding;
use std::io;
use std::path::PathBuf;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for civy_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Argument does not name a known resource
    #[error("Invalid resource: {0:?}")]
    InvalidResource(String),

    /// A delta would take a balance below zero
    #[error("{holding} balance {balance} cannot absorb delta {delta}")]
    NegativeBalance {
        holding: Holding,
        balance: u64,
        delta: i64,
    },

    /// A delta would take a balance past u64::MAX
    #[error("{holding} balance {balance} overflows with delta {delta}")]
    BalanceOverflow {
        holding: Holding,
        balance: u64,
        delta: i64,
    },

    /// The persisted ledger exists but cannot be parsed
    #[error("Ledger file {path:?} is corrupt: {source}")]
    CorruptLedger {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
