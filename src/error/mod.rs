//! Error handling for the ledger
//!
//! Every fallible operation in the crate returns [`Result`], carrying one of
//! the [`BlockchainError`] kinds below.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error kinds raised by the chain store, the UTXO resolver and the CLI glue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// Key-value store unavailable, or an entry is missing where one must exist
    Database(String),
    /// Persisted bytes could not be encoded or decoded
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Invalid settings
    Config(String),
    /// Transaction construction errors
    Transaction(String),
    /// Empty or otherwise unusable lock identity
    InvalidAddress(String),
    /// Requested payment exceeds the spendable balance
    InsufficientFunds { required: u64, available: u64 },
    /// An operation needs a persisted chain and none exists
    MissingChain(String),
    /// A chain is already persisted at the requested location
    ChainExists(String),
    /// Block construction or verification errors
    InvalidBlock(String),
    /// Nonce space exhausted without meeting the target
    Mining(String),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::Database(msg) => write!(f, "Database error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Transaction(msg) => write!(f, "Transaction error: {msg}"),
            BlockchainError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            BlockchainError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            BlockchainError::MissingChain(path) => {
                write!(f, "No existing blockchain found at {path}. Create one first.")
            }
            BlockchainError::ChainExists(path) => {
                write!(f, "Blockchain already exists at {path}")
            }
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::Mining(msg) => write!(f, "Mining error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}
