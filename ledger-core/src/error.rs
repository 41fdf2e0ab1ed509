//! Error types for the ledger

use crate::types::{Address, Amount};
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Balance too low for a debit
    #[error("Insufficient balance: {account} holds {available} of {asset}, needs {required}")]
    InsufficientBalance {
        /// Asset being debited
        asset: Address,
        /// Account being debited
        account: Address,
        /// Current balance
        available: Amount,
        /// Requested debit
        required: Amount,
    },

    /// Allowance too low for a delegated transfer
    #[error("Insufficient allowance: {spender} may move {available} of {asset} for {owner}, needs {required}")]
    InsufficientAllowance {
        /// Asset being moved
        asset: Address,
        /// Balance owner
        owner: Address,
        /// Delegated spender
        spender: Address,
        /// Current allowance
        available: Amount,
        /// Requested amount
        required: Amount,
    },

    /// Credit would overflow the balance
    #[error("Balance overflow for {account} in {asset}")]
    BalanceOverflow {
        /// Asset being credited
        asset: Address,
        /// Account being credited
        account: Address,
    },

    /// Malformed or mismatched permit
    #[error("Invalid permit: {0}")]
    InvalidPermit(String),

    /// Permit deadline in the past
    #[error("Permit expired at {deadline} (now {now})")]
    PermitExpired {
        /// Permit deadline (unix seconds)
        deadline: u64,
        /// Current ledger time (unix seconds)
        now: u64,
    },

    /// Signature verification failed
    #[error("Signature verification failed: {0}")]
    SignatureError(String),

    /// Malformed address literal
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A contract is already deployed at this address
    #[error("Address already in use: {0}")]
    AddressInUse(Address),

    /// No contract deployed at this address
    #[error("Contract not found: {0}")]
    ContractNotFound(Address),

    /// Nested calls went too deep
    #[error("Call depth exceeded (max {0})")]
    CallDepthExceeded(usize),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
