//! Error types for the swap router

use ledger_core::{Address, Amount, Revert};
use thiserror::Error;

/// Result type for router operations
pub type Result<T> = std::result::Result<T, Error>;

/// Router errors
///
/// Every variant aborts the surrounding transaction; nothing is retried.
#[derive(Error, Debug)]
pub enum Error {
    /// Request deadline already passed
    #[error("Deadline expired: {deadline} < {now}")]
    DeadlineExpired {
        /// Request deadline (unix seconds)
        deadline: u64,
        /// Ledger time of the call
        now: u64,
    },

    /// Input and output asset are the same
    #[error("Same tokens: {asset}")]
    SameAsset {
        /// The asset named on both sides
        asset: Address,
    },

    /// Requested fee rate above the ceiling
    #[error("Exceeds max fee: {fee_bps} bps > {max_fee_bps} bps")]
    FeeExceedsMax {
        /// Requested rate
        fee_bps: u16,
        /// Ceiling fixed at deployment
        max_fee_bps: u16,
    },

    /// Native value attached to the call does not match the request
    #[error("Value mismatch: expected {expected}, received {received}")]
    ValueMismatch {
        /// Required call value
        expected: Amount,
        /// Attached call value
        received: Amount,
    },

    /// An interaction failed with a reason
    #[error("Interaction {index} reverted: {reason}")]
    InteractionReverted {
        /// Position in the interaction list
        index: usize,
        /// Downstream reason, verbatim
        reason: String,
    },

    /// A call failed without any reason
    #[error("Transaction reverted silently")]
    SilentRevert {
        /// Failing interaction, when the failure came from one
        index: Option<usize>,
    },

    /// The executor itself rejected the route
    #[error("Executor reverted: {reason}")]
    ExecutorReverted {
        /// Executor reason
        reason: String,
    },

    /// Measured output below the caller's floor
    #[error("Insufficient output: received {measured}, minimum {min}")]
    InsufficientOutput {
        /// Balance delta observed by the router
        measured: Amount,
        /// Requested minimum
        min: Amount,
    },

    /// Caller is not the treasury
    #[error("Unauthorized: {caller}")]
    Unauthorized {
        /// Rejected caller
        caller: Address,
    },

    /// Router entered while a guarded call is in flight
    #[error("ReentrancyGuard: reentrant call")]
    ReentrantCall,

    /// Ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger_core::Error),

    /// Malformed call payload
    #[error("Invalid call: {0}")]
    InvalidCall(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::InvalidCall(err.to_string())
    }
}

impl From<Error> for Revert {
    fn from(err: Error) -> Self {
        Revert::custom(err)
    }
}

impl Error {
    /// Recover a router error from a failed contract call
    ///
    /// Router and ledger errors come back typed. Anything else is kept as an
    /// executor reason, or reported as a silent revert when it has none.
    pub fn from_revert(revert: Revert) -> Self {
        let revert = match revert.downcast::<Error>() {
            Ok(err) => return err,
            Err(other) => other,
        };
        let revert = match revert.downcast::<ledger_core::Error>() {
            Ok(err) => return Error::Ledger(err),
            Err(other) => other,
        };
        match revert.reason() {
            Some(reason) if !reason.is_empty() => Error::ExecutorReverted { reason },
            _ => Error::SilentRevert { index: None },
        }
    }
}
