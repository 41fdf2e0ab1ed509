//! Ledger Core
//!
//! Transactional asset ledger and contract host.
//!
//! # Architecture
//!
//! - **Working copy**: every top-level transaction mutates a private copy of
//!   the state; the copy replaces the committed state only on success
//! - **Single Writer**: one top-level transaction at a time, in acceptance order
//! - **Nested calls**: contracts call each other through `CallContext::call`;
//!   a reverting callee has its own mutations undone
//! - **Permits**: Ed25519-signed allowance grants usable in the spending call
//!
//! # Invariants
//!
//! - Supply conservation: Σ(balances) == supply for every asset
//! - Atomicity: a failed transaction leaves no trace (balances, storage, logs)
//! - Events are visible only after commit; the log keeps the most recent
//!   `Config::log_retention` entries

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    clippy::all
)]

pub mod actor;
pub mod assets;
pub mod config;
pub mod error;
pub mod host;
pub mod metrics;
pub mod permit;
pub mod state;
pub mod storage;
pub mod types;

// Re-exports
pub use actor::{spawn_host_actor, HostHandle};
pub use assets::{AssetCall, ASSET_GATEWAY};
pub use config::Config;
pub use error::{Error, Result};
pub use host::{CallContext, CallResult, Clock, Contract, Host, ManualClock, Revert, SystemClock, SILENT_REVERT_MESSAGE};
pub use permit::{KeyPair, Permit, SignedPermit};
pub use state::LedgerState;
pub use storage::Storage;
pub use types::{to_units, Address, Amount, LogEntry};
