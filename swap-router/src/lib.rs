//! Swap Router
//!
//! Trusted-executor swap router running as a contract on a `ledger_core::Host`.
//!
//! # Architecture
//!
//! A caller asks the router to turn one asset into another. The router takes
//! custody of the input, hands it to a caller-chosen executor that performs an
//! arbitrary list of interactions, and then measures its own balance of the
//! output asset. Whatever arrived is the output; the executor's word is never
//! taken for it.
//!
//! ```text
//! caller ─▶ RouteSettlement::validate
//!        ─▶ AssetCustody::pull_input
//!        ─▶ executor ─▶ InteractionRunner::run
//!        ─▶ measure output (balance delta)
//!        ─▶ FeeConfig::split
//!        ─▶ AssetCustody::pay_out (treasury, caller)
//! ```
//!
//! # Invariants
//!
//! - `fee + payout == measured output`, `fee = floor(measured * bps / 10_000)`
//! - `0 <= current fee <= max fee` at all times
//! - The reentrancy guard is held across the whole executor window and
//!   around treasury operations
//! - Any error rolls back every ledger mutation of the call
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{Address, Config as LedgerConfig, Host};
//! use swap_router::{Executor, InteractionExecutor, Router, RouterConfig, SwapRequest};
//!
//! fn main() -> swap_router::Result<()> {
//!     let host = Host::new(LedgerConfig::default());
//!     let config = RouterConfig {
//!         treasury: Address::from_label("treasury"),
//!         ..RouterConfig::default()
//!     };
//!     let router = Router::deploy(&host, Address::from_label("owner"), &config)?;
//!
//!     let executor = Address::from_label("executor");
//!     host.deploy(executor, InteractionExecutor.into_contract())?;
//!
//!     let dai = Address::from_label("DAI");
//!     let weth = Address::from_label("WETH");
//!     let request = SwapRequest::new(dai, weth, 100, 90, host.now() + 300);
//!     let record = router.swap(&host, Address::from_label("user"), 0, executor, &request, &[])?;
//!     println!("paid {} (fee {})", record.payout, record.fee);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod access;
pub mod config;
pub mod custody;
pub mod error;
pub mod fee;
pub mod guard;
pub mod interaction;
pub mod metrics;
pub mod router;
pub mod settlement;
pub mod types;

// Re-exports
pub use access::AccessControl;
pub use config::{Config, RouterConfig};
pub use custody::AssetCustody;
pub use error::{Error, Result};
pub use fee::{FeeConfig, FeeSplit};
pub use guard::{ReentrancyGuard, ReentrancyToken};
pub use interaction::{ExecuteRoute, Executor, ExecutorContract, InteractionExecutor, InteractionRunner};
pub use router::Router;
pub use settlement::{ExecutionContext, RouteSettlement};
pub use types::*;
