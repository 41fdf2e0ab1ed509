//! Contract host: registry, call dispatch, all-or-nothing transactions
//!
//! The host is the execution environment contracts run in. It owns the
//! committed `LedgerState` and a registry of deployed contracts.
//!
//! # Transaction model
//!
//! ```text
//!  Host::invoke(origin, target, value, f)
//!     │
//!     ├─ writer lock (one top-level transaction at a time)
//!     ├─ working = committed.fork()   (tables only, empty log)
//!     ├─ move `value` native units origin → target
//!     ├─ f(&mut CallContext { state: &mut working, .. })
//!     │      └─ CallContext::call(target, value, payload)
//!     │             ├─ snapshot = working.fork(), log mark
//!     │             ├─ dispatch to target contract (nested context)
//!     │             └─ on Revert: restore snapshot, truncate log to mark
//!     └─ Ok  → committed adopts working tables, appends its events
//!        Err → working dropped, nothing visible
//! ```
//!
//! Contracts read the working state through their `CallContext` and change
//! it only through frame-scoped operations: funds leave the executing
//! contract's own balance or an allowance granted to it, and storage writes
//! land in its own namespace. The committed-state accessors on `Host` only
//! see the last commit.

use crate::{
    assets::{AssetGateway, ASSET_GATEWAY},
    metrics::Metrics,
    permit::SignedPermit,
    state::LedgerState,
    types::{Address, Amount, LogEntry},
    Config, Error, Result,
};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error as ThisError;

/// Message substituted when a call fails without a reason
pub const SILENT_REVERT_MESSAGE: &str = "Transaction reverted silently";

/// Failure of a contract call
#[derive(ThisError, Debug)]
pub enum Revert {
    /// Revert with a reason string
    #[error("{0}")]
    Message(String),

    /// Revert without any reason
    #[error("Transaction reverted silently")]
    Silent,

    /// Typed error raised by a contract
    #[error("{0}")]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl Revert {
    /// Revert with a reason string
    pub fn message(reason: impl Into<String>) -> Self {
        Revert::Message(reason.into())
    }

    /// Wrap a typed contract error
    pub fn custom<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Revert::Custom(Box::new(err))
    }

    /// Reason carried by the revert, if any
    pub fn reason(&self) -> Option<String> {
        match self {
            Revert::Message(reason) => Some(reason.clone()),
            Revert::Silent => None,
            Revert::Custom(err) => Some(err.to_string()),
        }
    }

    /// Recover a typed contract error
    pub fn downcast<E>(self) -> std::result::Result<E, Revert>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        match self {
            Revert::Custom(err) => err.downcast::<E>().map(|e| *e).map_err(Revert::Custom),
            other => Err(other),
        }
    }
}

impl From<Error> for Revert {
    fn from(err: Error) -> Self {
        Revert::custom(err)
    }
}

/// Result of a contract call
pub type CallResult = std::result::Result<Vec<u8>, Revert>;

/// Deployed contract
pub trait Contract: Send + Sync {
    /// Handle a call carrying an opaque payload
    fn call(&self, cx: &mut CallContext<'_>, payload: &[u8]) -> CallResult;
}

/// Source of ledger time (unix seconds)
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time
    fn now(&self) -> u64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// Manually driven clock (tests, replay)
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create at the given time
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    /// Set the time
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move time forward
    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Execution environment shared by all contracts
pub struct Host {
    /// Configuration
    config: Config,

    /// Deployed contracts
    contracts: DashMap<Address, Arc<dyn Contract>>,

    /// Last committed state
    state: RwLock<LedgerState>,

    /// Serializes top-level transactions
    writer: Mutex<()>,

    /// Time source
    clock: Arc<dyn Clock>,

    /// Metrics
    metrics: Metrics,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("native_asset", &self.config.native_asset)
            .field("contracts", &self.contracts.len())
            .field("clock", &self.clock)
            .finish()
    }
}

impl Host {
    /// Create a host with empty state and the wall clock
    ///
    /// The asset gateway is deployed at [`ASSET_GATEWAY`].
    pub fn new(config: Config) -> Self {
        let contracts: DashMap<Address, Arc<dyn Contract>> = DashMap::new();
        contracts.insert(ASSET_GATEWAY, Arc::new(AssetGateway));

        Self {
            config,
            contracts,
            state: RwLock::new(LedgerState::new()),
            writer: Mutex::new(()),
            clock: Arc::new(SystemClock),
            metrics: Metrics::default(),
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Start from a previously saved state
    pub fn with_state(self, state: LedgerState) -> Self {
        *self.state.write() = state;
        self
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Asset id of the native asset (the one carried as call value)
    pub fn native_asset(&self) -> Address {
        self.config.native_asset
    }

    /// Current ledger time
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Register a contract at `address`
    pub fn deploy(&self, address: Address, contract: Arc<dyn Contract>) -> Result<()> {
        use dashmap::mapref::entry::Entry;

        match self.contracts.entry(address) {
            Entry::Occupied(_) => Err(Error::AddressInUse(address)),
            Entry::Vacant(slot) => {
                slot.insert(contract);
                tracing::debug!(%address, "contract deployed");
                Ok(())
            }
        }
    }

    /// Contract deployed at `address`
    pub fn contract(&self, address: Address) -> Option<Arc<dyn Contract>> {
        self.contracts.get(&address).map(|entry| entry.value().clone())
    }

    /// Run a top-level transaction
    ///
    /// `value` native units move from `origin` to `target` before `f` runs.
    /// All mutations made through the context commit only if `f` returns `Ok`.
    pub fn invoke<T, E, F>(&self, origin: Address, target: Address, value: Amount, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut CallContext<'_>) -> std::result::Result<T, E>,
        E: From<Error> + fmt::Display,
    {
        let _writer = self.writer.lock();
        let mut working = self.state.read().fork();

        let result = {
            let mut cx = CallContext {
                host: self,
                state: &mut working,
                caller: origin,
                address: target,
                value,
                depth: 0,
                timestamp: self.now(),
            };
            cx.move_value(origin, target, value)
                .map_err(E::from)
                .and_then(|()| f(&mut cx))
        };

        match result {
            Ok(output) => {
                self.state.write().commit(working, self.config.log_retention);
                self.metrics.record_commit();
                Ok(output)
            }
            Err(err) => {
                self.metrics.record_rollback();
                tracing::warn!(%origin, %target, error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }

    /// Run a top-level call against the contract at `target`
    pub fn submit(&self, origin: Address, target: Address, value: Amount, payload: &[u8]) -> CallResult {
        self.invoke(origin, target, value, |cx| cx.dispatch(payload))
    }

    /// Read the committed state
    pub fn read<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> R {
        f(&self.state.read())
    }

    /// Copy of the committed state
    pub fn snapshot(&self) -> LedgerState {
        self.state.read().clone()
    }

    /// Committed balance
    pub fn balance_of(&self, asset: Address, account: Address) -> Amount {
        self.read(|state| state.balance_of(asset, account))
    }

    /// Committed events
    pub fn logs(&self) -> Vec<LogEntry> {
        self.read(|state| state.logs().to_vec())
    }

    /// Genesis allocation: create `amount` of `asset` in `to`
    pub fn mint(&self, asset: Address, to: Address, amount: Amount) -> Result<()> {
        self.invoke(to, to, 0, |cx| cx.state_mut().mint(asset, to, amount))
    }

    /// Owner-signed approval of `spender`
    pub fn approve(&self, asset: Address, owner: Address, spender: Address, amount: Amount) -> Result<()> {
        self.invoke(owner, spender, 0, |cx| {
            cx.state_mut().approve(asset, owner, spender, amount);
            Ok(())
        })
    }

    /// Owner-signed transfer
    pub fn transfer(&self, asset: Address, from: Address, to: Address, amount: Amount) -> Result<()> {
        self.invoke(from, to, 0, |cx| cx.state_mut().transfer(asset, from, to, amount))
    }
}

/// View of the running transaction from inside one contract frame
pub struct CallContext<'a> {
    host: &'a Host,
    state: &'a mut LedgerState,
    caller: Address,
    address: Address,
    value: Amount,
    depth: usize,
    timestamp: u64,
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("caller", &self.caller)
            .field("address", &self.address)
            .field("value", &self.value)
            .field("depth", &self.depth)
            .finish()
    }
}

impl<'a> CallContext<'a> {
    /// Immediate caller of this frame
    pub fn caller(&self) -> Address {
        self.caller
    }

    /// Address of the contract executing this frame
    pub fn address(&self) -> Address {
        self.address
    }

    /// Native value received with this call
    pub fn value(&self) -> Amount {
        self.value
    }

    /// Call depth (0 = top-level)
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Transaction time (fixed for the whole transaction)
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Native asset id
    pub fn native_asset(&self) -> Address {
        self.host.native_asset()
    }

    /// Working state
    pub fn state(&self) -> &LedgerState {
        self.state
    }

    /// Mutable working state; only the host and its system contracts get it
    pub(crate) fn state_mut(&mut self) -> &mut LedgerState {
        self.state
    }

    /// Working balance of `account`
    pub fn balance_of(&self, asset: Address, account: Address) -> Amount {
        self.state.balance_of(asset, account)
    }

    /// Move this contract's own funds to `to`
    pub fn transfer(&mut self, asset: Address, to: Address, amount: Amount) -> Result<()> {
        let from = self.address;
        self.state.transfer(asset, from, to, amount)
    }

    /// Let `spender` draw on this contract's funds
    pub fn approve(&mut self, asset: Address, spender: Address, amount: Amount) {
        let owner = self.address;
        self.state.approve(asset, owner, spender, amount);
    }

    /// Spend an allowance `owner` granted to this contract
    pub fn transfer_from(&mut self, asset: Address, owner: Address, to: Address, amount: Amount) -> Result<()> {
        let spender = self.address;
        self.state.transfer_from(asset, spender, owner, to, amount)
    }

    /// Install the allowance of a signed permit, checked at transaction time
    pub fn permit(&mut self, signed: &SignedPermit) -> Result<()> {
        let now = self.timestamp;
        self.state.permit(signed, now)
    }

    /// Read from this contract's storage
    pub fn storage_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.state.storage_get(self.address, key)
    }

    /// Write into this contract's storage
    pub fn storage_set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let contract = self.address;
        self.state.storage_set(contract, key, value)
    }

    /// Emit an event from this contract
    pub fn emit<T: Serialize>(&mut self, name: &str, body: &T) -> Result<()> {
        let entry = LogEntry::new(self.address, name, body)?;
        self.state.emit(entry);
        Ok(())
    }

    /// Call another contract
    ///
    /// Moves `value` native units from this contract to `target`. If the
    /// callee reverts, every mutation it made is undone before the revert is
    /// returned. Targets without code accept the value and return nothing.
    pub fn call(&mut self, target: Address, value: Amount, payload: &[u8]) -> CallResult {
        let max_depth = self.host.config.max_call_depth;
        if self.depth + 1 > max_depth {
            return Err(Revert::from(Error::CallDepthExceeded(max_depth)));
        }

        let snapshot = self.state.fork();
        let log_len = self.state.logs().len();
        let from = self.address;

        let result = {
            let mut child = CallContext {
                host: self.host,
                state: &mut *self.state,
                caller: from,
                address: target,
                value,
                depth: self.depth + 1,
                timestamp: self.timestamp,
            };
            child
                .move_value(from, target, value)
                .map_err(Revert::from)
                .and_then(|()| child.dispatch(payload))
        };

        if result.is_err() {
            self.state.restore(snapshot, log_len);
        }
        result
    }

    /// Run this frame's contract code against `payload`
    fn dispatch(&mut self, payload: &[u8]) -> CallResult {
        match self.host.contract(self.address) {
            Some(contract) => contract.call(self, payload),
            None => Ok(Vec::new()),
        }
    }

    fn move_value(&mut self, from: Address, to: Address, value: Amount) -> Result<()> {
        if value == 0 {
            return Ok(());
        }
        let native = self.host.native_asset();
        self.state.transfer(native, from, to, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every call and optionally reverts
    struct Echo;

    impl Contract for Echo {
        fn call(&self, cx: &mut CallContext<'_>, payload: &[u8]) -> CallResult {
            match payload {
                b"revert" => Err(Revert::message("echo refused")),
                b"silent" => Err(Revert::Silent),
                b"mint-then-revert" => {
                    let asset = Address::from_label("TOKEN");
                    let me = cx.address();
                    cx.state_mut().mint(asset, me, 5)?;
                    Err(Revert::Silent)
                }
                _ => {
                    cx.emit("Echo", &payload.len())?;
                    Ok(payload.to_vec())
                }
            }
        }
    }

    fn host() -> Host {
        Host::new(Config::default()).with_clock(Arc::new(ManualClock::new(1_000)))
    }

    #[test]
    fn test_submit_commits_logs() {
        let host = host();
        let echo = Address::from_label("echo");
        host.deploy(echo, Arc::new(Echo)).unwrap();

        let output = host.submit(Address::from_label("user"), echo, 0, b"hello").unwrap();
        assert_eq!(output, b"hello");
        assert_eq!(host.logs().len(), 1);
        assert_eq!(host.metrics().committed.get(), 1);
    }

    #[test]
    fn test_deploy_twice_fails() {
        let host = host();
        let echo = Address::from_label("echo");
        host.deploy(echo, Arc::new(Echo)).unwrap();
        assert!(matches!(host.deploy(echo, Arc::new(Echo)), Err(Error::AddressInUse(_))));
    }

    #[test]
    fn test_revert_rolls_back_value_transfer() {
        let host = host();
        let echo = Address::from_label("echo");
        let user = Address::from_label("user");
        host.deploy(echo, Arc::new(Echo)).unwrap();
        host.mint(host.native_asset(), user, 100).unwrap();

        let err = host.submit(user, echo, 40, b"revert").unwrap_err();
        assert_eq!(err.to_string(), "echo refused");
        assert_eq!(host.balance_of(host.native_asset(), user), 100);
        assert_eq!(host.balance_of(host.native_asset(), echo), 0);
        assert_eq!(host.metrics().rolled_back.get(), 1);
    }

    #[test]
    fn test_value_transfer_requires_balance() {
        let host = host();
        let err = host
            .submit(Address::from_label("broke"), Address::from_label("anyone"), 1, b"")
            .unwrap_err();
        assert!(matches!(err.downcast::<Error>(), Ok(Error::InsufficientBalance { .. })));
    }

    #[test]
    fn test_nested_revert_restores_only_the_callee_frame() {
        struct Caller;

        impl Contract for Caller {
            fn call(&self, cx: &mut CallContext<'_>, _payload: &[u8]) -> CallResult {
                let me = cx.address();
                cx.state_mut().mint(Address::from_label("TOKEN"), me, 1)?;
                let inner = cx.call(Address::from_label("echo"), 0, b"mint-then-revert");
                assert!(matches!(inner, Err(Revert::Silent)));
                Ok(Vec::new())
            }
        }

        let host = host();
        host.deploy(Address::from_label("echo"), Arc::new(Echo)).unwrap();
        host.deploy(Address::from_label("caller"), Arc::new(Caller)).unwrap();

        host.submit(Address::from_label("user"), Address::from_label("caller"), 0, b"")
            .unwrap();

        let token = Address::from_label("TOKEN");
        assert_eq!(host.balance_of(token, Address::from_label("caller")), 1);
        assert_eq!(host.balance_of(token, Address::from_label("echo")), 0);
    }

    #[test]
    fn test_frame_moves_only_its_own_funds() {
        use crate::assets::AssetCall;

        /// Tries every way of reaching a victim's balance
        struct Thief {
            victim: Address,
        }

        impl Contract for Thief {
            fn call(&self, cx: &mut CallContext<'_>, payload: &[u8]) -> CallResult {
                let token = Address::from_label("TOKEN");
                let me = cx.address();
                match payload {
                    b"allowance" => cx.transfer_from(token, self.victim, me, 50)?,
                    b"gateway" => {
                        let call = AssetCall::TransferFrom {
                            asset: token,
                            owner: self.victim,
                            to: me,
                            amount: 50,
                        };
                        cx.call(ASSET_GATEWAY, 0, &call.encode()?)?;
                    }
                    _ => cx.transfer(token, me, 50)?,
                }
                Ok(Vec::new())
            }
        }

        let host = host();
        let token = Address::from_label("TOKEN");
        let victim = Address::from_label("victim");
        let thief = Address::from_label("thief");
        host.mint(token, victim, 50).unwrap();
        host.deploy(thief, Arc::new(Thief { victim })).unwrap();

        for payload in [&b"allowance"[..], &b"gateway"[..], &b"own"[..]] {
            let err = host.submit(Address::from_label("user"), thief, 0, payload).unwrap_err();
            assert!(matches!(
                err.downcast::<Error>(),
                Ok(Error::InsufficientAllowance { .. }) | Ok(Error::InsufficientBalance { .. })
            ));
        }
        assert_eq!(host.balance_of(token, victim), 50);
        assert_eq!(host.balance_of(token, thief), 0);

        // With an allowance the same contract may draw exactly that much
        host.approve(token, victim, thief, 20).unwrap();
        let err = host.submit(Address::from_label("user"), thief, 0, b"allowance").unwrap_err();
        assert!(matches!(err.downcast::<Error>(), Ok(Error::InsufficientAllowance { available: 20, .. })));
        assert_eq!(host.balance_of(token, victim), 50);
    }

    #[test]
    fn test_frame_storage_is_namespaced() {
        struct Writer;

        impl Contract for Writer {
            fn call(&self, cx: &mut CallContext<'_>, _payload: &[u8]) -> CallResult {
                cx.storage_set("slot", &7u32)?;
                assert_eq!(cx.storage_get::<u32>("slot")?, Some(7));
                Ok(Vec::new())
            }
        }

        let host = host();
        let writer = Address::from_label("writer");
        host.deploy(writer, Arc::new(Writer)).unwrap();
        host.submit(Address::from_label("user"), writer, 0, b"").unwrap();

        let other = Address::from_label("other");
        host.read(|state| {
            assert_eq!(state.storage_get::<u32>(writer, "slot").unwrap(), Some(7));
            assert_eq!(state.storage_get::<u32>(other, "slot").unwrap(), None);
        });
    }

    #[test]
    fn test_nested_revert_drops_only_callee_events() {
        struct Caller;

        impl Contract for Caller {
            fn call(&self, cx: &mut CallContext<'_>, _payload: &[u8]) -> CallResult {
                cx.emit("Outer", &0u8)?;
                let echo = Address::from_label("echo");
                cx.call(echo, 0, b"logged")?;
                let inner = cx.call(Address::from_label("failing"), 0, b"");
                assert!(inner.is_err());
                Ok(Vec::new())
            }
        }

        /// Emits, then reverts
        struct Failing;

        impl Contract for Failing {
            fn call(&self, cx: &mut CallContext<'_>, _payload: &[u8]) -> CallResult {
                cx.emit("Lost", &0u8)?;
                Err(Revert::message("failing"))
            }
        }

        let host = host();
        host.deploy(Address::from_label("echo"), Arc::new(Echo)).unwrap();
        host.deploy(Address::from_label("caller"), Arc::new(Caller)).unwrap();
        host.deploy(Address::from_label("failing"), Arc::new(Failing)).unwrap();

        host.submit(Address::from_label("user"), Address::from_label("caller"), 0, b"")
            .unwrap();

        let names: Vec<_> = host.logs().into_iter().map(|log| log.name).collect();
        assert_eq!(names, vec!["Outer", "Echo"]);
    }

    #[test]
    fn test_log_retention_keeps_newest_events() {
        let config = Config {
            log_retention: 3,
            ..Config::default()
        };
        let host = Host::new(config);
        let echo = Address::from_label("echo");
        host.deploy(echo, Arc::new(Echo)).unwrap();

        for i in 0..5u8 {
            host.submit(Address::from_label("user"), echo, 0, &vec![0u8; usize::from(i) + 1])
                .unwrap();
        }

        let sizes: Vec<usize> = host.logs().iter().map(|log| log.decode().unwrap()).collect();
        assert_eq!(sizes, vec![3, 4, 5]);
    }

    #[test]
    fn test_call_to_empty_address_succeeds() {
        let host = host();
        let output = host
            .submit(Address::from_label("user"), Address::from_label("nobody"), 0, b"\x12\x34")
            .unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_revert_downcast() {
        let revert = Revert::from(Error::ContractNotFound(Address::ZERO));
        assert!(revert.reason().unwrap().contains("Contract not found"));
        assert!(matches!(revert.downcast::<Error>(), Ok(Error::ContractNotFound(_))));

        assert_eq!(Revert::Silent.reason(), None);
        assert_eq!(Revert::Silent.to_string(), SILENT_REVERT_MESSAGE);
    }

    #[test]
    fn test_manual_clock() {
        let clock = Arc::new(ManualClock::new(10));
        let host = Host::new(Config::default()).with_clock(clock.clone());
        assert_eq!(host.now(), 10);
        clock.advance(5);
        assert_eq!(host.now(), 15);
    }
}
