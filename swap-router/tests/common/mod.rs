//! Shared fixture and test contracts

#![allow(dead_code)]

use ledger_core::{
    Address, Amount, CallContext, CallResult, Config as LedgerConfig, Contract, Host, LedgerState, LogEntry,
    ManualClock, Revert,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use swap_router::{
    Executor, Interaction, InteractionExecutor, Router, RouterCall, RouterConfig, SwapExecuted, SwapRequest,
};

pub const NOW: u64 = 1_700_000_000;
pub const E18: Amount = 1_000_000_000_000_000_000;
pub const FEE_BPS: u16 = 30;

/// `n` whole tokens in base units
pub fn units(n: u128) -> Amount {
    n * E18
}

/// Reserves held by [`Reserve`] in every asset the tests use
pub const RESERVE_FUNDING: Amount = 1_000_000 * E18;

/// Payment order understood by [`Reserve`]
#[derive(Debug, Serialize, Deserialize)]
pub struct PayOrder {
    pub asset: Address,
    pub to: Address,
    pub amount: Amount,
}

/// Pays out of its own pre-funded reserves; stands in for a pool paying out
pub struct Reserve;

impl Contract for Reserve {
    fn call(&self, cx: &mut CallContext<'_>, payload: &[u8]) -> CallResult {
        let order: PayOrder = bincode::deserialize(payload).map_err(|_| Revert::Silent)?;
        cx.transfer(order.asset, order.to, order.amount)?;
        Ok(Vec::new())
    }
}

/// Always reverts, with the configured reason or silently
pub struct RevertingTarget(pub Option<String>);

impl Contract for RevertingTarget {
    fn call(&self, _cx: &mut CallContext<'_>, _payload: &[u8]) -> CallResult {
        match &self.0 {
            Some(reason) => Err(Revert::message(reason.clone())),
            None => Err(Revert::Silent),
        }
    }
}

/// Counter call understood by [`Counter`]
#[derive(Debug, Serialize, Deserialize)]
pub enum CounterCall {
    Increment(u64),
}

/// Keeps a counter in storage
pub struct Counter;

impl Counter {
    pub fn value(state: &LedgerState, address: Address) -> u64 {
        state.storage_get(address, "counter").unwrap().unwrap_or(0)
    }
}

impl Contract for Counter {
    fn call(&self, cx: &mut CallContext<'_>, payload: &[u8]) -> CallResult {
        let CounterCall::Increment(by) = bincode::deserialize(payload).map_err(|_| Revert::Silent)?;
        let current: u64 = cx.storage_get("counter")?.unwrap_or(0);
        cx.storage_set("counter", &(current + by))?;
        Ok(Vec::new())
    }
}

/// Executor that calls straight back into the router
pub struct ReentrantExecutor {
    pub router: Address,
    pub request: SwapRequest,
}

impl Executor for ReentrantExecutor {
    fn execute_route(
        &self,
        cx: &mut CallContext<'_>,
        _interactions: &[Interaction],
        _output_asset: Address,
    ) -> Result<(), Revert> {
        let me = cx.address();
        let call = RouterCall::ExecuteSwap {
            executor: me,
            request: self.request.clone(),
            interactions: Vec::new(),
        };
        cx.call(self.router, 0, &call.encode()?)?;
        Ok(())
    }
}

/// Executor that reports a huge output but produces nothing
pub struct LyingExecutor;

impl Contract for LyingExecutor {
    fn call(&self, _cx: &mut CallContext<'_>, _payload: &[u8]) -> CallResult {
        Ok(bincode::serialize(&Amount::MAX).map_err(|e| Revert::message(e.to_string()))?)
    }
}

/// Executor that tries to take `victim`'s `asset` into the router
pub struct ThiefExecutor {
    pub victim: Address,
    pub asset: Address,
    pub router: Address,
}

impl Executor for ThiefExecutor {
    fn execute_route(
        &self,
        cx: &mut CallContext<'_>,
        _interactions: &[Interaction],
        _output_asset: Address,
    ) -> Result<(), Revert> {
        let loot = cx.balance_of(self.asset, self.victim);
        cx.transfer_from(self.asset, self.victim, self.router, loot)?;
        Ok(())
    }
}

/// Forwards every call to `target` with a fixed payload
pub struct Forwarder {
    pub target: Address,
    pub payload: Vec<u8>,
}

impl Contract for Forwarder {
    fn call(&self, cx: &mut CallContext<'_>, _payload: &[u8]) -> CallResult {
        cx.call(self.target, 0, &self.payload)
    }
}

/// Host with a router, the stock executor and test targets
pub struct Fixture {
    pub host: Host,
    pub clock: Arc<ManualClock>,
    pub router: Arc<Router>,
    pub owner: Address,
    pub treasury: Address,
    pub user: Address,
    pub executor: Address,
    pub reserve: Address,
    pub dai: Address,
    pub weth: Address,
    /// Id the router accepts for the native asset in requests
    pub native_alias: Address,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_fees(FEE_BPS, 50)
    }

    pub fn with_fees(fee_bps: u16, max_fee_bps: u16) -> Self {
        Self::build(fee_bps, max_fee_bps, None)
    }

    /// Router that names the native asset by a token-like id, the way a
    /// wrapped-native address stands in for it
    pub fn with_native_alias(alias: &str) -> Self {
        Self::build(FEE_BPS, 50, Some(Address::from_label(alias)))
    }

    fn build(fee_bps: u16, max_fee_bps: u16, alias: Option<Address>) -> Self {
        let clock = Arc::new(ManualClock::new(NOW));
        let host = Host::new(LedgerConfig::default()).with_clock(clock.clone());
        let native_alias = alias.unwrap_or_else(|| host.native_asset());

        let owner = Address::from_label("owner");
        let treasury = Address::from_label("treasury");
        let config = RouterConfig {
            treasury,
            native_asset: native_alias,
            fee_bps,
            max_fee_bps,
            ..RouterConfig::default()
        };
        let router = Router::deploy(&host, owner, &config).unwrap();

        let executor = Address::from_label("executor");
        host.deploy(executor, InteractionExecutor.into_contract()).unwrap();
        let reserve = Address::from_label("reserve");
        host.deploy(reserve, Arc::new(Reserve)).unwrap();

        let dai = Address::from_label("DAI");
        let weth = Address::from_label("WETH");
        for asset in [dai, weth, host.native_asset()] {
            host.mint(asset, reserve, RESERVE_FUNDING).unwrap();
        }

        Self {
            host,
            clock,
            router,
            owner,
            treasury,
            user: Address::from_label("user"),
            executor,
            reserve,
            dai,
            weth,
            native_alias,
        }
    }

    /// Ledger id of the native asset
    pub fn native(&self) -> Address {
        self.host.native_asset()
    }

    /// DAI → WETH, 100 in, 0.9 out minimum, five minutes to go, 30 bps
    pub fn request(&self) -> SwapRequest {
        SwapRequest::new(self.dai, self.weth, units(100), 9 * E18 / 10, NOW + 300).with_fee_bps(FEE_BPS)
    }

    /// Fund the user with DAI and approve the router
    pub fn fund_user(&self, amount: Amount) {
        self.host.mint(self.dai, self.user, amount).unwrap();
        self.host
            .approve(self.dai, self.user, self.router.address(), amount)
            .unwrap();
    }

    /// Interaction paying `amount` of `asset` from the reserve to the router
    pub fn pay_router(&self, asset: Address, amount: Amount) -> Interaction {
        self.pay_to(asset, self.router.address(), amount)
    }

    /// Interaction paying `amount` of `asset` from the reserve to `to`
    pub fn pay_to(&self, asset: Address, to: Address, amount: Amount) -> Interaction {
        let order = PayOrder { asset, to, amount };
        Interaction::new(self.reserve, bincode::serialize(&order).unwrap())
    }

    pub fn swap(&self, request: &SwapRequest, interactions: &[Interaction]) -> swap_router::Result<swap_router::SettlementRecord> {
        self.router
            .swap(&self.host, self.user, 0, self.executor, request, interactions)
    }

    pub fn deploy(&self, label: &str, contract: Arc<dyn Contract>) -> Address {
        let address = Address::from_label(label);
        self.host.deploy(address, contract).unwrap();
        address
    }

    pub fn balance(&self, asset: Address, account: Address) -> Amount {
        self.host.balance_of(asset, account)
    }

    pub fn snapshot(&self) -> LedgerState {
        self.host.snapshot()
    }

    /// Committed events of the router with the given name
    pub fn router_logs(&self, name: &str) -> Vec<LogEntry> {
        let router = self.router.address();
        self.host
            .read(|state| state.logs_named(router, name).cloned().collect())
    }

    pub fn swap_events(&self) -> Vec<SwapExecuted> {
        self.router_logs("SwapExecuted")
            .iter()
            .map(|log| log.decode().unwrap())
            .collect()
    }
}
