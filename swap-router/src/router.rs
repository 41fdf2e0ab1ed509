//! Router contract
//!
//! The router is deployed on a `Host` like any other contract and answers
//! bincode-encoded [`RouterCall`] payloads. The same operations are exposed
//! as typed methods, each in two flavors: one running inside an existing
//! call frame (`execute_swap`, `update_fee_parameters`, `collect_fees`) and
//! one opening its own top-level transaction (`swap`, `update_fee`,
//! `collect`).

use crate::{
    access::AccessControl,
    config::RouterConfig,
    custody::AssetCustody,
    fee::FeeConfig,
    guard::ReentrancyGuard,
    metrics::Metrics,
    settlement::RouteSettlement,
    types::{
        FeeParametersUpdated, FeesCollected, Interaction, RouterCall, RouterDeployed, SettlementRecord,
        SwapRequest,
    },
    Error, Result,
};
use ledger_core::{Address, Amount, CallContext, CallResult, Contract, Host};
use std::sync::Arc;

/// Trusted-executor swap router
#[derive(Debug)]
pub struct Router {
    address: Address,
    access: AccessControl,
    custody: AssetCustody,
    guard: ReentrancyGuard,
    metrics: Metrics,
}

impl Router {
    /// Deploy a router on `host` on behalf of `owner`
    ///
    /// Fee parameters are written to the router's storage unless the ledger
    /// already holds them (state restored from a snapshot).
    pub fn deploy(host: &Host, owner: Address, config: &RouterConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let fees = FeeConfig::new(config.fee_bps, config.max_fee_bps)?;

        let router = Arc::new(Self {
            address: config.address,
            access: AccessControl::new(owner, config.treasury),
            custody: AssetCustody::new(config.native_asset),
            guard: ReentrancyGuard::new(),
            metrics: Metrics::default(),
        });
        host.deploy(config.address, router.clone())?;

        host.invoke(owner, config.address, 0, |cx| {
            if FeeConfig::try_load(cx.state(), config.address)?.is_some() {
                tracing::info!(router = %config.address, "router reattached to existing state");
                return Ok(());
            }
            fees.store(cx)?;
            cx.emit(
                "RouterDeployed",
                &RouterDeployed {
                    owner,
                    treasury: config.treasury,
                    native_asset: config.native_asset,
                    fee_bps: config.fee_bps,
                    max_fee_bps: config.max_fee_bps,
                },
            )?;
            tracing::info!(
                router = %config.address,
                treasury = %config.treasury,
                fee_bps = config.fee_bps,
                max_fee_bps = config.max_fee_bps,
                "router deployed"
            );
            Ok::<_, Error>(())
        })?;

        Ok(router)
    }

    /// Router address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Deployer
    pub fn owner(&self) -> Address {
        self.access.owner()
    }

    /// Treasury principal
    pub fn treasury(&self) -> Address {
        self.access.treasury()
    }

    /// Id standing for the native asset in requests
    pub fn native_asset(&self) -> Address {
        self.custody.native_asset()
    }

    /// Router metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Committed fee parameters
    pub fn fee_config(&self, host: &Host) -> Result<FeeConfig> {
        host.read(|state| FeeConfig::load(state, self.address))
    }

    /// Settle a swap from the router's frame
    pub fn execute_swap(
        &self,
        cx: &mut CallContext<'_>,
        executor: Address,
        request: &SwapRequest,
        interactions: &[Interaction],
    ) -> Result<SettlementRecord> {
        let settlement = RouteSettlement::new(&self.custody, &self.guard, self.access.treasury());
        match settlement.execute(cx, executor, request, interactions) {
            Ok(record) => {
                self.metrics.record_swap(record.fee);
                Ok(record)
            }
            Err(err) => {
                self.metrics.record_failure();
                Err(err)
            }
        }
    }

    /// Change the current fee rate (treasury only)
    pub fn update_fee_parameters(&self, cx: &mut CallContext<'_>, new_fee_bps: u16) -> Result<()> {
        self.access.ensure_treasury(cx.caller())?;
        let _token = self.guard.enter()?;

        let mut fees = FeeConfig::load(cx.state(), self.address)?;
        let old_fee_bps = fees.update(new_fee_bps)?;
        fees.store(cx)?;

        cx.emit(
            "FeeParametersUpdated",
            &FeeParametersUpdated {
                old_fee_bps,
                new_fee_bps,
            },
        )?;
        tracing::info!(old_fee_bps, new_fee_bps, "fee parameters updated");
        Ok(())
    }

    /// Sweep the router's balances of `assets` to `recipient` (treasury only)
    pub fn collect_fees(&self, cx: &mut CallContext<'_>, assets: &[Address], recipient: Address) -> Result<Vec<Amount>> {
        self.access.ensure_treasury(cx.caller())?;
        let _token = self.guard.enter()?;

        let swept = self.custody.sweep(cx, assets, recipient)?;
        for (&asset, &amount) in assets.iter().zip(&swept) {
            if amount == 0 {
                continue;
            }
            cx.emit(
                "FeesCollected",
                &FeesCollected {
                    asset,
                    recipient,
                    amount,
                },
            )?;
            tracing::info!(%asset, %recipient, amount, "fees collected");
        }
        Ok(swept)
    }

    /// Settle a swap in its own transaction
    ///
    /// `value` native units travel from `caller` to the router with the call.
    pub fn swap(
        &self,
        host: &Host,
        caller: Address,
        value: Amount,
        executor: Address,
        request: &SwapRequest,
        interactions: &[Interaction],
    ) -> Result<SettlementRecord> {
        host.invoke(caller, self.address, value, |cx| {
            self.execute_swap(cx, executor, request, interactions)
        })
    }

    /// Change the fee rate in its own transaction
    pub fn update_fee(&self, host: &Host, caller: Address, new_fee_bps: u16) -> Result<()> {
        host.invoke(caller, self.address, 0, |cx| self.update_fee_parameters(cx, new_fee_bps))
    }

    /// Sweep balances in its own transaction
    pub fn collect(&self, host: &Host, caller: Address, assets: &[Address], recipient: Address) -> Result<Vec<Amount>> {
        host.invoke(caller, self.address, 0, |cx| self.collect_fees(cx, assets, recipient))
    }

    fn handle(&self, cx: &mut CallContext<'_>, call: RouterCall) -> Result<Vec<u8>> {
        let output = match call {
            RouterCall::ExecuteSwap {
                executor,
                request,
                interactions,
            } => bincode::serialize(&self.execute_swap(cx, executor, &request, &interactions)?)?,
            RouterCall::UpdateFeeParameters { new_fee_bps } => {
                self.update_fee_parameters(cx, new_fee_bps)?;
                Vec::new()
            }
            RouterCall::CollectFees { assets, recipient } => {
                bincode::serialize(&self.collect_fees(cx, &assets, recipient)?)?
            }
        };
        Ok(output)
    }
}

impl Contract for Router {
    fn call(&self, cx: &mut CallContext<'_>, payload: &[u8]) -> CallResult {
        let call = RouterCall::decode(payload)?;
        Ok(self.handle(cx, call)?)
    }
}
