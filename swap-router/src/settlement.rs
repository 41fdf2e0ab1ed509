//! Route settlement
//!
//! Orchestrates one `ExecuteSwap` from the router's frame:
//!
//! 1. **Validate**: deadline, distinct assets, fee ceiling, call value
//! 2. **Lock**: take the reentrancy guard for the rest of the call
//! 3. **Pull**: take custody of the caller's input
//! 4. **Snapshot**: router balance of the output asset
//! 5. **Execute**: hand the input to the executor and let it run the route
//! 6. **Measure**: balance delta against the snapshot, checked against the floor
//! 7. **Settle**: split the output, pay the treasury and the caller
//! 8. **Record**: emit `SwapExecuted` and return the settlement record
//!
//! Any error leaves the transaction to roll back every mutation, including
//! those made by the executor and its interactions.

use crate::{
    custody::AssetCustody,
    fee::FeeConfig,
    guard::{ReentrancyGuard, ReentrancyToken},
    interaction::ExecuteRoute,
    types::{Interaction, SettlementRecord, SwapExecuted, SwapRequest},
    Error, Result,
};
use ledger_core::{Address, Amount, CallContext};
use uuid::Uuid;

/// Event name of a settlement
pub const SWAP_EXECUTED: &str = "SwapExecuted";

/// Per-call state, dropped (and the guard released) when the call ends
#[derive(Debug)]
pub struct ExecutionContext<'g> {
    /// Original caller
    pub caller: Address,
    /// Output asset balance of the router before execution
    pub pre_balance: Amount,
    /// Fee rate applied to this call
    pub fee_bps: u16,
    _token: ReentrancyToken<'g>,
}

/// Settlement orchestrator borrowing the router's parts
#[derive(Debug)]
pub struct RouteSettlement<'r> {
    custody: &'r AssetCustody,
    guard: &'r ReentrancyGuard,
    treasury: Address,
}

impl<'r> RouteSettlement<'r> {
    /// Create a settlement over the router's custody and guard
    pub fn new(custody: &'r AssetCustody, guard: &'r ReentrancyGuard, treasury: Address) -> Self {
        Self {
            custody,
            guard,
            treasury,
        }
    }

    /// Run one swap end to end
    pub fn execute(
        &self,
        cx: &mut CallContext<'_>,
        executor: Address,
        request: &SwapRequest,
        interactions: &[Interaction],
    ) -> Result<SettlementRecord> {
        let fee_bps = self.validate(cx, request)?;
        let token = self.guard.enter()?;

        self.custody.pull_input(cx, request)?;

        let ctx = ExecutionContext {
            caller: cx.caller(),
            pre_balance: self.custody.balance(cx, request.output_asset),
            fee_bps,
            _token: token,
        };

        self.run_executor(cx, executor, request, interactions)?;

        let measured = self.measure_output(cx, request, &ctx)?;
        let split = FeeConfig::split(measured, ctx.fee_bps);

        self.custody
            .pay_out(cx, request.output_asset, self.treasury, split.fee)?;
        self.custody
            .pay_out(cx, request.output_asset, ctx.caller, split.payout)?;

        cx.emit(
            SWAP_EXECUTED,
            &SwapExecuted {
                caller: ctx.caller,
                input_asset: request.input_asset,
                output_asset: request.output_asset,
                input_amount: request.input_amount,
                min_output: request.min_output_amount,
                payout: split.payout,
                fee: split.fee,
            },
        )?;

        tracing::info!(
            caller = %ctx.caller,
            route_id = request.route_id,
            measured,
            payout = split.payout,
            fee = split.fee,
            "swap settled"
        );

        Ok(SettlementRecord {
            settlement_id: Uuid::now_v7(),
            caller: ctx.caller,
            route_id: request.route_id,
            input_asset: request.input_asset,
            output_asset: request.output_asset,
            input_amount: request.input_amount,
            min_output: request.min_output_amount,
            measured_output: measured,
            payout: split.payout,
            fee: split.fee,
            fee_bps: ctx.fee_bps,
            settled_at: cx.timestamp(),
        })
    }

    /// Check the request before anything moves; returns the fee rate to apply
    pub fn validate(&self, cx: &CallContext<'_>, request: &SwapRequest) -> Result<u16> {
        let now = cx.timestamp();
        if now > request.deadline {
            return Err(Error::DeadlineExpired {
                deadline: request.deadline,
                now,
            });
        }

        // Compare what the ids resolve to: the native alias and the ledger's
        // native id name the same asset
        let input = self.custody.ledger_asset(cx, request.input_asset);
        let output = self.custody.ledger_asset(cx, request.output_asset);
        if input == output {
            return Err(Error::SameAsset {
                asset: request.input_asset,
            });
        }

        let fee_bps = FeeConfig::load(cx.state(), cx.address())?.effective_fee_bps(request.fee_bps)?;

        self.custody.check_value(cx, request)?;
        Ok(fee_bps)
    }

    fn run_executor(
        &self,
        cx: &mut CallContext<'_>,
        executor: Address,
        request: &SwapRequest,
        interactions: &[Interaction],
    ) -> Result<()> {
        let value = self.custody.delegate(cx, executor, request)?;
        let payload = ExecuteRoute {
            interactions: interactions.to_vec(),
            output_asset: self.custody.ledger_asset(cx, request.output_asset),
        }
        .encode()?;

        // The executor's reply is ignored; output is measured, not reported
        cx.call(executor, value, &payload).map_err(Error::from_revert)?;
        Ok(())
    }

    fn measure_output(&self, cx: &CallContext<'_>, request: &SwapRequest, ctx: &ExecutionContext<'_>) -> Result<Amount> {
        let measured = self
            .custody
            .balance(cx, request.output_asset)
            .saturating_sub(ctx.pre_balance);

        if measured < request.min_output_amount {
            return Err(Error::InsufficientOutput {
                measured,
                min: request.min_output_amount,
            });
        }
        Ok(measured)
    }
}
