//! Interactions and executors
//!
//! An executor is an untrusted contract that turns the input it was handed
//! into output held by the router. The router never asks it how much it
//! produced; it only measures its own balance afterwards.
//!
//! ```text
//!  Router ──call(ExecuteRoute)──▶ Executor
//!                                   │ InteractionRunner::run
//!                                   ├─ call(target₀, value₀, data₀)
//!                                   ├─ call(target₁, value₁, data₁)
//!                                   └─ ...
//! ```

use crate::{types::Interaction, Error, Result};
use ledger_core::{Address, CallContext, CallResult, Contract, Revert};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Payload the router sends to an executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRoute {
    /// Ordered sub-calls
    pub interactions: Vec<Interaction>,

    /// Ledger id of the asset the router expects back
    pub output_asset: Address,
}

impl ExecuteRoute {
    /// Encode as a call payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a call payload
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(payload)?)
    }
}

/// Capability of producing the output asset from delegated input
pub trait Executor: Send + Sync {
    /// Run a route from the executor's own frame
    ///
    /// `cx.caller()` is the router. `output_asset` may be ignored.
    fn execute_route(
        &self,
        cx: &mut CallContext<'_>,
        interactions: &[Interaction],
        output_asset: Address,
    ) -> std::result::Result<(), Revert>;

    /// Wrap the executor for deployment on a host
    fn into_contract(self) -> Arc<dyn Contract>
    where
        Self: Sized + 'static,
    {
        Arc::new(ExecutorContract(self))
    }
}

/// Contract adapter decoding `ExecuteRoute` payloads for an [`Executor`]
#[derive(Debug)]
pub struct ExecutorContract<E>(pub E);

impl<E: Executor> Contract for ExecutorContract<E> {
    fn call(&self, cx: &mut CallContext<'_>, payload: &[u8]) -> CallResult {
        let route = ExecuteRoute::decode(payload)?;
        self.0
            .execute_route(cx, &route.interactions, route.output_asset)?;
        Ok(Vec::new())
    }
}

/// Runs interactions in order, aborting on the first failure
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractionRunner;

impl InteractionRunner {
    /// Dispatch every interaction from the current frame
    pub fn run(cx: &mut CallContext<'_>, interactions: &[Interaction]) -> Result<()> {
        for (index, interaction) in interactions.iter().enumerate() {
            tracing::debug!(
                index,
                target = %interaction.target,
                value = interaction.value,
                "dispatching interaction"
            );
            cx.call(interaction.target, interaction.value, &interaction.call_data)
                .map_err(|revert| Self::failure(index, revert))?;
        }
        Ok(())
    }

    fn failure(index: usize, revert: Revert) -> Error {
        match revert.reason() {
            Some(reason) if !reason.is_empty() => Error::InteractionReverted { index, reason },
            _ => Error::SilentRevert { index: Some(index) },
        }
    }
}

/// Stock executor: runs the interactions, then returns its whole output
/// balance to the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractionExecutor;

impl Executor for InteractionExecutor {
    fn execute_route(
        &self,
        cx: &mut CallContext<'_>,
        interactions: &[Interaction],
        output_asset: Address,
    ) -> std::result::Result<(), Revert> {
        InteractionRunner::run(cx, interactions)?;

        let me = cx.address();
        let caller = cx.caller();
        let produced = cx.balance_of(output_asset, me);
        if produced > 0 {
            cx.transfer(output_asset, caller, produced)?;
        }
        Ok(())
    }
}
