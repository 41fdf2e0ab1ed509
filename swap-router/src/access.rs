//! Treasury-only authorization

use crate::{Error, Result};
use ledger_core::Address;
use serde::{Deserialize, Serialize};

/// Principals fixed at deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    /// Deployer; recorded for provenance only
    owner: Address,

    /// Fee recipient, sole administrator of fees and sweeps
    treasury: Address,
}

impl AccessControl {
    /// Create access control for a router
    pub fn new(owner: Address, treasury: Address) -> Self {
        Self { owner, treasury }
    }

    /// Deployer
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Treasury principal
    pub fn treasury(&self) -> Address {
        self.treasury
    }

    /// Fail with `Unauthorized` unless `caller` is the treasury
    pub fn ensure_treasury(&self, caller: Address) -> Result<()> {
        if caller != self.treasury {
            tracing::warn!(%caller, treasury = %self.treasury, "treasury call rejected");
            return Err(Error::Unauthorized { caller });
        }
        Ok(())
    }
}
