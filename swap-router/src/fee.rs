//! Fee parameters and the output split
//!
//! The fee configuration lives in the router's contract storage, so an
//! update commits or rolls back together with the transaction that made it.
//! It is written once at deployment and afterwards changed only through the
//! treasury-gated update path.

use crate::{Error, Result};
use ledger_core::{Address, Amount, CallContext, LedgerState};
use serde::{Deserialize, Serialize};

/// Basis points in one whole
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Default fee ceiling (0.5%)
pub const DEFAULT_MAX_FEE_BPS: u16 = 50;

/// Default fee rate (0.3%)
pub const DEFAULT_FEE_BPS: u16 = 30;

const STORAGE_KEY: &str = "fee_config";

/// Current fee rate and its ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    current_fee_bps: u16,
    max_fee_bps: u16,
}

/// Output divided between caller and treasury
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    /// Treasury share
    pub fee: Amount,
    /// Caller share
    pub payout: Amount,
}

impl FeeConfig {
    /// Create a configuration, checking `current <= max <= 10_000`
    pub fn new(current_fee_bps: u16, max_fee_bps: u16) -> Result<Self> {
        if max_fee_bps > BPS_DENOMINATOR {
            return Err(Error::Config(format!(
                "max fee {} bps exceeds {} bps",
                max_fee_bps, BPS_DENOMINATOR
            )));
        }
        if current_fee_bps > max_fee_bps {
            return Err(Error::FeeExceedsMax {
                fee_bps: current_fee_bps,
                max_fee_bps,
            });
        }
        Ok(Self {
            current_fee_bps,
            max_fee_bps,
        })
    }

    /// Current rate
    pub fn current_fee_bps(&self) -> u16 {
        self.current_fee_bps
    }

    /// Ceiling
    pub fn max_fee_bps(&self) -> u16 {
        self.max_fee_bps
    }

    /// Rate applied to a route: the override if given, else the current rate
    pub fn effective_fee_bps(&self, requested: Option<u16>) -> Result<u16> {
        let fee_bps = requested.unwrap_or(self.current_fee_bps);
        self.check(fee_bps)?;
        Ok(fee_bps)
    }

    /// Replace the current rate, returning the previous one
    pub fn update(&mut self, new_fee_bps: u16) -> Result<u16> {
        self.check(new_fee_bps)?;
        let old = self.current_fee_bps;
        self.current_fee_bps = new_fee_bps;
        Ok(old)
    }

    /// Read the configuration from `router`'s storage
    pub fn load(state: &LedgerState, router: Address) -> Result<Self> {
        state
            .storage_get(router, STORAGE_KEY)?
            .ok_or_else(|| Error::Config(format!("router {} has no fee parameters", router)))
    }

    /// Read the configuration if the router was initialized
    pub fn try_load(state: &LedgerState, router: Address) -> Result<Option<Self>> {
        Ok(state.storage_get(router, STORAGE_KEY)?)
    }

    /// Write the configuration into the storage of the executing router
    pub fn store(&self, cx: &mut CallContext<'_>) -> Result<()> {
        cx.storage_set(STORAGE_KEY, self)?;
        Ok(())
    }

    /// Split `measured` output at `fee_bps`
    ///
    /// `fee = floor(measured * fee_bps / 10_000)` without overflowing,
    /// and `fee + payout == measured`.
    pub fn split(measured: Amount, fee_bps: u16) -> FeeSplit {
        let denominator = Amount::from(BPS_DENOMINATOR);
        let rate = Amount::from(fee_bps.min(BPS_DENOMINATOR));

        let fee = (measured / denominator) * rate + (measured % denominator) * rate / denominator;
        FeeSplit {
            fee,
            payout: measured - fee,
        }
    }

    fn check(&self, fee_bps: u16) -> Result<()> {
        if fee_bps > self.max_fee_bps {
            return Err(Error::FeeExceedsMax {
                fee_bps,
                max_fee_bps: self.max_fee_bps,
            });
        }
        Ok(())
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            current_fee_bps: DEFAULT_FEE_BPS,
            max_fee_bps: DEFAULT_MAX_FEE_BPS,
        }
    }
}
