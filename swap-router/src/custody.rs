//! Asset custody: pulling input from the caller and paying output out
//!
//! Requests name assets by id. The router's configured native asset id
//! stands for the ledger's native asset, the one that travels as call value;
//! every other id is a token moved through balances and allowances.

use crate::{types::SwapRequest, Error, Result};
use ledger_core::{Address, Amount, CallContext, SignedPermit};

/// Custody operations performed from the router's own frame
#[derive(Debug, Clone, Copy)]
pub struct AssetCustody {
    native_asset: Address,
}

impl AssetCustody {
    /// Create custody with the id that denotes the native asset in requests
    pub fn new(native_asset: Address) -> Self {
        Self { native_asset }
    }

    /// Id denoting the native asset in requests
    pub fn native_asset(&self) -> Address {
        self.native_asset
    }

    /// Whether `asset` denotes the native asset
    pub fn is_native(&self, asset: Address) -> bool {
        asset == self.native_asset
    }

    /// Ledger asset id behind a request asset
    pub fn ledger_asset(&self, cx: &CallContext<'_>, asset: Address) -> Address {
        if self.is_native(asset) {
            cx.native_asset()
        } else {
            asset
        }
    }

    /// Check the call value against the request
    ///
    /// Native input must arrive as exactly `input_amount`; token input must
    /// arrive with no value at all.
    pub fn check_value(&self, cx: &CallContext<'_>, request: &SwapRequest) -> Result<()> {
        let expected = if self.is_native(request.input_asset) {
            request.input_amount
        } else {
            0
        };
        if cx.value() != expected {
            return Err(Error::ValueMismatch {
                expected,
                received: cx.value(),
            });
        }
        Ok(())
    }

    /// Take custody of the caller's input
    ///
    /// Native input already arrived with the call. Tokens are pulled from the
    /// caller's allowance, installed first from the request's permit when one
    /// is attached.
    pub fn pull_input(&self, cx: &mut CallContext<'_>, request: &SwapRequest) -> Result<()> {
        self.check_value(cx, request)?;
        if self.is_native(request.input_asset) {
            return Ok(());
        }

        let caller = cx.caller();
        let router = cx.address();
        let asset = request.input_asset;

        if request.has_permit() {
            let signed = SignedPermit::decode(&request.permit_data)?;
            let permit = &signed.permit;
            if permit.owner != caller || permit.spender != router || permit.asset != asset {
                return Err(ledger_core::Error::InvalidPermit(format!(
                    "permit grants {} of {} from {} to {}, expected {} from {} to {}",
                    permit.value, permit.asset, permit.owner, permit.spender, asset, caller, router
                ))
                .into());
            }
            cx.permit(&signed)?;
        }

        cx.transfer_from(asset, caller, router, request.input_amount)?;
        tracing::debug!(%caller, %asset, amount = request.input_amount, "input pulled");
        Ok(())
    }

    /// Router's balance of a request asset
    pub fn balance(&self, cx: &CallContext<'_>, asset: Address) -> Amount {
        let ledger_asset = self.ledger_asset(cx, asset);
        cx.balance_of(ledger_asset, cx.address())
    }

    /// Hand the pulled input to `executor`
    ///
    /// Tokens are transferred up front. Native input cannot be transferred
    /// outside a call, so its amount is returned to be sent as call value.
    pub fn delegate(&self, cx: &mut CallContext<'_>, executor: Address, request: &SwapRequest) -> Result<Amount> {
        if self.is_native(request.input_asset) {
            return Ok(request.input_amount);
        }
        cx.transfer(request.input_asset, executor, request.input_amount)?;
        tracing::debug!(%executor, asset = %request.input_asset, amount = request.input_amount, "input delegated");
        Ok(0)
    }

    /// Pay `amount` of a request asset from the router to `to`; zero is a no-op
    pub fn pay_out(&self, cx: &mut CallContext<'_>, asset: Address, to: Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let ledger_asset = self.ledger_asset(cx, asset);
        cx.transfer(ledger_asset, to, amount)?;
        tracing::debug!(%to, asset = %ledger_asset, amount, "paid out");
        Ok(())
    }

    /// Move the router's whole balance of each asset to `recipient`
    ///
    /// Returns the amount moved per listed asset, in order.
    pub fn sweep(&self, cx: &mut CallContext<'_>, assets: &[Address], recipient: Address) -> Result<Vec<Amount>> {
        let mut swept = Vec::with_capacity(assets.len());
        for &asset in assets {
            let amount = self.balance(cx, asset);
            self.pay_out(cx, asset, recipient, amount)?;
            swept.push(amount);
        }
        Ok(swept)
    }
}
