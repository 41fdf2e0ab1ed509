//! Asset gateway: ledger token operations as a callable contract
//!
//! Balances live in `LedgerState`, not in per-token contracts. The gateway,
//! deployed by every host at [`ASSET_GATEWAY`], lets contract code (and
//! opaque interaction payloads) move assets on behalf of the *calling*
//! contract.

use crate::{
    host::{CallContext, CallResult, Contract},
    types::{Address, Amount},
    Error, Result,
};
use serde::{Deserialize, Serialize};

/// Well-known address of the asset gateway
pub const ASSET_GATEWAY: Address = Address::from_bytes([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x0a, 0x55,
]);

/// Operation performed for the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetCall {
    /// Move the caller's funds
    Transfer {
        /// Asset
        asset: Address,
        /// Recipient
        to: Address,
        /// Amount
        amount: Amount,
    },

    /// Set an allowance over the caller's funds
    Approve {
        /// Asset
        asset: Address,
        /// Spender
        spender: Address,
        /// Allowance
        amount: Amount,
    },

    /// Spend an allowance granted to the caller
    TransferFrom {
        /// Asset
        asset: Address,
        /// Owner of the funds
        owner: Address,
        /// Recipient
        to: Address,
        /// Amount
        amount: Amount,
    },
}

impl AssetCall {
    /// Encode as a call payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a call payload
    pub fn decode(payload: &[u8]) -> Result<Self> {
        bincode::deserialize(payload)
            .map_err(|e| Error::Serialization(format!("malformed asset call: {}", e)))
    }
}

/// Gateway contract
#[derive(Debug, Default, Clone, Copy)]
pub struct AssetGateway;

impl Contract for AssetGateway {
    fn call(&self, cx: &mut CallContext<'_>, payload: &[u8]) -> CallResult {
        let caller = cx.caller();

        match AssetCall::decode(payload)? {
            AssetCall::Transfer { asset, to, amount } => {
                cx.state_mut().transfer(asset, caller, to, amount)?;
            }
            AssetCall::Approve {
                asset,
                spender,
                amount,
            } => {
                cx.state_mut().approve(asset, caller, spender, amount);
            }
            AssetCall::TransferFrom {
                asset,
                owner,
                to,
                amount,
            } => {
                cx.state_mut().transfer_from(asset, caller, owner, to, amount)?;
            }
        }

        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, Host, Revert};

    #[test]
    fn test_gateway_is_deployed_by_host() {
        let host = Host::new(Config::default());
        assert!(host.contract(ASSET_GATEWAY).is_some());
    }

    #[test]
    fn test_transfer_acts_for_caller() {
        let host = Host::new(Config::default());
        let token = Address::from_label("DAI");
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        host.mint(token, alice, 100).unwrap();

        let call = AssetCall::Transfer {
            asset: token,
            to: bob,
            amount: 60,
        };
        host.submit(alice, ASSET_GATEWAY, 0, &call.encode().unwrap()).unwrap();

        assert_eq!(host.balance_of(token, alice), 40);
        assert_eq!(host.balance_of(token, bob), 60);
    }

    #[test]
    fn test_transfer_from_needs_allowance() {
        let host = Host::new(Config::default());
        let token = Address::from_label("DAI");
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        host.mint(token, alice, 100).unwrap();

        let call = AssetCall::TransferFrom {
            asset: token,
            owner: alice,
            to: bob,
            amount: 10,
        };
        let err = host
            .submit(bob, ASSET_GATEWAY, 0, &call.encode().unwrap())
            .unwrap_err();
        assert!(matches!(
            err.downcast::<Error>(),
            Ok(Error::InsufficientAllowance { .. })
        ));

        host.approve(token, alice, bob, 10).unwrap();
        host.submit(bob, ASSET_GATEWAY, 0, &call.encode().unwrap()).unwrap();
        assert_eq!(host.balance_of(token, bob), 10);
    }

    #[test]
    fn test_garbage_payload_reverts() {
        let host = Host::new(Config::default());
        let err = host
            .submit(Address::from_label("alice"), ASSET_GATEWAY, 0, &[0xde, 0xad])
            .unwrap_err();
        assert!(matches!(err, Revert::Custom(_)));
    }
}
