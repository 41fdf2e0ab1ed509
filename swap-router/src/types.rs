//! Core types for the swap router

use crate::Result;
use ledger_core::{Address, Amount, SignedPermit};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A caller's declared intent for one settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Asset the caller gives
    pub input_asset: Address,

    /// Asset the caller receives
    pub output_asset: Address,

    /// Amount of input pulled from the caller
    pub input_amount: Amount,

    /// Smallest acceptable output before fees
    pub min_output_amount: Amount,

    /// Last valid second (unix)
    pub deadline: u64,

    /// Per-route fee override; `None` uses the router's current fee
    pub fee_bps: Option<u16>,

    /// Caller-chosen route identifier, echoed in the settlement record
    pub route_id: u64,

    /// Encoded `SignedPermit`; empty when a standing allowance is used
    #[serde(with = "serde_bytes")]
    pub permit_data: Vec<u8>,
}

impl SwapRequest {
    /// Request with the router's current fee and no permit
    pub fn new(
        input_asset: Address,
        output_asset: Address,
        input_amount: Amount,
        min_output_amount: Amount,
        deadline: u64,
    ) -> Self {
        Self {
            input_asset,
            output_asset,
            input_amount,
            min_output_amount,
            deadline,
            fee_bps: None,
            route_id: 0,
            permit_data: Vec::new(),
        }
    }

    /// Override the fee rate for this route
    pub fn with_fee_bps(mut self, fee_bps: u16) -> Self {
        self.fee_bps = Some(fee_bps);
        self
    }

    /// Tag the route
    pub fn with_route_id(mut self, route_id: u64) -> Self {
        self.route_id = route_id;
        self
    }

    /// Attach a signed permit for the input asset
    pub fn with_permit(mut self, permit: &SignedPermit) -> Result<Self> {
        self.permit_data = permit.encode()?;
        Ok(self)
    }

    /// Whether the request carries a permit
    pub fn has_permit(&self) -> bool {
        !self.permit_data.is_empty()
    }
}

/// One opaque sub-call of a route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Contract to call
    pub target: Address,

    /// Native value forwarded with the call
    pub value: Amount,

    /// Payload handed to the target untouched
    #[serde(with = "serde_bytes")]
    pub call_data: Vec<u8>,
}

impl Interaction {
    /// Create an interaction without native value
    pub fn new(target: Address, call_data: Vec<u8>) -> Self {
        Self {
            target,
            value: 0,
            call_data,
        }
    }

    /// Forward native value with the call
    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

/// Router call surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterCall {
    /// Settle a route through `executor`
    ExecuteSwap {
        /// Executor contract
        executor: Address,
        /// Swap intent
        request: SwapRequest,
        /// Ordered sub-calls for the executor
        interactions: Vec<Interaction>,
    },

    /// Change the current fee (treasury only)
    UpdateFeeParameters {
        /// New rate in basis points
        new_fee_bps: u16,
    },

    /// Sweep router balances (treasury only)
    CollectFees {
        /// Assets to sweep
        assets: Vec<Address>,
        /// Destination
        recipient: Address,
    },
}

impl RouterCall {
    /// Encode as a call payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a call payload
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(payload)?)
    }
}

/// Outcome of a successful settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    /// Unique settlement ID (UUIDv7)
    pub settlement_id: Uuid,

    /// Original caller
    pub caller: Address,

    /// Route identifier from the request
    pub route_id: u64,

    /// Input asset
    pub input_asset: Address,

    /// Output asset
    pub output_asset: Address,

    /// Input pulled from the caller
    pub input_amount: Amount,

    /// Caller's floor
    pub min_output: Amount,

    /// Router balance delta of the output asset
    pub measured_output: Amount,

    /// Amount forwarded to the caller
    pub payout: Amount,

    /// Amount forwarded to the treasury
    pub fee: Amount,

    /// Fee rate applied
    pub fee_bps: u16,

    /// Ledger time of settlement
    pub settled_at: u64,
}

/// Event: one successful settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapExecuted {
    /// Original caller
    pub caller: Address,
    /// Input asset
    pub input_asset: Address,
    /// Output asset
    pub output_asset: Address,
    /// Input amount
    #[serde(with = "amount_str")]
    pub input_amount: Amount,
    /// Caller's floor
    #[serde(with = "amount_str")]
    pub min_output: Amount,
    /// Amount paid to the caller
    #[serde(with = "amount_str")]
    pub payout: Amount,
    /// Amount paid to the treasury
    #[serde(with = "amount_str")]
    pub fee: Amount,
}

/// Event: fee rate changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeParametersUpdated {
    /// Previous rate
    pub old_fee_bps: u16,
    /// New rate
    pub new_fee_bps: u16,
}

/// Event: router balance swept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeesCollected {
    /// Swept asset
    pub asset: Address,
    /// Destination
    pub recipient: Address,
    /// Amount swept
    #[serde(with = "amount_str")]
    pub amount: Amount,
}

/// Event: router initialized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterDeployed {
    /// Deployer
    pub owner: Address,
    /// Fee recipient and administrator
    pub treasury: Address,
    /// Asset id standing for the native asset in requests
    pub native_asset: Address,
    /// Initial fee rate
    pub fee_bps: u16,
    /// Fee ceiling
    pub max_fee_bps: u16,
}

/// JSON numbers lose precision above 2^53; amounts travel as decimal strings
mod amount_str {
    use ledger_core::Amount;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}
