//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact integer arithmetic (base units, no floating point)
//! - Cheap copies for identifiers

use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Amount of an asset in base units (e.g. 1e18 = one whole token)
pub type Amount = u128;

/// Account / contract / asset identifier (20 bytes)
///
/// Serializes as a `0x…` hex string in human-readable formats (TOML, JSON)
/// and as raw bytes in bincode.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive a deterministic address from a human label
    ///
    /// Used for test fixtures and well-known deployments.
    pub fn from_label(label: &str) -> Self {
        let hash = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash.as_bytes()[..20]);
        Self(bytes)
    }

    /// Derive the account address controlled by an Ed25519 public key
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"account:");
        hasher.update(public_key);
        let hash = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash.as_bytes()[..20]);
        Self(bytes)
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Is this the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(raw)
            .map_err(|e| crate::Error::InvalidAddress(format!("{}: {}", s, e)))?;
        let bytes: [u8; 20] = decoded
            .try_into()
            .map_err(|_| crate::Error::InvalidAddress(format!("{}: expected 20 bytes", s)))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            <[u8; 20]>::deserialize(deserializer).map(Address)
        }
    }
}

/// Convert base units into a human-readable decimal
///
/// `to_units(119_640_000_000_000_000_000, 18) == 119.64`
pub fn to_units(amount: Amount, decimals: u32) -> Option<Decimal> {
    let mantissa = i128::try_from(amount).ok()?;
    Decimal::try_from_i128_with_scale(mantissa, decimals)
        .ok()
        .map(|d| d.normalize())
}

/// Event emitted by a contract during a transaction
///
/// Logs live in ledger state, so they become visible only when the
/// transaction that emitted them commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Contract that emitted the event
    pub emitter: Address,

    /// Event name
    pub name: String,

    /// JSON-encoded event body
    pub data: String,
}

impl LogEntry {
    /// Build a log entry from a serializable body
    pub fn new<T: Serialize>(emitter: Address, name: impl Into<String>, body: &T) -> crate::Result<Self> {
        Ok(Self {
            emitter,
            name: name.into(),
            data: serde_json::to_string(body)?,
        })
    }

    /// Decode the event body
    pub fn decode<T: DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(serde_json::from_str(&self.data)?)
    }
}
