//! Ledger state: balances, allowances, permit nonces, contract storage, logs
//!
//! `LedgerState` is a plain value. The host forks its tables into a working
//! copy at the start of every top-level transaction and adopts the copy only
//! when the transaction succeeds, so every method here can mutate freely
//! without worrying about partial failure. The event log is not copied: a
//! working copy collects only its own events, appended to the retained log
//! on commit.
//!
//! # Invariants
//!
//! - Supply conservation: Σ(balances of an asset) == supply of that asset
//! - Transfers never create or destroy value
//! - Allowances only shrink through `transfer_from`

use crate::{
    permit::SignedPermit,
    types::{Address, Amount, LogEntry},
    Error, Result,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;

/// Allowance value treated as unlimited (never decremented)
pub const UNLIMITED_ALLOWANCE: Amount = Amount::MAX;

/// Complete ledger state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// (asset, account) → balance
    balances: HashMap<(Address, Address), Amount>,

    /// asset → total supply
    supplies: HashMap<Address, Amount>,

    /// (asset, owner, spender) → allowance
    allowances: HashMap<(Address, Address, Address), Amount>,

    /// owner → next permit nonce
    nonces: HashMap<Address, u64>,

    /// (contract, key) → bincode-encoded value
    storage: HashMap<(Address, String), Vec<u8>>,

    /// Emitted events, in emission order
    logs: Vec<LogEntry>,
}

impl LedgerState {
    /// Create empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `account` in `asset`
    pub fn balance_of(&self, asset: Address, account: Address) -> Amount {
        self.balances.get(&(asset, account)).copied().unwrap_or(0)
    }

    /// Total supply of `asset`
    pub fn total_supply(&self, asset: Address) -> Amount {
        self.supplies.get(&asset).copied().unwrap_or(0)
    }

    /// Create new units of `asset` in `to`
    pub fn mint(&mut self, asset: Address, to: Address, amount: Amount) -> Result<()> {
        let supply = self
            .total_supply(asset)
            .checked_add(amount)
            .ok_or(Error::BalanceOverflow { asset, account: to })?;
        self.credit(asset, to, amount)?;
        self.supplies.insert(asset, supply);
        Ok(())
    }

    /// Destroy units of `asset` held by `from`
    pub fn burn(&mut self, asset: Address, from: Address, amount: Amount) -> Result<()> {
        self.debit(asset, from, amount)?;
        let supply = self.total_supply(asset).saturating_sub(amount);
        self.supplies.insert(asset, supply);
        Ok(())
    }

    /// Move `amount` of `asset` from `from` to `to`
    pub fn transfer(&mut self, asset: Address, from: Address, to: Address, amount: Amount) -> Result<()> {
        self.debit(asset, from, amount)?;
        self.credit(asset, to, amount)
    }

    /// Set the allowance of `spender` over `owner`'s `asset`
    pub fn approve(&mut self, asset: Address, owner: Address, spender: Address, amount: Amount) {
        if amount == 0 {
            self.allowances.remove(&(asset, owner, spender));
        } else {
            self.allowances.insert((asset, owner, spender), amount);
        }
    }

    /// Current allowance of `spender` over `owner`'s `asset`
    pub fn allowance(&self, asset: Address, owner: Address, spender: Address) -> Amount {
        self.allowances
            .get(&(asset, owner, spender))
            .copied()
            .unwrap_or(0)
    }

    /// Move `owner`'s funds on behalf of `spender`, consuming allowance
    pub fn transfer_from(
        &mut self,
        asset: Address,
        spender: Address,
        owner: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let available = self.allowance(asset, owner, spender);
        if available < amount {
            return Err(Error::InsufficientAllowance {
                asset,
                owner,
                spender,
                available,
                required: amount,
            });
        }

        self.transfer(asset, owner, to, amount)?;

        if available != UNLIMITED_ALLOWANCE {
            self.approve(asset, owner, spender, available - amount);
        }
        Ok(())
    }

    /// Next unused permit nonce of `owner`
    pub fn nonce(&self, owner: Address) -> u64 {
        self.nonces.get(&owner).copied().unwrap_or(0)
    }

    /// Verify a signed permit and install its allowance
    ///
    /// Consumes the owner's nonce. `now` is the ledger time in unix seconds.
    pub fn permit(&mut self, signed: &SignedPermit, now: u64) -> Result<()> {
        let permit = &signed.permit;

        if permit.deadline < now {
            return Err(Error::PermitExpired {
                deadline: permit.deadline,
                now,
            });
        }

        let expected_nonce = self.nonce(permit.owner);
        if permit.nonce != expected_nonce {
            return Err(Error::InvalidPermit(format!(
                "nonce {} does not match expected {}",
                permit.nonce, expected_nonce
            )));
        }

        signed.verify()?;

        self.nonces.insert(permit.owner, expected_nonce + 1);
        self.approve(permit.asset, permit.owner, permit.spender, permit.value);
        Ok(())
    }

    /// Read a typed value from a contract's storage
    pub fn storage_get<T: DeserializeOwned>(&self, contract: Address, key: &str) -> Result<Option<T>> {
        match self.storage.get(&(contract, key.to_string())) {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// Write a typed value into a contract's storage
    pub fn storage_set<T: Serialize>(&mut self, contract: Address, key: &str, value: &T) -> Result<()> {
        let bytes = bincode::serialize(value)?;
        self.storage.insert((contract, key.to_string()), bytes);
        Ok(())
    }

    /// Append an event
    pub fn emit(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    /// Copy of the tables without the event log
    ///
    /// Working copies start from a fork, so their log holds only the events
    /// of the running transaction.
    pub(crate) fn fork(&self) -> Self {
        Self {
            balances: self.balances.clone(),
            supplies: self.supplies.clone(),
            allowances: self.allowances.clone(),
            nonces: self.nonces.clone(),
            storage: self.storage.clone(),
            logs: Vec::new(),
        }
    }

    /// Roll the tables back to `saved` and drop events past `log_len`
    pub(crate) fn restore(&mut self, saved: LedgerState, log_len: usize) {
        let mut logs = std::mem::take(&mut self.logs);
        logs.truncate(log_len);
        *self = saved;
        self.logs = logs;
    }

    /// Adopt a finished working copy
    ///
    /// Its tables replace ours and its events are appended to the log, which
    /// then keeps at most `retention` entries (0 keeps everything).
    pub(crate) fn commit(&mut self, working: LedgerState, retention: usize) {
        let mut logs = std::mem::take(&mut self.logs);
        let LedgerState {
            balances,
            supplies,
            allowances,
            nonces,
            storage,
            logs: emitted,
        } = working;
        logs.extend(emitted);
        if retention > 0 && logs.len() > retention {
            let excess = logs.len() - retention;
            logs.drain(..excess);
        }

        *self = Self {
            balances,
            supplies,
            allowances,
            nonces,
            storage,
            logs,
        };
    }

    /// Retained events, in emission order
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    /// Events with the given emitter and name
    pub fn logs_named<'a>(&'a self, emitter: Address, name: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.logs
            .iter()
            .filter(move |log| log.emitter == emitter && log.name == name)
    }

    fn debit(&mut self, asset: Address, account: Address, amount: Amount) -> Result<()> {
        let available = self.balance_of(asset, account);
        if available < amount {
            return Err(Error::InsufficientBalance {
                asset,
                account,
                available,
                required: amount,
            });
        }

        let remaining = available - amount;
        if remaining == 0 {
            self.balances.remove(&(asset, account));
        } else {
            self.balances.insert((asset, account), remaining);
        }
        Ok(())
    }

    fn credit(&mut self, asset: Address, account: Address, amount: Amount) -> Result<()> {
        let updated = self
            .balance_of(asset, account)
            .checked_add(amount)
            .ok_or(Error::BalanceOverflow { asset, account })?;
        if updated != 0 {
            self.balances.insert((asset, account), updated);
        }
        Ok(())
    }

    /// Sum of all balances of `asset` (for conservation checks)
    pub fn sum_balances(&self, asset: Address) -> Amount {
        self.balances
            .iter()
            .filter(|((a, _), _)| *a == asset)
            .map(|(_, amount)| *amount)
            .sum()
    }
}
