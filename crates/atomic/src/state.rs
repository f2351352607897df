//! EVM state access consumed by the state transfer.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use snowfall_core::Id;

/// The slice of EVM state an export touches.
///
/// Balances are in wei. Non-native assets live in per-account multi-coin
/// balances keyed by `(address, asset)` and are not scaled.
pub trait StateDb {
    fn balance(&self, address: Address) -> U256;
    fn sub_balance(&mut self, address: Address, amount: U256);

    fn multicoin_balance(&self, address: Address, asset_id: Id) -> U256;
    fn sub_multicoin_balance(&mut self, address: Address, asset_id: Id, amount: U256);

    fn nonce(&self, address: Address) -> u64;
    fn set_nonce(&mut self, address: Address, nonce: u64);
}

/// In-memory state, for tests and local transaction building.
#[derive(Debug, Default, Clone)]
pub struct MemStateDb {
    balances: HashMap<Address, U256>,
    multicoin: HashMap<(Address, Id), U256>,
    nonces: HashMap<Address, u64>,
}

impl MemStateDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&mut self, address: Address, amount: U256) {
        self.balances.insert(address, amount);
    }

    pub fn set_multicoin_balance(&mut self, address: Address, asset_id: Id, amount: U256) {
        self.multicoin.insert((address, asset_id), amount);
    }
}

impl StateDb for MemStateDb {
    fn balance(&self, address: Address) -> U256 {
        self.balances.get(&address).copied().unwrap_or(U256::ZERO)
    }

    fn sub_balance(&mut self, address: Address, amount: U256) {
        let entry = self.balances.entry(address).or_insert(U256::ZERO);
        *entry = entry.saturating_sub(amount);
    }

    fn multicoin_balance(&self, address: Address, asset_id: Id) -> U256 {
        self.multicoin
            .get(&(address, asset_id))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn sub_multicoin_balance(&mut self, address: Address, asset_id: Id, amount: U256) {
        let entry = self.multicoin.entry((address, asset_id)).or_insert(U256::ZERO);
        *entry = entry.saturating_sub(amount);
    }

    fn nonce(&self, address: Address) -> u64 {
        self.nonces.get(&address).copied().unwrap_or(0)
    }

    fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.nonces.insert(address, nonce);
    }
}
