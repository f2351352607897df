//! Per-asset flow conservation.

use std::collections::HashMap;

use snowfall_core::math::add64;
use snowfall_core::Id;

use crate::error::TxError;

/// Tracks produced and consumed amounts per asset and verifies they
/// balance exactly. Fees are modeled as produced amounts of the native
/// asset.
#[derive(Debug, Default)]
pub struct FlowChecker {
    produced: HashMap<Id, u64>,
    consumed: HashMap<Id, u64>,
}

impl FlowChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn produce(&mut self, asset_id: Id, amount: u64) -> Result<(), TxError> {
        let entry = self.produced.entry(asset_id).or_insert(0);
        *entry = add64(*entry, amount)?;
        Ok(())
    }

    pub fn consume(&mut self, asset_id: Id, amount: u64) -> Result<(), TxError> {
        let entry = self.consumed.entry(asset_id).or_insert(0);
        *entry = add64(*entry, amount)?;
        Ok(())
    }

    /// Every asset must balance: consumed == produced.
    pub fn verify(&self) -> Result<(), TxError> {
        let mut assets: Vec<Id> = self
            .produced
            .keys()
            .chain(self.consumed.keys())
            .copied()
            .collect();
        assets.sort();
        assets.dedup();

        for asset_id in assets {
            let produced = self.produced.get(&asset_id).copied().unwrap_or(0);
            let consumed = self.consumed.get(&asset_id).copied().unwrap_or(0);
            if produced != consumed {
                return Err(TxError::UnbalancedFlow {
                    asset_id,
                    consumed,
                    produced,
                });
            }
        }
        Ok(())
    }
}
