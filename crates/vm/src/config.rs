//! VM configuration.

use serde::Deserialize;
use snowfall_core::params::DEFAULT_FLAT_FEE;
use snowfall_core::{ChainContext, Id, ScheduleError, UpgradeSchedule};
use thiserror::Error;

/// Root configuration for a VM instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VmConfig {
    /// Id of the network this VM participates in. Must be > 0.
    pub network_id: u32,

    /// Id of the blockchain this VM runs.
    pub chain_id: Id,

    /// Id of the chain exports are sent to.
    pub destination_chain_id: Id,

    /// Asset id of the native token.
    pub native_asset_id: Id,

    /// Flat transaction fee in native base units, used until the
    /// dynamic-fee upgrade activates.
    #[serde(default = "VmConfig::default_flat_fee")]
    pub flat_fee: u64,

    /// Network upgrade activation times.
    #[serde(default)]
    pub upgrades: UpgradeSchedule,

    /// Maximum number of atomic transactions held in the mempool.
    #[serde(default = "VmConfig::default_mempool_capacity")]
    pub mempool_capacity: usize,
}

impl VmConfig {
    const fn default_flat_fee() -> u64 {
        DEFAULT_FLAT_FEE
    }

    const fn default_mempool_capacity() -> usize {
        4096
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network_id == 0 {
            return Err(ConfigError::ZeroNetworkId);
        }
        if self.chain_id.is_zero()
            || self.destination_chain_id.is_zero()
            || self.native_asset_id.is_zero()
        {
            return Err(ConfigError::ZeroId);
        }
        if self.chain_id == self.destination_chain_id {
            return Err(ConfigError::SelfExport);
        }
        if self.mempool_capacity == 0 {
            return Err(ConfigError::ZeroMempoolCapacity);
        }
        self.upgrades.validate()?;
        Ok(())
    }

    pub fn chain_context(&self) -> ChainContext {
        ChainContext {
            network_id: self.network_id,
            chain_id: self.chain_id,
            destination_chain_id: self.destination_chain_id,
            native_asset_id: self.native_asset_id,
            flat_fee: self.flat_fee,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("network id must be nonzero")]
    ZeroNetworkId,

    #[error("chain, destination, and asset ids must be nonzero")]
    ZeroId,

    #[error("destination chain id must differ from the chain id")]
    SelfExport,

    #[error("mempool capacity must be positive")]
    ZeroMempoolCapacity,

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}
