//! The VM facade and its transaction issue path.

use std::sync::{Arc, Weak};

use alloy_primitives::U256;
use async_trait::async_trait;
use parking_lot::RwLock;
use snowfall_atomic::{Tx, TxError};
use snowfall_core::{ChainContext, Id, Rules, UpgradeSchedule};
use snowfall_eth::EthTxPool;
use snowfall_mempool::{Mempool, MempoolError};
use snowfall_p2p::{
    AppSender, BoxError, Clock, Network, NetworkError, NoopNetwork, PushNetwork, TxIssuer,
};
use thiserror::Error;
use tracing::debug;

use crate::config::{ConfigError, VmConfig};

#[derive(Debug, Error)]
pub enum VmError {
    #[error(transparent)]
    Tx(#[from] TxError),

    #[error(transparent)]
    Mempool(#[from] MempoolError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("insufficient spendable funds to construct export")]
    InsufficientSpendableFunds,

    #[error("vm is shutting down")]
    ShuttingDown,
}

/// A running VM instance.
pub struct Vm {
    ctx: ChainContext,
    upgrades: UpgradeSchedule,
    clock: Arc<dyn Clock>,
    mempool: Arc<Mempool>,
    eth_pool: Arc<dyn EthTxPool>,
    /// Base fee of the currently preferred block, fed by block processing.
    /// `None` until the first block under dynamic-fee rules.
    base_fee: RwLock<Option<U256>>,
    network: RwLock<Option<Arc<dyn Network>>>,
}

impl Vm {
    pub fn new(
        config: VmConfig,
        eth_pool: Arc<dyn EthTxPool>,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;
        let ctx = config.chain_context();
        let mempool = Arc::new(Mempool::new(ctx.native_asset_id, config.mempool_capacity));
        Ok(Arc::new(Self {
            ctx,
            upgrades: config.upgrades,
            clock,
            mempool,
            eth_pool,
            base_fee: RwLock::new(None),
            network: RwLock::new(None),
        }))
    }

    pub fn context(&self) -> &ChainContext {
        &self.ctx
    }

    pub fn mempool(&self) -> &Arc<Mempool> {
        &self.mempool
    }

    /// The rules in force right now.
    pub fn current_rules(&self) -> Rules {
        self.upgrades.rules_at(self.clock.now_unix())
    }

    /// Record the preferred block's base fee for semantic verification.
    pub fn set_base_fee(&self, base_fee: U256) {
        *self.base_fee.write() = Some(base_fee);
    }

    /// Build the gossip network for this VM: the push variant when the
    /// upgrade schedule carries a gossip activation time, the no-op
    /// variant otherwise.
    pub fn new_network(self: &Arc<Self>, app_sender: Arc<dyn AppSender>) -> Arc<dyn Network> {
        let network: Arc<dyn Network> = match self.upgrades.push_gossip_time {
            Some(activation_time) => Arc::new(PushNetwork::new(
                activation_time,
                app_sender,
                self.eth_pool.clone(),
                self.mempool.clone(),
                Arc::new(VmIssuer {
                    vm: Arc::downgrade(self),
                }),
                self.clock.clone(),
            )),
            None => Arc::new(NoopNetwork),
        };
        *self.network.write() = Some(network.clone());
        network
    }

    /// Verify and admit a transaction, gossiping it when locally issued.
    ///
    /// Local submissions surface every error to the caller. Remote
    /// submissions additionally mark failed ids as dropped so re-gossip of
    /// a known-bad transaction is ignored.
    pub async fn issue_tx(&self, tx: Tx, local: bool) -> Result<(), VmError> {
        if tx.signed_bytes().is_empty() {
            return Err(TxError::NilTx.into());
        }

        let rules = self.current_rules();
        let base_fee = *self.base_fee.read();
        if let Err(err) = tx.unsigned.semantic_verify(&tx, base_fee, &self.ctx, &rules) {
            if !local {
                self.mempool.mark_dropped(tx.id());
            }
            return Err(err.into());
        }

        let tx_id = tx.id();
        self.mempool.add_tx(tx.clone())?;
        debug!(tx = %tx_id, local, "atomic tx admitted to mempool");

        if local {
            let network = self.network.read().clone();
            if let Some(network) = network {
                network.gossip_atomic_tx(&tx).await?;
            }
        }
        Ok(())
    }

    /// Whether the mempool knows `id`, counting dropped marks.
    pub fn known_tx(&self, id: &Id) -> bool {
        let (tx, dropped) = self.mempool.get_tx(id);
        tx.is_some() || dropped
    }
}

/// The gossip handler's route into [`Vm::issue_tx`]. Holds the VM weakly
/// so a network that outlives its VM fails sends instead of leaking it.
struct VmIssuer {
    vm: Weak<Vm>,
}

#[async_trait]
impl TxIssuer for VmIssuer {
    async fn issue_tx(&self, tx: Tx, local: bool) -> Result<(), BoxError> {
        let Some(vm) = self.vm.upgrade() else {
            return Err(Box::new(VmError::ShuttingDown));
        };
        vm.issue_tx(tx, local).await.map_err(|err| Box::new(err) as BoxError)
    }
}
