//! The gossip network capability.
//!
//! Two implementations: [`PushNetwork`], active once the push-gossip
//! upgrade has an activation time, and [`NoopNetwork`] for networks where
//! it never activates. Before the activation instant, every entry point of
//! the push network is a successful no-op as well, so nodes upgraded early
//! stay silent until the whole network flips.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use snowfall_atomic::Tx;
use snowfall_core::params::RECENT_CACHE_SIZE;
use snowfall_core::{Id, NodeId};
use snowfall_eth::{encode_batch, EthTxPool, TxEnvelope, TxStatus};
use snowfall_mempool::Mempool;
use thiserror::Error;
use tracing::{debug, warn};

use crate::handler::{GossipHandler, TxIssuer};
use crate::message::{Message, MessageError, ETH_TXS_SOFT_CAP_SIZE};
use crate::recent::RecentSet;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SenderError {
    #[error("transport is shutting down")]
    Closed,

    #[error("transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Sender(#[from] SenderError),
}

/// The transport's outbound gossip primitive. Fire-and-forget: the send
/// queues on the transport and returns without waiting for delivery.
#[async_trait]
pub trait AppSender: Send + Sync {
    async fn send_app_gossip(&self, bytes: Vec<u8>) -> Result<(), SenderError>;
}

/// Wall-clock source, a seam so activation gating is testable.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// The network capability: four transport callbacks in, two gossip entry
/// points out.
#[async_trait]
pub trait Network: Send + Sync {
    async fn app_request(
        &self,
        node_id: NodeId,
        request_id: u32,
        msg: Vec<u8>,
    ) -> Result<(), NetworkError>;

    async fn app_response(
        &self,
        node_id: NodeId,
        request_id: u32,
        msg: Vec<u8>,
    ) -> Result<(), NetworkError>;

    async fn app_request_failed(
        &self,
        node_id: NodeId,
        request_id: u32,
    ) -> Result<(), NetworkError>;

    async fn app_gossip(&self, node_id: NodeId, msg: Vec<u8>) -> Result<(), NetworkError>;

    async fn gossip_atomic_tx(&self, tx: &Tx) -> Result<(), NetworkError>;

    async fn gossip_eth_txs(&self, txs: Vec<TxEnvelope>) -> Result<(), NetworkError>;
}

/// Push-gossip network.
pub struct PushNetwork {
    gossip_activation_time: u64,
    app_sender: Arc<dyn AppSender>,
    eth_pool: Arc<dyn EthTxPool>,
    handler: GossipHandler,
    // Suppress re-gossip of the same transaction in a short window. Both
    // sets are hints; eviction only costs a redundant broadcast.
    recent_atomic_txs: Mutex<RecentSet<Id>>,
    recent_eth_txs: Mutex<RecentSet<alloy_primitives::B256>>,
    clock: Arc<dyn Clock>,
}

impl PushNetwork {
    pub fn new(
        gossip_activation_time: u64,
        app_sender: Arc<dyn AppSender>,
        eth_pool: Arc<dyn EthTxPool>,
        mempool: Arc<Mempool>,
        issuer: Arc<dyn TxIssuer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gossip_activation_time,
            app_sender,
            eth_pool: eth_pool.clone(),
            handler: GossipHandler::new(mempool, eth_pool, issuer),
            recent_atomic_txs: Mutex::new(RecentSet::new(RECENT_CACHE_SIZE)),
            recent_eth_txs: Mutex::new(RecentSet::new(RECENT_CACHE_SIZE)),
            clock,
        }
    }

    fn pre_activation(&self) -> bool {
        self.clock.now_unix() < self.gossip_activation_time
    }

    /// Encode and send one EthTxs batch. Build failures are logged and
    /// dropped; only transport errors propagate.
    async fn send_eth_txs(&self, txs: &[TxEnvelope]) -> Result<(), NetworkError> {
        if txs.is_empty() {
            return Ok(());
        }

        let encoded = encode_batch(txs);
        let msg = Message::EthTxs { txs: encoded };
        let bytes = match msg.build() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(count = txs.len(), %err, "failed to build eth txs message");
                return Ok(());
            }
        };

        debug!(count = txs.len(), size = bytes.len(), "gossiping eth txs");
        Ok(self.app_sender.send_app_gossip(bytes).await?)
    }
}

#[async_trait]
impl Network for PushNetwork {
    async fn app_request(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _msg: Vec<u8>,
    ) -> Result<(), NetworkError> {
        Ok(())
    }

    async fn app_response(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _msg: Vec<u8>,
    ) -> Result<(), NetworkError> {
        Ok(())
    }

    async fn app_request_failed(
        &self,
        _node_id: NodeId,
        _request_id: u32,
    ) -> Result<(), NetworkError> {
        Ok(())
    }

    async fn app_gossip(&self, node_id: NodeId, msg: Vec<u8>) -> Result<(), NetworkError> {
        debug!(peer = %node_id, size = msg.len(), "app gossip received");

        if self.pre_activation() {
            debug!("app gossip received before activation time");
            return Ok(());
        }

        let message = match Message::parse(&msg) {
            Ok(message) => message,
            Err(err) => {
                debug!(peer = %node_id, %err, "dropping unparseable app gossip");
                return Ok(());
            }
        };

        message.handle(&self.handler, node_id).await;
        Ok(())
    }

    async fn gossip_atomic_tx(&self, tx: &Tx) -> Result<(), NetworkError> {
        let tx_id = tx.id();
        if self.pre_activation() {
            debug!(tx = %tx_id, "not gossiping atomic tx before activation time");
            return Ok(());
        }

        if !self.recent_atomic_txs.lock().insert_if_absent(tx_id) {
            return Ok(());
        }

        let msg = Message::AtomicTx {
            tx: tx.signed_bytes().to_vec(),
        };
        let bytes = msg.build()?;

        debug!(tx = %tx_id, "gossiping atomic tx");
        Ok(self.app_sender.send_app_gossip(bytes).await?)
    }

    async fn gossip_eth_txs(&self, txs: Vec<TxEnvelope>) -> Result<(), NetworkError> {
        if self.pre_activation() {
            debug!(count = txs.len(), "not gossiping eth txs before activation time");
            return Ok(());
        }

        // Re-broadcast only executable transactions we have not gossiped
        // recently.
        let mut selected = Vec::with_capacity(txs.len());
        {
            let mut recent = self.recent_eth_txs.lock();
            for tx in txs {
                let hash = tx.tx_hash();
                if self.eth_pool.status(&hash) != TxStatus::Pending {
                    continue;
                }
                if !recent.insert_if_absent(hash) {
                    continue;
                }
                selected.push(tx);
            }
        }

        if selected.is_empty() {
            return Ok(());
        }

        // Batch under the soft cap: flush before the transaction that
        // would overflow the current batch. A single oversized transaction
        // still goes out alone.
        let mut batch: Vec<TxEnvelope> = Vec::new();
        let mut batch_size = 0usize;
        for tx in selected {
            let size = tx.size();
            if batch_size + size > ETH_TXS_SOFT_CAP_SIZE {
                self.send_eth_txs(&batch).await?;
                batch.clear();
                batch_size = 0;
            }
            batch.push(tx);
            batch_size += size;
        }

        self.send_eth_txs(&batch).await
    }
}

/// Used when gossip is not configured for this network: every operation
/// succeeds without doing anything.
pub struct NoopNetwork;

#[async_trait]
impl Network for NoopNetwork {
    async fn app_request(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _msg: Vec<u8>,
    ) -> Result<(), NetworkError> {
        Ok(())
    }

    async fn app_response(
        &self,
        _node_id: NodeId,
        _request_id: u32,
        _msg: Vec<u8>,
    ) -> Result<(), NetworkError> {
        Ok(())
    }

    async fn app_request_failed(
        &self,
        _node_id: NodeId,
        _request_id: u32,
    ) -> Result<(), NetworkError> {
        Ok(())
    }

    async fn app_gossip(&self, _node_id: NodeId, _msg: Vec<u8>) -> Result<(), NetworkError> {
        Ok(())
    }

    async fn gossip_atomic_tx(&self, _tx: &Tx) -> Result<(), NetworkError> {
        Ok(())
    }

    async fn gossip_eth_txs(&self, _txs: Vec<TxEnvelope>) -> Result<(), NetworkError> {
        Ok(())
    }
}
