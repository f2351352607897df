//! Inbound gossip handling.

use std::sync::Arc;

use alloy_primitives::B256;
use async_trait::async_trait;
use snowfall_atomic::Tx;
use snowfall_core::NodeId;
use snowfall_eth::{decode_batch, EthTxPool};
use snowfall_mempool::Mempool;
use tracing::{debug, trace};

use crate::message::Message;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The VM's transaction issue path.
///
/// `local` marks transactions submitted by this node's own clients;
/// remote submissions get their errors logged and swallowed by the caller.
#[async_trait]
pub trait TxIssuer: Send + Sync {
    async fn issue_tx(&self, tx: Tx, local: bool) -> Result<(), BoxError>;
}

/// Per-tag message handling. Default implementations log and succeed, so
/// tags a node does not serve degrade to acknowledged no-ops.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle_atomic_tx(&self, node_id: NodeId, tx_bytes: Vec<u8>) {
        let _ = tx_bytes;
        trace!(peer = %node_id, "unhandled atomic tx message");
    }

    async fn handle_eth_txs(&self, node_id: NodeId, txs_bytes: Vec<u8>) {
        let _ = txs_bytes;
        trace!(peer = %node_id, "unhandled eth txs message");
    }
}

impl Message {
    /// Dispatch a parsed message to the matching handler method.
    pub async fn handle<H: Handler + ?Sized>(self, handler: &H, node_id: NodeId) {
        match self {
            Message::AtomicTx { tx } => handler.handle_atomic_tx(node_id, tx).await,
            Message::EthTxs { txs } => handler.handle_eth_txs(node_id, txs).await,
        }
    }
}

/// The node's gossip message handler: parses, deduplicates, and forwards
/// into the mempool and transaction pool.
///
/// Nothing here fails the transport call. A peer sending garbage is a
/// peer problem, not a local one.
pub struct GossipHandler {
    mempool: Arc<Mempool>,
    eth_pool: Arc<dyn EthTxPool>,
    issuer: Arc<dyn TxIssuer>,
}

impl GossipHandler {
    pub fn new(
        mempool: Arc<Mempool>,
        eth_pool: Arc<dyn EthTxPool>,
        issuer: Arc<dyn TxIssuer>,
    ) -> Self {
        Self {
            mempool,
            eth_pool,
            issuer,
        }
    }
}

#[async_trait]
impl Handler for GossipHandler {
    async fn handle_atomic_tx(&self, node_id: NodeId, tx_bytes: Vec<u8>) {
        debug!(peer = %node_id, "atomic tx gossip received");

        if tx_bytes.is_empty() {
            debug!(peer = %node_id, "empty atomic tx message");
            return;
        }

        // Parsing recomputes the unsigned bytes from the decoded object, so
        // a peer's non-canonical encoding is verified against the re-encoded
        // form.
        let tx = match Tx::parse(&tx_bytes) {
            Ok(tx) => tx,
            Err(err) => {
                trace!(peer = %node_id, %err, "peer provided invalid atomic tx");
                return;
            }
        };

        let tx_id = tx.id();
        let (known, dropped) = self.mempool.get_tx(&tx_id);
        if known.is_some() || dropped {
            return;
        }

        if let Err(err) = self.issuer.issue_tx(tx, false).await {
            trace!(peer = %node_id, tx = %tx_id, %err, "remote atomic tx rejected");
        }
    }

    async fn handle_eth_txs(&self, node_id: NodeId, txs_bytes: Vec<u8>) {
        debug!(peer = %node_id, size = txs_bytes.len(), "eth txs gossip received");

        if txs_bytes.is_empty() {
            debug!(peer = %node_id, "empty eth txs message");
            return;
        }

        let txs = match decode_batch(&txs_bytes) {
            Ok(txs) => txs,
            Err(err) => {
                trace!(peer = %node_id, %err, "peer provided invalid eth txs");
                return;
            }
        };

        let hashes: Vec<B256> = txs.iter().map(|tx| tx.tx_hash()).collect();
        for (hash, result) in hashes.iter().zip(self.eth_pool.add_remotes(txs)) {
            if let Err(err) = result {
                debug!(tx = %hash, %err, "failed to add remote eth tx to pool");
            }
        }
    }
}
