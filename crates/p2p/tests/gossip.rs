//! End-to-end gossip behavior against a recording transport.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use alloy_consensus::{SignableTransaction, TxLegacy};
use alloy_primitives::{Address, Bytes, PrimitiveSignature, TxKind, B256, U256};
use async_trait::async_trait;
use k256::ecdsa::{signature::hazmat::PrehashSigner, SigningKey};
use parking_lot::Mutex;
use secp256k1::SecretKey;
use snowfall_atomic::{EvmInput, TransferOutput, TransferableOutput, Tx, UnsignedExportTx};
use snowfall_core::crypto::address_from_secret_key;
use snowfall_core::{Id, NodeId};
use snowfall_eth::{decode_batch, BasicEthPool, TxEnvelope};
use snowfall_mempool::Mempool;
use snowfall_p2p::{
    AppSender, BoxError, Clock, Message, Network, NoopNetwork, PushNetwork, SenderError, TxIssuer,
};

const NATIVE: Id = Id::new([0xA0; 32]);
const ACTIVATION: u64 = 1_000;

struct RecordingSender {
    sent: Mutex<Vec<Vec<u8>>>,
}

impl RecordingSender {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl AppSender for RecordingSender {
    async fn send_app_gossip(&self, bytes: Vec<u8>) -> Result<(), SenderError> {
        self.sent.lock().push(bytes);
        Ok(())
    }
}

struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    fn at(now: u64) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicU64::new(now),
        })
    }

    fn advance_to(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Issues remote transactions straight into the mempool, counting calls.
struct TestIssuer {
    mempool: Arc<Mempool>,
    issued: AtomicUsize,
    reject: bool,
}

impl TestIssuer {
    fn new(mempool: Arc<Mempool>) -> Arc<Self> {
        Arc::new(Self {
            mempool,
            issued: AtomicUsize::new(0),
            reject: false,
        })
    }

    fn rejecting(mempool: Arc<Mempool>) -> Arc<Self> {
        Arc::new(Self {
            mempool,
            issued: AtomicUsize::new(0),
            reject: true,
        })
    }

    fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TxIssuer for TestIssuer {
    async fn issue_tx(&self, tx: Tx, _local: bool) -> Result<(), BoxError> {
        self.issued.fetch_add(1, Ordering::SeqCst);
        if self.reject {
            self.mempool.mark_dropped(tx.id());
            return Err("transaction failed verification".into());
        }
        self.mempool.add_tx(tx)?;
        Ok(())
    }
}

struct Harness {
    network: PushNetwork,
    sender: Arc<RecordingSender>,
    clock: Arc<ManualClock>,
    mempool: Arc<Mempool>,
    eth_pool: Arc<BasicEthPool>,
    issuer: Arc<TestIssuer>,
}

fn harness_at(now: u64, reject: bool) -> Harness {
    let sender = RecordingSender::new();
    let clock = ManualClock::at(now);
    let mempool = Arc::new(Mempool::new(NATIVE, 64));
    let eth_pool = Arc::new(BasicEthPool::new());
    let issuer = if reject {
        TestIssuer::rejecting(mempool.clone())
    } else {
        TestIssuer::new(mempool.clone())
    };
    let network = PushNetwork::new(
        ACTIVATION,
        sender.clone(),
        eth_pool.clone(),
        mempool.clone(),
        issuer.clone(),
        clock.clone(),
    );
    Harness {
        network,
        sender,
        clock,
        mempool,
        eth_pool,
        issuer,
    }
}

fn harness() -> Harness {
    harness_at(ACTIVATION, false)
}

fn peer() -> NodeId {
    NodeId::new([7; 20])
}

fn atomic_tx(key_byte: u8, nonce: u64) -> Tx {
    let key = SecretKey::from_slice(&[key_byte; 32]).unwrap();
    let unsigned = UnsignedExportTx {
        network_id: 1,
        blockchain_id: Id::new([0xC0; 32]),
        destination_chain: Id::new([0xD0; 32]),
        inputs: vec![EvmInput {
            address: address_from_secret_key(&key),
            amount: 1_100_000,
            asset_id: NATIVE,
            nonce,
        }],
        exported_outputs: vec![TransferableOutput {
            asset_id: NATIVE,
            output: TransferOutput {
                amount: 1_000_000,
                locktime: 0,
                threshold: 1,
                addresses: vec![Address::repeat_byte(0xEE)],
            },
        }],
    };
    Tx::sign(unsigned, &[key]).unwrap()
}

fn eth_tx(key: &SigningKey, nonce: u64, input_len: usize) -> TxEnvelope {
    let tx = TxLegacy {
        chain_id: Some(1),
        nonce,
        gas_price: 20_000_000_000,
        gas_limit: 21_000,
        to: TxKind::Call(Address::repeat_byte(0x42)),
        value: U256::from(1u64),
        input: Bytes::from(vec![0u8; input_len]),
    };
    let (sig, recovery_id) = key.sign_prehash(tx.signature_hash().as_ref()).unwrap();
    let signature = PrimitiveSignature::new(
        U256::from_be_slice(&sig.r().to_bytes()),
        U256::from_be_slice(&sig.s().to_bytes()),
        recovery_id.is_y_odd(),
    );
    let signed = tx.into_signed(signature);

    let mut encoded = Vec::new();
    signed.rlp_encode(&mut encoded);
    TxEnvelope::decode(&encoded).unwrap()
}

fn sent_batches(sender: &RecordingSender) -> Vec<Vec<B256>> {
    sender
        .sent()
        .iter()
        .map(|bytes| match Message::parse(bytes).unwrap() {
            Message::EthTxs { txs } => decode_batch(&txs)
                .unwrap()
                .iter()
                .map(|tx| tx.tx_hash())
                .collect(),
            other => panic!("expected EthTxs message, got {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn atomic_tx_is_gossiped_once() {
    let h = harness();
    let tx = atomic_tx(1, 0);

    for _ in 0..3 {
        h.network.gossip_atomic_tx(&tx).await.unwrap();
    }

    let sent = h.sender.sent();
    assert_eq!(sent.len(), 1, "duplicate gossip must be suppressed");
    match Message::parse(&sent[0]).unwrap() {
        Message::AtomicTx { tx: bytes } => assert_eq!(bytes, tx.signed_bytes()),
        other => panic!("expected AtomicTx message, got {other:?}"),
    }
}

#[tokio::test]
async fn distinct_atomic_txs_each_go_out() {
    let h = harness();
    h.network.gossip_atomic_tx(&atomic_tx(1, 0)).await.unwrap();
    h.network.gossip_atomic_tx(&atomic_tx(2, 0)).await.unwrap();
    assert_eq!(h.sender.sent().len(), 2);
}

#[tokio::test]
async fn pre_activation_outbound_is_a_noop() {
    let h = harness_at(ACTIVATION - 1, false);

    h.network.gossip_atomic_tx(&atomic_tx(1, 0)).await.unwrap();
    let key = SigningKey::from_slice(&[3; 32]).unwrap();
    let tx = eth_tx(&key, 0, 128);
    h.eth_pool.add(tx.clone()).unwrap();
    h.network.gossip_eth_txs(vec![tx]).await.unwrap();

    assert!(h.sender.sent().is_empty());

    // The same tx gossips fine once the clock passes activation: the
    // pre-activation path must not have burned its recent-set entry.
    h.clock.advance_to(ACTIVATION);
    h.network.gossip_atomic_tx(&atomic_tx(1, 0)).await.unwrap();
    assert_eq!(h.sender.sent().len(), 1);
}

#[tokio::test]
async fn pre_activation_inbound_is_a_noop() {
    let h = harness_at(ACTIVATION - 1, false);
    let tx = atomic_tx(1, 0);
    let bytes = Message::AtomicTx {
        tx: tx.signed_bytes().to_vec(),
    }
    .build()
    .unwrap();

    h.network.app_gossip(peer(), bytes).await.unwrap();
    assert_eq!(h.issuer.issued(), 0);
    assert!(h.mempool.is_empty());
}

#[tokio::test]
async fn eth_txs_split_into_batches_at_the_soft_cap() {
    let h = harness();
    let key = SigningKey::from_slice(&[4; 32]).unwrap();

    // Roughly 40, 30, and 20 KiB: the first two overflow a 64 KiB batch,
    // the last two fit in one.
    let tx1 = eth_tx(&key, 0, 40 * 1024);
    let tx2 = eth_tx(&key, 1, 30 * 1024);
    let tx3 = eth_tx(&key, 2, 20 * 1024);
    for tx in [&tx1, &tx2, &tx3] {
        h.eth_pool.add(tx.clone()).unwrap();
    }

    h.network
        .gossip_eth_txs(vec![tx1.clone(), tx2.clone(), tx3.clone()])
        .await
        .unwrap();

    let batches = sent_batches(&h.sender);
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0], vec![tx1.tx_hash()]);
    assert_eq!(batches[1], vec![tx2.tx_hash(), tx3.tx_hash()]);
}

#[tokio::test]
async fn oversized_eth_tx_is_sent_alone() {
    let h = harness();
    let key = SigningKey::from_slice(&[5; 32]).unwrap();
    let big = eth_tx(&key, 0, 80 * 1024);
    h.eth_pool.add(big.clone()).unwrap();

    h.network.gossip_eth_txs(vec![big.clone()]).await.unwrap();

    let batches = sent_batches(&h.sender);
    assert_eq!(batches, vec![vec![big.tx_hash()]]);
}

#[tokio::test]
async fn non_pending_eth_txs_are_not_gossiped() {
    let h = harness();
    let key = SigningKey::from_slice(&[6; 32]).unwrap();

    // Nonce 2 with no nonce 0/1 in the pool: queued, not pending.
    let queued = eth_tx(&key, 2, 128);
    h.eth_pool.add(queued.clone()).unwrap();
    // Never added to the pool at all.
    let unknown = eth_tx(&key, 5, 128);

    h.network.gossip_eth_txs(vec![queued, unknown]).await.unwrap();
    assert!(h.sender.sent().is_empty());
}

#[tokio::test]
async fn recently_gossiped_eth_txs_are_suppressed() {
    let h = harness();
    let key = SigningKey::from_slice(&[7; 32]).unwrap();
    let tx = eth_tx(&key, 0, 128);
    h.eth_pool.add(tx.clone()).unwrap();

    h.network.gossip_eth_txs(vec![tx.clone()]).await.unwrap();
    h.network.gossip_eth_txs(vec![tx]).await.unwrap();

    assert_eq!(h.sender.sent().len(), 1);
}

#[tokio::test]
async fn inbound_atomic_tx_reaches_the_mempool() {
    let h = harness();
    let tx = atomic_tx(8, 0);
    let bytes = Message::AtomicTx {
        tx: tx.signed_bytes().to_vec(),
    }
    .build()
    .unwrap();

    h.network.app_gossip(peer(), bytes).await.unwrap();

    assert_eq!(h.issuer.issued(), 1);
    assert!(h.mempool.has(&tx.id()));
}

#[tokio::test]
async fn known_atomic_tx_is_not_reissued() {
    let h = harness();
    let tx = atomic_tx(9, 0);
    h.mempool.add_tx(tx.clone()).unwrap();

    let bytes = Message::AtomicTx {
        tx: tx.signed_bytes().to_vec(),
    }
    .build()
    .unwrap();
    h.network.app_gossip(peer(), bytes).await.unwrap();

    assert_eq!(h.issuer.issued(), 0);
}

#[tokio::test]
async fn dropped_atomic_tx_is_ignored_on_regossip() {
    let h = harness_at(ACTIVATION, true);
    let tx = atomic_tx(10, 0);
    let bytes = Message::AtomicTx {
        tx: tx.signed_bytes().to_vec(),
    }
    .build()
    .unwrap();

    // First delivery reaches the issuer and is rejected + marked dropped.
    h.network.app_gossip(peer(), bytes.clone()).await.unwrap();
    assert_eq!(h.issuer.issued(), 1);

    // Re-gossip is dropped before the issue path.
    h.network.app_gossip(peer(), bytes).await.unwrap();
    assert_eq!(h.issuer.issued(), 1);
}

#[tokio::test]
async fn malformed_gossip_is_swallowed() {
    let h = harness();

    h.network.app_gossip(peer(), vec![0xFF; 32]).await.unwrap();
    h.network.app_gossip(peer(), Vec::new()).await.unwrap();

    // A well-formed message wrapping a garbage atomic tx is also dropped
    // without reaching the issue path.
    let bytes = Message::AtomicTx { tx: vec![1, 2, 3] }.build().unwrap();
    h.network.app_gossip(peer(), bytes).await.unwrap();

    assert_eq!(h.issuer.issued(), 0);
}

#[tokio::test]
async fn empty_atomic_tx_payload_is_dropped() {
    let h = harness();
    let bytes = Message::AtomicTx { tx: Vec::new() }.build().unwrap();
    h.network.app_gossip(peer(), bytes).await.unwrap();
    assert_eq!(h.issuer.issued(), 0);
}

#[tokio::test]
async fn inbound_eth_txs_reach_the_pool() {
    let h = harness();
    let key = SigningKey::from_slice(&[11; 32]).unwrap();
    let txs = vec![eth_tx(&key, 0, 64), eth_tx(&key, 1, 64)];
    let batch = snowfall_eth::encode_batch(&txs);

    let bytes = Message::EthTxs { txs: batch }.build().unwrap();
    h.network.app_gossip(peer(), bytes).await.unwrap();

    assert_eq!(h.eth_pool.len(), 2);
}

#[tokio::test]
async fn noop_network_accepts_everything_silently() {
    let network = NoopNetwork;
    let tx = atomic_tx(12, 0);

    network.app_gossip(peer(), vec![1, 2, 3]).await.unwrap();
    network.app_request(peer(), 1, vec![]).await.unwrap();
    network.app_response(peer(), 1, vec![]).await.unwrap();
    network.app_request_failed(peer(), 1).await.unwrap();
    network.gossip_atomic_tx(&tx).await.unwrap();
    network.gossip_eth_txs(vec![]).await.unwrap();
}
