//! Transaction pool surface consumed by gossip.

use std::collections::{BTreeMap, HashMap};

use alloy_primitives::{Address, B256};
use parking_lot::RwLock;
use thiserror::Error;

use crate::envelope::TxEnvelope;

/// Where a transaction stands in the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// Not in the pool.
    Unknown,
    /// In the pool but not executable yet (nonce gap).
    Queued,
    /// Executable and eligible for gossip.
    Pending,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("transaction already known")]
    AlreadyKnown,

    #[error("nonce too low: pool expects at least {expected}, got {actual}")]
    NonceTooLow { expected: u64, actual: u64 },
}

/// The pool operations the gossip layer needs.
///
/// Outbound gossip filters on `status` (only pending transactions are
/// re-broadcast); inbound gossip feeds decoded remote transactions in via
/// `add_remotes`. Ordering, eviction, and replacement stay inside the pool.
pub trait EthTxPool: Send + Sync {
    fn status(&self, hash: &B256) -> TxStatus;

    /// Add remote transactions, returning one result per transaction in
    /// order. Failures are per-transaction, never batch-wide.
    fn add_remotes(&self, txs: Vec<TxEnvelope>) -> Vec<Result<(), PoolError>>;
}

#[derive(Default)]
struct PoolInner {
    by_hash: HashMap<B256, TxEnvelope>,
    by_sender: HashMap<Address, BTreeMap<u64, B256>>,
    /// The next executable nonce per sender, fed from chain state.
    base_nonces: HashMap<Address, u64>,
}

/// In-memory pool with nonce-gap aware statuses.
///
/// A transaction is pending when every nonce from the sender's base nonce
/// up to its own is present; otherwise it is queued.
#[derive(Default)]
pub struct BasicEthPool {
    inner: RwLock<PoolInner>,
}

impl BasicEthPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the sender's next executable nonce from chain state.
    pub fn set_base_nonce(&self, sender: Address, nonce: u64) {
        self.inner.write().base_nonces.insert(sender, nonce);
    }

    pub fn add(&self, tx: TxEnvelope) -> Result<(), PoolError> {
        let mut inner = self.inner.write();
        let hash = tx.tx_hash();
        if inner.by_hash.contains_key(&hash) {
            return Err(PoolError::AlreadyKnown);
        }

        let sender = tx.sender();
        let nonce = tx.nonce();
        let base = inner.base_nonces.get(&sender).copied().unwrap_or(0);
        if nonce < base {
            return Err(PoolError::NonceTooLow {
                expected: base,
                actual: nonce,
            });
        }

        inner.by_sender.entry(sender).or_default().insert(nonce, hash);
        inner.by_hash.insert(hash, tx);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, hash: &B256) -> bool {
        self.inner.read().by_hash.contains_key(hash)
    }
}

impl EthTxPool for BasicEthPool {
    fn status(&self, hash: &B256) -> TxStatus {
        let inner = self.inner.read();
        let Some(tx) = inner.by_hash.get(hash) else {
            return TxStatus::Unknown;
        };

        let sender = tx.sender();
        let nonce = tx.nonce();
        let base = inner.base_nonces.get(&sender).copied().unwrap_or(0);
        if nonce < base {
            // Stale after a base-nonce advance; not executable.
            return TxStatus::Queued;
        }
        let nonces = inner
            .by_sender
            .get(&sender)
            .expect("sender index tracks every pooled tx");

        // Executable iff the sender's pooled nonces run gap-free from the
        // base up to this tx. Walk the index, not the nonce range: the
        // range is attacker-controlled.
        let mut next = base;
        let mut contiguous = false;
        for &n in nonces.range(base..=nonce).map(|(n, _)| n) {
            if n != next {
                break;
            }
            if n == nonce {
                contiguous = true;
                break;
            }
            next = n + 1;
        }
        if contiguous {
            TxStatus::Pending
        } else {
            TxStatus::Queued
        }
    }

    fn add_remotes(&self, txs: Vec<TxEnvelope>) -> Vec<Result<(), PoolError>> {
        txs.into_iter().map(|tx| self.add(tx)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{signed_legacy_tx, test_signing_key};

    #[test]
    fn unknown_tx_has_unknown_status() {
        let pool = BasicEthPool::new();
        assert_eq!(pool.status(&B256::ZERO), TxStatus::Unknown);
    }

    #[test]
    fn contiguous_nonces_are_pending() {
        let pool = BasicEthPool::new();
        let key = test_signing_key(1);

        let tx0 = signed_legacy_tx(&key, 0, 8);
        let tx1 = signed_legacy_tx(&key, 1, 8);
        pool.add(tx0.clone()).unwrap();
        pool.add(tx1.clone()).unwrap();

        assert_eq!(pool.status(&tx0.tx_hash()), TxStatus::Pending);
        assert_eq!(pool.status(&tx1.tx_hash()), TxStatus::Pending);
    }

    #[test]
    fn nonce_gap_queues_the_later_tx() {
        let pool = BasicEthPool::new();
        let key = test_signing_key(2);

        let tx0 = signed_legacy_tx(&key, 0, 8);
        let tx2 = signed_legacy_tx(&key, 2, 8);
        pool.add(tx0.clone()).unwrap();
        pool.add(tx2.clone()).unwrap();

        assert_eq!(pool.status(&tx0.tx_hash()), TxStatus::Pending);
        assert_eq!(pool.status(&tx2.tx_hash()), TxStatus::Queued);
    }

    #[test]
    fn duplicates_are_rejected_per_tx() {
        let pool = BasicEthPool::new();
        let key = test_signing_key(3);
        let tx = signed_legacy_tx(&key, 0, 8);

        let results = pool.add_remotes(vec![tx.clone(), tx]);
        assert_eq!(results[0], Ok(()));
        assert_eq!(results[1], Err(PoolError::AlreadyKnown));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn stale_nonces_are_rejected() {
        let pool = BasicEthPool::new();
        let key = test_signing_key(4);
        let tx = signed_legacy_tx(&key, 0, 8);
        pool.set_base_nonce(tx.sender(), 5);

        assert_eq!(
            pool.add(tx),
            Err(PoolError::NonceTooLow {
                expected: 5,
                actual: 0
            })
        );
    }
}
