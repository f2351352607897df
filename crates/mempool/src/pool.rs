//! Fee-ordered atomic transaction pool.

use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use snowfall_atomic::Tx;
use snowfall_core::Id;
use tracing::debug;

use crate::error::{MempoolError, MempoolResult};

/// How many recently-dropped tx ids to remember. Remote transactions that
/// failed verification are ignored on re-gossip while marked.
const DROPPED_CACHE_SIZE: usize = 256;

/// An entry in the priority queue, holding the ordering key and tx id.
#[derive(Clone, PartialEq, Eq)]
struct OrderedEntry {
    id: Id,
    fee_rate: u64,
}

impl PartialOrd for OrderedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Higher fee rate first; ties broken by id for determinism.
        self.fee_rate
            .cmp(&other.fee_rate)
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[derive(Default)]
struct Inner {
    by_hash: HashMap<Id, Arc<Tx>>,
    by_priority: BinaryHeap<OrderedEntry>,
    fee_rates: HashMap<Id, u64>,
    dropped_set: HashSet<Id>,
    dropped_order: VecDeque<Id>,
}

/// Bounded, fee-rate-ordered pool of verified atomic transactions.
///
/// The priority heap is not rebuilt on removal; stale entries are skipped
/// when popped. This is the usual optimization for heaps without removal.
pub struct Mempool {
    native_asset_id: Id,
    capacity: usize,
    inner: RwLock<Inner>,
}

impl Mempool {
    pub fn new(native_asset_id: Id, capacity: usize) -> Self {
        assert!(capacity > 0, "mempool capacity must be positive");
        Self {
            native_asset_id,
            capacity,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has(&self, id: &Id) -> bool {
        self.inner.read().by_hash.contains_key(id)
    }

    /// Fetch a transaction and whether its id is marked dropped.
    ///
    /// The dropped flag is only meaningful for transactions not currently
    /// pooled: a re-added transaction clears its mark.
    pub fn get_tx(&self, id: &Id) -> (Option<Arc<Tx>>, bool) {
        let inner = self.inner.read();
        let tx = inner.by_hash.get(id).cloned();
        let dropped = tx.is_none() && inner.dropped_set.contains(id);
        (tx, dropped)
    }

    /// Add a verified transaction.
    ///
    /// When the pool is full, the lowest-paying transaction is evicted to
    /// make room; a newcomer that pays no more than the current minimum is
    /// rejected instead.
    pub fn add_tx(&self, tx: Tx) -> MempoolResult<()> {
        let id = tx.id();
        let fee_rate = self.fee_rate(&tx)?;

        let mut inner = self.inner.write();
        if inner.by_hash.contains_key(&id) {
            return Err(MempoolError::AlreadyKnown);
        }

        if inner.by_hash.len() >= self.capacity {
            // fee_rates mirrors by_hash exactly, so its minimum is the
            // pool's cheapest live transaction.
            let (min_id, min_rate) = inner
                .fee_rates
                .iter()
                .min_by_key(|(rate_id, rate)| (**rate, **rate_id))
                .map(|(rate_id, rate)| (*rate_id, *rate))
                .expect("full pool has a minimum entry");
            if fee_rate <= min_rate {
                return Err(MempoolError::InsufficientFee);
            }
            debug!(evicted = %min_id, fee_rate = min_rate, "evicting lowest-paying tx");
            inner.by_hash.remove(&min_id);
            inner.fee_rates.remove(&min_id);
        }

        // A re-issued transaction is no longer dropped.
        if inner.dropped_set.remove(&id) {
            inner.dropped_order.retain(|d| d != &id);
        }

        inner.by_hash.insert(id, Arc::new(tx));
        inner.fee_rates.insert(id, fee_rate);
        inner.by_priority.push(OrderedEntry { id, fee_rate });
        Ok(())
    }

    /// Pop the highest-paying transaction for block inclusion.
    pub fn next_tx(&self) -> Option<Arc<Tx>> {
        let mut inner = self.inner.write();
        while let Some(entry) = inner.by_priority.pop() {
            // Entries for evicted or already-popped txs are stale.
            if let Some(tx) = inner.by_hash.remove(&entry.id) {
                inner.fee_rates.remove(&entry.id);
                return Some(tx);
            }
        }
        None
    }

    /// Remove a transaction without issuing it, e.g. when a conflicting
    /// block was accepted.
    pub fn remove_tx(&self, id: &Id) -> Option<Arc<Tx>> {
        let mut inner = self.inner.write();
        let tx = inner.by_hash.remove(id)?;
        inner.fee_rates.remove(id);
        Some(tx)
    }

    /// Remember `id` as recently dropped so re-gossip of an invalid
    /// transaction is ignored. The set is bounded; old marks fall off.
    pub fn mark_dropped(&self, id: Id) {
        let mut inner = self.inner.write();
        if !inner.dropped_set.insert(id) {
            return;
        }
        inner.dropped_order.push_back(id);
        if inner.dropped_order.len() > DROPPED_CACHE_SIZE {
            if let Some(evicted) = inner.dropped_order.pop_front() {
                inner.dropped_set.remove(&evicted);
            }
        }
    }

    /// Fee paid per unit of gas, in native base units. Transactions whose
    /// inputs do not cover their outputs cannot price in.
    fn fee_rate(&self, tx: &Tx) -> MempoolResult<u64> {
        let burned = tx.unsigned.burned(self.native_asset_id)?;
        let gas = tx.gas()?.max(1);
        Ok(burned / gas)
    }
}
