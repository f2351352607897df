//! Ethereum transactions as they move through gossip.
//!
//! The gossip layer does not validate account-based transactions beyond
//! decoding: it needs their hash (for dedup), their sender and nonce (for
//! pool status), and their encoded size (for batching). Lifecycle beyond
//! that belongs to the pool.

mod batch;
mod envelope;
mod pool;

#[cfg(test)]
pub(crate) mod test_support;

pub use batch::{decode_batch, encode_batch};
pub use envelope::{tx_type, EthTxError, SignedEip1559Tx, SignedLegacyTx, TxEnvelope};
pub use pool::{BasicEthPool, EthTxPool, PoolError, TxStatus};
