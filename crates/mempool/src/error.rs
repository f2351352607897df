//! Mempool error types.

use snowfall_atomic::TxError;
use thiserror::Error;

/// Errors that can occur when interacting with the mempool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MempoolError {
    /// Transaction already in the mempool.
    #[error("transaction already in mempool")]
    AlreadyKnown,

    /// The mempool is full and the transaction does not pay enough to
    /// displace anything.
    #[error("mempool is full and transaction fee is too low")]
    InsufficientFee,

    /// The transaction's fee could not be computed.
    #[error("unable to compute transaction fee: {0}")]
    Fee(#[from] TxError),
}

/// Result type for mempool operations.
pub type MempoolResult<T> = Result<T, MempoolError>;
