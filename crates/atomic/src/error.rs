//! Export transaction errors.

use alloy_primitives::Address;
use snowfall_codec::CodecError;
use snowfall_core::crypto::CryptoError;
use snowfall_core::{Id, MathError};
use thiserror::Error;

/// Errors from verifying or applying an export transaction.
///
/// Validation errors reject the transaction; on the local submission path
/// they surface to the caller, on the remote path they are logged and
/// swallowed by the gossip handler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("transaction is empty")]
    NilTx,

    #[error("transaction has no exported outputs")]
    NoExportOutputs,

    #[error("wrong destination chain: expected {expected}, got {actual}")]
    WrongChainId { expected: Id, actual: Id },

    #[error("wrong network id: expected {expected}, got {actual}")]
    WrongNetworkId { expected: u32, actual: u32 },

    #[error("wrong blockchain id: expected {expected}, got {actual}")]
    WrongBlockchainId { expected: Id, actual: Id },

    #[error("input has zero amount")]
    ZeroInputAmount,

    #[error("input has an empty asset id")]
    EmptyAssetId,

    #[error("output has zero amount")]
    ZeroOutputAmount,

    #[error("output threshold {threshold} exceeds its {addresses} addresses")]
    ThresholdTooHigh { threshold: u32, addresses: usize },

    #[error("output addresses are not sorted and unique")]
    AddressesNotSortedUnique,

    #[error("exported outputs are not sorted")]
    OutputsNotSorted,

    #[error("inputs are not sorted and unique")]
    InputsNotSortedUnique,

    #[error("credential is empty")]
    EmptyCredential,

    #[error("transaction has {inputs} inputs but {credentials} credentials")]
    SignatureInputsMismatch { inputs: usize, credentials: usize },

    #[error("credential {input} does not sign for its input address")]
    PublicKeySignatureMismatch { input: usize },

    #[error("asset {asset_id} flow does not balance: consumed {consumed}, produced {produced}")]
    UnbalancedFlow {
        asset_id: Id,
        consumed: u64,
        produced: u64,
    },

    #[error("address {address} has insufficient funds for asset {asset_id}")]
    InsufficientFunds { address: Address, asset_id: Id },

    #[error("address {address} nonce mismatch: state {state}, transaction {tx}")]
    InvalidNonce { address: Address, state: u64, tx: u64 },

    #[error("arithmetic overflow")]
    Overflow,

    #[error("dynamic fee rules are active but no base fee was provided")]
    MissingBaseFee,

    #[error("signer count {signers} does not match input count {inputs}")]
    SignerInputsMismatch { signers: usize, inputs: usize },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<MathError> for TxError {
    fn from(_: MathError) -> Self {
        TxError::Overflow
    }
}
