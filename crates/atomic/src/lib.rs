//! Atomic export transactions.
//!
//! An export debits EVM account state on this chain and credits UTXOs to
//! the destination chain's shared memory, atomically with block acceptance.
//! This crate owns the transaction's canonical encoding, its stateless and
//! semantic verification, the deterministic EVM state transfer it induces,
//! and the shared-memory write performed on acceptance.

mod credential;
mod error;
mod export;
mod fee;
mod flow;
mod input;
mod output;
mod shared_memory;
mod state;
mod tx;
mod verify;

pub use credential::Credential;
pub use error::TxError;
pub use fee::dynamic_fee;
pub use flow::FlowChecker;
pub use input::{inputs_sorted_and_unique, sort_inputs_and_signers, EvmInput};
pub use output::{
    sort_transferable_outputs, transferable_outputs_sorted, TransferOutput, TransferableOutput,
};
pub use shared_memory::{
    Batch, Element, MemSharedMemory, Operation, PutRequests, SharedMemory, SharedMemoryError, Utxo,
};
pub use state::{MemStateDb, StateDb};
pub use tx::{Tx, UnsignedExportTx};
