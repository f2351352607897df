//! Cross-chain shared memory.
//!
//! Shared memory is a node-level key-value store both chains can reach.
//! Accepting an export writes one UTXO per exported output into the
//! destination chain's partition, under the same storage batch as the
//! block commit so the credit lands atomically with acceptance.

use std::collections::HashMap;

use parking_lot::Mutex;
use snowfall_codec::{CodecError, Decode, Encode, Packer, Unpacker};
use snowfall_core::Id;
use thiserror::Error;

use crate::output::{TransferOutput, TransferableOutput, TRANSFER_OUTPUT_TYPE_ID};

/// An unspent output record, keyed by `(tx_id, output_index)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub tx_id: Id,
    pub output_index: u32,
    pub asset_id: Id,
    pub output: TransferOutput,
}

impl Utxo {
    pub fn from_exported_output(tx_id: Id, index: u32, out: &TransferableOutput) -> Self {
        Self {
            tx_id,
            output_index: index,
            asset_id: out.asset_id,
            output: out.output.clone(),
        }
    }

    /// The id this UTXO is keyed by when referenced as an input.
    pub fn input_id(&self) -> Id {
        let mut bytes = [0u8; 36];
        bytes[..32].copy_from_slice(self.tx_id.as_bytes());
        bytes[32..].copy_from_slice(&self.output_index.to_be_bytes());
        Id::from_digest_of(&bytes)
    }
}

impl Encode for Utxo {
    fn encode(&self, packer: &mut Packer) {
        packer.pack_fixed(self.tx_id.as_bytes());
        packer.pack_u32(self.output_index);
        packer.pack_fixed(self.asset_id.as_bytes());
        packer.pack_u32(TRANSFER_OUTPUT_TYPE_ID);
        self.output.encode(packer);
    }
}

impl Decode for Utxo {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        let tx_id = Id::new(unpacker.unpack_fixed::<32>()?);
        let output_index = unpacker.unpack_u32()?;
        let asset_id = Id::new(unpacker.unpack_fixed::<32>()?);
        let type_id = unpacker.unpack_u32()?;
        if type_id != TRANSFER_OUTPUT_TYPE_ID {
            return Err(CodecError::UnknownTypeId(type_id));
        }
        Ok(Self {
            tx_id,
            output_index,
            asset_id,
            output: TransferOutput::decode(unpacker)?,
        })
    }
}

/// One shared-memory write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    /// Searchable traits: the output's addresses, so the destination chain
    /// can index UTXOs by recipient.
    pub traits: Vec<Vec<u8>>,
}

/// The writes applied to one destination chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PutRequests {
    pub puts: Vec<Element>,
}

/// One operation in a storage batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Set { key: Vec<u8>, value: Vec<u8> },
    Remove { key: Vec<u8> },
}

/// A scoped set of storage writes committed together with a shared-memory
/// apply. Either all of it lands or none of it does.
#[derive(Debug, Default)]
pub struct Batch {
    ops: Vec<Operation>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(Operation::Set { key, value });
    }

    pub fn remove(&mut self, key: Vec<u8>) {
        self.ops.push(Operation::Remove { key });
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<Operation> {
        self.ops
    }
}

#[derive(Debug, Error)]
pub enum SharedMemoryError {
    #[error("shared memory backend failure: {0}")]
    Backend(String),
}

/// The atomic-apply contract between chains.
pub trait SharedMemory: Send + Sync {
    /// Apply `requests` to `destination`'s partition and commit `batch`,
    /// atomically.
    fn apply(
        &self,
        destination: Id,
        requests: PutRequests,
        batch: Batch,
    ) -> Result<(), SharedMemoryError>;
}

#[derive(Debug, Default)]
struct MemSharedMemoryInner {
    /// Per-chain partition: key -> (value, traits).
    partitions: HashMap<Id, HashMap<Vec<u8>, (Vec<u8>, Vec<Vec<u8>>)>>,
    /// The local store the batches commit into.
    committed: HashMap<Vec<u8>, Vec<u8>>,
}

/// In-memory shared memory, for tests.
#[derive(Debug, Default)]
pub struct MemSharedMemory {
    inner: Mutex<MemSharedMemoryInner>,
}

impl MemSharedMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a value and its traits from a chain's partition.
    pub fn get(&self, chain: Id, key: &[u8]) -> Option<(Vec<u8>, Vec<Vec<u8>>)> {
        self.inner.lock().partitions.get(&chain)?.get(key).cloned()
    }

    /// Number of entries in a chain's partition.
    pub fn partition_len(&self, chain: Id) -> usize {
        self.inner
            .lock()
            .partitions
            .get(&chain)
            .map_or(0, |p| p.len())
    }

    /// Read back a key committed through a batch.
    pub fn committed(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.lock().committed.get(key).cloned()
    }
}

impl SharedMemory for MemSharedMemory {
    fn apply(
        &self,
        destination: Id,
        requests: PutRequests,
        batch: Batch,
    ) -> Result<(), SharedMemoryError> {
        let mut inner = self.inner.lock();
        let partition = inner.partitions.entry(destination).or_default();
        for element in requests.puts {
            partition.insert(element.key, (element.value, element.traits));
        }
        for op in batch.into_ops() {
            match op {
                Operation::Set { key, value } => {
                    inner.committed.insert(key, value);
                }
                Operation::Remove { key } => {
                    inner.committed.remove(&key);
                }
            }
        }
        Ok(())
    }
}
