//! Exported outputs of an export transaction.

use alloy_primitives::Address;
use snowfall_codec::{CodecError, Decode, Encode, Packer, Unpacker};
use snowfall_core::Id;

use crate::error::TxError;

/// Wire type id of a transfer output. Part of the canonical encoding.
pub const TRANSFER_OUTPUT_TYPE_ID: u32 = 7;

/// A spendable output credited to the destination chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferOutput {
    /// Amount in the asset's base units.
    pub amount: u64,
    /// Unix time before which the output cannot be spent.
    pub locktime: u64,
    /// How many of `addresses` must sign to spend.
    pub threshold: u32,
    /// Addresses allowed to spend, sorted ascending and unique.
    pub addresses: Vec<Address>,
}

impl TransferOutput {
    pub fn verify(&self) -> Result<(), TxError> {
        if self.amount == 0 {
            return Err(TxError::ZeroOutputAmount);
        }
        if self.threshold as usize > self.addresses.len() {
            return Err(TxError::ThresholdTooHigh {
                threshold: self.threshold,
                addresses: self.addresses.len(),
            });
        }
        if !self.addresses.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(TxError::AddressesNotSortedUnique);
        }
        Ok(())
    }
}

impl Encode for TransferOutput {
    fn encode(&self, packer: &mut Packer) {
        packer.pack_u64(self.amount);
        packer.pack_u64(self.locktime);
        packer.pack_u32(self.threshold);
        packer.pack_len(self.addresses.len());
        for address in &self.addresses {
            packer.pack_fixed(address.as_slice());
        }
    }
}

impl Decode for TransferOutput {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        let amount = unpacker.unpack_u64()?;
        let locktime = unpacker.unpack_u64()?;
        let threshold = unpacker.unpack_u32()?;
        let len = unpacker.unpack_len()?;
        let mut addresses = Vec::with_capacity(len);
        for _ in 0..len {
            addresses.push(Address::from(unpacker.unpack_fixed::<20>()?));
        }
        Ok(Self {
            amount,
            locktime,
            threshold,
            addresses,
        })
    }
}

/// An output paired with the asset it carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferableOutput {
    pub asset_id: Id,
    pub output: TransferOutput,
}

impl TransferableOutput {
    /// Structural verification, recursing into the inner output.
    pub fn verify(&self) -> Result<(), TxError> {
        if self.asset_id.is_zero() {
            return Err(TxError::EmptyAssetId);
        }
        self.output.verify()
    }

    /// The output's canonical bytes, without a version prefix.
    ///
    /// Sorting compares these, so "sorted by canonical bytes" means the
    /// same thing on every implementation of the codec.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut packer = Packer::new();
        self.encode(&mut packer);
        packer.into_bytes()
    }
}

impl Encode for TransferableOutput {
    fn encode(&self, packer: &mut Packer) {
        packer.pack_fixed(self.asset_id.as_bytes());
        packer.pack_u32(TRANSFER_OUTPUT_TYPE_ID);
        self.output.encode(packer);
    }
}

impl Decode for TransferableOutput {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        let asset_id = Id::new(unpacker.unpack_fixed::<32>()?);
        let type_id = unpacker.unpack_u32()?;
        if type_id != TRANSFER_OUTPUT_TYPE_ID {
            return Err(CodecError::UnknownTypeId(type_id));
        }
        Ok(Self {
            asset_id,
            output: TransferOutput::decode(unpacker)?,
        })
    }
}

/// Sort outputs by their canonical encoding.
pub fn sort_transferable_outputs(outputs: &mut [TransferableOutput]) {
    outputs.sort_by(|a, b| a.canonical_bytes().cmp(&b.canonical_bytes()));
}

/// Whether `outputs` is sorted by canonical encoding. Equal outputs are
/// allowed: two identical outputs are distinct UTXOs once indexed.
pub fn transferable_outputs_sorted(outputs: &[TransferableOutput]) -> bool {
    outputs
        .windows(2)
        .all(|pair| pair[0].canonical_bytes() <= pair[1].canonical_bytes())
}
