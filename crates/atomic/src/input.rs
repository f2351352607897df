//! EVM-side inputs of an export transaction.

use std::cmp::Ordering;

use alloy_primitives::Address;
use secp256k1::SecretKey;
use snowfall_codec::{CodecError, Decode, Encode, Packer, Unpacker};
use snowfall_core::Id;

use crate::error::TxError;

/// One debit against an EVM account.
///
/// The nonce pins the input to the account's current state so a signed
/// export cannot be replayed after acceptance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvmInput {
    pub address: Address,
    /// Amount in native-asset base units (8 decimals), not EVM wei.
    pub amount: u64,
    pub asset_id: Id,
    pub nonce: u64,
}

impl EvmInput {
    pub fn verify(&self) -> Result<(), TxError> {
        if self.amount == 0 {
            return Err(TxError::ZeroInputAmount);
        }
        if self.asset_id.is_zero() {
            return Err(TxError::EmptyAssetId);
        }
        Ok(())
    }

    /// Ordering key: address, then asset, then nonce, all ascending.
    fn sort_key(&self) -> (Address, Id, u64) {
        (self.address, self.asset_id, self.nonce)
    }
}

impl Encode for EvmInput {
    fn encode(&self, packer: &mut Packer) {
        packer.pack_fixed(self.address.as_slice());
        packer.pack_u64(self.amount);
        packer.pack_fixed(self.asset_id.as_bytes());
        packer.pack_u64(self.nonce);
    }
}

impl Decode for EvmInput {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            address: Address::from(unpacker.unpack_fixed::<20>()?),
            amount: unpacker.unpack_u64()?,
            asset_id: Id::new(unpacker.unpack_fixed::<32>()?),
            nonce: unpacker.unpack_u64()?,
        })
    }
}

/// Whether `inputs` is strictly increasing under the canonical ordering.
///
/// Strictness gives uniqueness for free: equal inputs compare equal and
/// fail the check.
pub fn inputs_sorted_and_unique(inputs: &[EvmInput]) -> bool {
    inputs
        .windows(2)
        .all(|pair| pair[0].sort_key().cmp(&pair[1].sort_key()) == Ordering::Less)
}

/// Sort `inputs` canonically, carrying each input's signer along with it.
///
/// Credentials must stay parallel to inputs, so the signer list is permuted
/// by the same order.
pub fn sort_inputs_and_signers(inputs: &mut Vec<EvmInput>, signers: &mut Vec<SecretKey>) {
    debug_assert_eq!(inputs.len(), signers.len());
    let mut zipped: Vec<(EvmInput, SecretKey)> =
        inputs.drain(..).zip(signers.drain(..)).collect();
    zipped.sort_by(|a, b| a.0.sort_key().cmp(&b.0.sort_key()));
    for (input, signer) in zipped {
        inputs.push(input);
        signers.push(signer);
    }
}
