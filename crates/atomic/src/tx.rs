//! The export transaction and its signed wrapper.

use alloy_primitives::keccak256;
use secp256k1::SecretKey;
use snowfall_codec::{self as codec, CodecError, Decode, Encode, Packer, Unpacker};
use snowfall_core::crypto;
use snowfall_core::math::{add64, mul64, sub64};
use snowfall_core::params::{OUTPUT_GAS, TX_BYTES_GAS};
use snowfall_core::Id;

use crate::credential::Credential;
use crate::error::TxError;
use crate::input::EvmInput;
use crate::output::TransferableOutput;

/// An unsigned export: EVM debits in, destination-chain UTXOs out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedExportTx {
    /// Id of the network on which this tx was issued.
    pub network_id: u32,
    /// Id of the issuing blockchain.
    pub blockchain_id: Id,
    /// Chain the funds are exported to.
    pub destination_chain: Id,
    /// EVM account debits.
    pub inputs: Vec<EvmInput>,
    /// Outputs credited to the destination chain.
    pub exported_outputs: Vec<TransferableOutput>,
}

impl UnsignedExportTx {
    /// Amount of `asset_id` consumed by inputs beyond what the outputs
    /// produce. For the native asset this is the fee paid.
    pub fn burned(&self, asset_id: Id) -> Result<u64, TxError> {
        let mut produced = 0u64;
        for out in &self.exported_outputs {
            if out.asset_id == asset_id {
                produced = add64(produced, out.output.amount)?;
            }
        }
        let mut consumed = 0u64;
        for input in &self.inputs {
            if input.asset_id == asset_id {
                consumed = add64(consumed, input.amount)?;
            }
        }
        Ok(sub64(consumed, produced)?)
    }
}

impl Encode for UnsignedExportTx {
    fn encode(&self, packer: &mut Packer) {
        packer.pack_u32(self.network_id);
        packer.pack_fixed(self.blockchain_id.as_bytes());
        packer.pack_fixed(self.destination_chain.as_bytes());
        packer.pack_len(self.inputs.len());
        for input in &self.inputs {
            input.encode(packer);
        }
        packer.pack_len(self.exported_outputs.len());
        for output in &self.exported_outputs {
            output.encode(packer);
        }
    }
}

impl Decode for UnsignedExportTx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        let network_id = unpacker.unpack_u32()?;
        let blockchain_id = Id::new(unpacker.unpack_fixed::<32>()?);
        let destination_chain = Id::new(unpacker.unpack_fixed::<32>()?);

        let input_count = unpacker.unpack_len()?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            inputs.push(EvmInput::decode(unpacker)?);
        }

        let output_count = unpacker.unpack_len()?;
        let mut exported_outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            exported_outputs.push(TransferableOutput::decode(unpacker)?);
        }

        Ok(Self {
            network_id,
            blockchain_id,
            destination_chain,
            inputs,
            exported_outputs,
        })
    }
}

/// A signed export transaction with cached canonical bytes and id.
///
/// The cached bytes are the ones the id and signatures commit to. On the
/// local path they come from signing; on the remote path `parse` recomputes
/// the unsigned bytes from the decoded object so a peer's non-canonical
/// encoding cannot change what the signatures are checked against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tx {
    pub unsigned: UnsignedExportTx,
    pub credentials: Vec<Credential>,
    unsigned_bytes: Vec<u8>,
    signed_bytes: Vec<u8>,
    id: Id,
}

impl Tx {
    /// Sign `unsigned` with one signer per input, in input order.
    pub fn sign(unsigned: UnsignedExportTx, signers: &[SecretKey]) -> Result<Self, TxError> {
        if signers.len() != unsigned.inputs.len() {
            return Err(TxError::SignerInputsMismatch {
                signers: signers.len(),
                inputs: unsigned.inputs.len(),
            });
        }

        let unsigned_bytes = codec::to_bytes(&unsigned);
        let digest = keccak256(&unsigned_bytes);

        let credentials: Vec<Credential> = signers
            .iter()
            .map(|signer| Credential {
                signature: crypto::sign_recoverable(digest, signer),
            })
            .collect();

        let mut tx = Self {
            unsigned,
            credentials,
            unsigned_bytes,
            signed_bytes: Vec::new(),
            id: Id::ZERO,
        };
        let signed_bytes = codec::to_bytes(&tx);
        tx.initialize_bytes(signed_bytes);
        Ok(tx)
    }

    /// Parse a signed transaction received from a peer.
    ///
    /// The unsigned bytes are recomputed from the decoded object while the
    /// signed bytes (and therefore the id) are the bytes as received, so a
    /// re-encoding peer and an honest peer agree on what was signed.
    pub fn parse(bytes: &[u8]) -> Result<Self, TxError> {
        let mut tx: Tx = codec::from_bytes(bytes)?;
        tx.unsigned_bytes = codec::to_bytes(&tx.unsigned);
        tx.initialize_bytes(bytes.to_vec());
        Ok(tx)
    }

    fn initialize_bytes(&mut self, signed_bytes: Vec<u8>) {
        self.id = Id::from_digest_of(&signed_bytes);
        self.signed_bytes = signed_bytes;
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// The bytes signatures are recovered against.
    pub fn unsigned_bytes(&self) -> &[u8] {
        &self.unsigned_bytes
    }

    /// The full canonical encoding, as gossiped.
    pub fn signed_bytes(&self) -> &[u8] {
        &self.signed_bytes
    }

    /// Gas consumed by this transaction: a charge per exported output plus
    /// a charge per signed byte.
    pub fn gas(&self) -> Result<u64, TxError> {
        let output_gas = mul64(OUTPUT_GAS, self.unsigned.exported_outputs.len() as u64)?;
        let bytes_gas = mul64(TX_BYTES_GAS, self.signed_bytes.len() as u64)?;
        Ok(add64(output_gas, bytes_gas)?)
    }
}

impl Encode for Tx {
    fn encode(&self, packer: &mut Packer) {
        self.unsigned.encode(packer);
        packer.pack_len(self.credentials.len());
        for credential in &self.credentials {
            credential.encode(packer);
        }
    }
}

impl Decode for Tx {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, CodecError> {
        let unsigned = UnsignedExportTx::decode(unpacker)?;
        let count = unpacker.unpack_len()?;
        let mut credentials = Vec::with_capacity(count);
        for _ in 0..count {
            credentials.push(Credential::decode(unpacker)?);
        }
        Ok(Self {
            unsigned,
            credentials,
            unsigned_bytes: Vec::new(),
            signed_bytes: Vec::new(),
            id: Id::ZERO,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::TransferOutput;
    use alloy_primitives::Address;
    use snowfall_core::crypto::address_from_secret_key;

    fn secret(byte: u8) -> SecretKey {
        SecretKey::from_slice(&[byte; 32]).unwrap()
    }

    fn unsigned_tx(signer: &SecretKey) -> UnsignedExportTx {
        UnsignedExportTx {
            network_id: 5,
            blockchain_id: Id::new([1; 32]),
            destination_chain: Id::new([2; 32]),
            inputs: vec![EvmInput {
                address: address_from_secret_key(signer),
                amount: 2_000_000,
                asset_id: Id::new([3; 32]),
                nonce: 0,
            }],
            exported_outputs: vec![TransferableOutput {
                asset_id: Id::new([3; 32]),
                output: TransferOutput {
                    amount: 1_000_000,
                    locktime: 0,
                    threshold: 1,
                    addresses: vec![Address::repeat_byte(0xBB)],
                },
            }],
        }
    }

    #[test]
    fn sign_populates_bytes_and_id() {
        let key = secret(7);
        let tx = Tx::sign(unsigned_tx(&key), &[key]).unwrap();

        assert!(!tx.unsigned_bytes().is_empty());
        assert!(!tx.signed_bytes().is_empty());
        assert_eq!(tx.id(), Id::from_digest_of(tx.signed_bytes()));
        assert_eq!(tx.credentials.len(), 1);
    }

    #[test]
    fn sign_rejects_signer_count_mismatch() {
        let key = secret(7);
        let result = Tx::sign(unsigned_tx(&key), &[]);
        assert_eq!(
            result.unwrap_err(),
            TxError::SignerInputsMismatch {
                signers: 0,
                inputs: 1
            }
        );
    }

    #[test]
    fn parse_roundtrips_signed_bytes() {
        let key = secret(9);
        let tx = Tx::sign(unsigned_tx(&key), &[key]).unwrap();

        let parsed = Tx::parse(tx.signed_bytes()).unwrap();
        assert_eq!(parsed.unsigned, tx.unsigned);
        assert_eq!(parsed.credentials, tx.credentials);
        assert_eq!(parsed.unsigned_bytes(), tx.unsigned_bytes());
        assert_eq!(parsed.signed_bytes(), tx.signed_bytes());
        assert_eq!(parsed.id(), tx.id());
    }

    #[test]
    fn parse_rejects_truncated_bytes() {
        let key = secret(9);
        let tx = Tx::sign(unsigned_tx(&key), &[key]).unwrap();
        let bytes = tx.signed_bytes();
        assert!(Tx::parse(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn parse_rejects_trailing_bytes() {
        let key = secret(9);
        let tx = Tx::sign(unsigned_tx(&key), &[key]).unwrap();
        let mut bytes = tx.signed_bytes().to_vec();
        bytes.push(0);
        assert!(matches!(
            Tx::parse(&bytes),
            Err(TxError::Codec(CodecError::TrailingBytes(1)))
        ));
    }

    #[test]
    fn burned_is_inputs_minus_outputs_per_asset() {
        let key = secret(9);
        let unsigned = unsigned_tx(&key);
        assert_eq!(unsigned.burned(Id::new([3; 32])), Ok(1_000_000));
        assert_eq!(unsigned.burned(Id::new([4; 32])), Ok(0));
    }

    #[test]
    fn burned_errors_when_outputs_exceed_inputs() {
        let key = secret(9);
        let mut unsigned = unsigned_tx(&key);
        unsigned.exported_outputs[0].output.amount = 3_000_000;
        assert_eq!(unsigned.burned(Id::new([3; 32])), Err(TxError::Overflow));
    }

    #[test]
    fn gas_scales_with_outputs_and_size() {
        let key = secret(9);
        let tx = Tx::sign(unsigned_tx(&key), &[key]).unwrap();
        let expected = OUTPUT_GAS + TX_BYTES_GAS * tx.signed_bytes().len() as u64;
        assert_eq!(tx.gas(), Ok(expected));
    }
}
