//! Typed Ethereum transaction envelope.

use alloy_consensus::{Signed, TxEip1559, TxLegacy};
use alloy_primitives::{keccak256, Address, PrimitiveSignature, B256};
use snowfall_core::crypto::{self, SIGNATURE_LEN};
use thiserror::Error;

/// Transaction type constants per EIP-2718.
pub mod tx_type {
    /// Legacy transaction (pre-EIP-2718).
    pub const LEGACY: u8 = 0x00;
    /// EIP-1559 fee market transaction.
    pub const EIP1559: u8 = 0x02;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EthTxError {
    #[error("empty transaction input")]
    EmptyInput,

    #[error("failed to decode transaction")]
    DecodeFailed,

    #[error("trailing bytes after transaction")]
    TrailingBytes,

    #[error("unsupported transaction type: {0:#04x}")]
    UnsupportedType(u8),

    #[error("sender recovery failed")]
    SignatureRecovery,
}

fn recoverable_signature(signature: &PrimitiveSignature) -> [u8; SIGNATURE_LEN] {
    let mut out = [0u8; SIGNATURE_LEN];
    out[..32].copy_from_slice(&signature.r().to_be_bytes::<32>());
    out[32..64].copy_from_slice(&signature.s().to_be_bytes::<32>());
    out[64] = signature.v() as u8;
    out
}

fn recover_sender(signature_hash: B256, signature: &PrimitiveSignature) -> Result<Address, EthTxError> {
    crypto::recover_address(signature_hash, &recoverable_signature(signature))
        .map_err(|_| EthTxError::SignatureRecovery)
}

/// A signed legacy Ethereum transaction with cached sender, hash, and size.
///
/// The hash and size are computed from the bytes as received so they match
/// the original encoding.
#[derive(Clone, Debug)]
pub struct SignedLegacyTx {
    inner: Signed<TxLegacy>,
    sender: Address,
    hash: B256,
    size: usize,
}

impl SignedLegacyTx {
    pub fn from_alloy_with_bytes(
        signed: Signed<TxLegacy>,
        raw_bytes: &[u8],
    ) -> Result<Self, EthTxError> {
        let sender = recover_sender(signed.signature_hash(), signed.signature())?;
        Ok(Self {
            inner: signed,
            sender,
            hash: keccak256(raw_bytes),
            size: raw_bytes.len(),
        })
    }

    pub fn tx(&self) -> &TxLegacy {
        self.inner.tx()
    }

    pub fn rlp_encode(&self, out: &mut Vec<u8>) {
        self.inner.rlp_encode(out);
    }
}

/// A signed EIP-1559 transaction with cached sender, hash, and size.
#[derive(Clone, Debug)]
pub struct SignedEip1559Tx {
    inner: Signed<TxEip1559>,
    sender: Address,
    hash: B256,
    size: usize,
}

impl SignedEip1559Tx {
    /// `rlp_bytes` is the RLP payload without the type prefix; the hash
    /// covers the prefix per EIP-2718, and the size includes it.
    pub fn from_alloy_with_bytes(
        signed: Signed<TxEip1559>,
        rlp_bytes: &[u8],
    ) -> Result<Self, EthTxError> {
        let sender = recover_sender(signed.signature_hash(), signed.signature())?;

        let mut hash_input = Vec::with_capacity(1 + rlp_bytes.len());
        hash_input.push(tx_type::EIP1559);
        hash_input.extend_from_slice(rlp_bytes);

        Ok(Self {
            inner: signed,
            sender,
            hash: keccak256(&hash_input),
            size: hash_input.len(),
        })
    }

    pub fn tx(&self) -> &TxEip1559 {
        self.inner.tx()
    }

    pub fn rlp_encode(&self, out: &mut Vec<u8>) {
        self.inner.rlp_encode(out);
    }
}

/// Unified envelope over the supported transaction types.
#[derive(Clone, Debug)]
pub enum TxEnvelope {
    Legacy(SignedLegacyTx),
    Eip1559(SignedEip1559Tx),
}

impl TxEnvelope {
    /// Encode to the same format `decode` accepts: legacy transactions as
    /// their RLP form, typed transactions with their type prefix.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            TxEnvelope::Legacy(tx) => {
                let mut buf = Vec::new();
                tx.rlp_encode(&mut buf);
                buf
            }
            TxEnvelope::Eip1559(tx) => {
                let mut buf = vec![tx_type::EIP1559];
                tx.rlp_encode(&mut buf);
                buf
            }
        }
    }

    /// Decode one transaction, rejecting trailing bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, EthTxError> {
        let mut input = bytes;
        let tx = Self::decode_from(&mut input)?;
        if !input.is_empty() {
            return Err(EthTxError::TrailingBytes);
        }
        Ok(tx)
    }

    /// Decode a transaction from the front of a byte slice, advancing it.
    ///
    /// Suitable for streaming decoders that process multiple transactions
    /// from a single buffer.
    pub fn decode_from(bytes: &mut &[u8]) -> Result<Self, EthTxError> {
        if bytes.is_empty() {
            return Err(EthTxError::EmptyInput);
        }

        let input = *bytes;
        let first_byte = input[0];

        // Legacy transactions are RLP lists; list prefixes start at 0xc0.
        if first_byte >= 0xc0 {
            let mut cursor = input;
            let signed = Signed::<TxLegacy>::rlp_decode(&mut cursor)
                .map_err(|_| EthTxError::DecodeFailed)?;

            let consumed = input.len().saturating_sub(cursor.len());
            let raw_bytes = &input[..consumed];
            let tx = SignedLegacyTx::from_alloy_with_bytes(signed, raw_bytes)?;
            *bytes = &input[consumed..];
            return Ok(TxEnvelope::Legacy(tx));
        }

        match first_byte {
            tx_type::EIP1559 => {
                let payload = &input[1..];
                let mut cursor = payload;
                let signed = Signed::<TxEip1559>::rlp_decode(&mut cursor)
                    .map_err(|_| EthTxError::DecodeFailed)?;

                let consumed = payload.len().saturating_sub(cursor.len());
                let tx = SignedEip1559Tx::from_alloy_with_bytes(signed, &payload[..consumed])?;
                *bytes = &input[1 + consumed..];
                Ok(TxEnvelope::Eip1559(tx))
            }
            ty => Err(EthTxError::UnsupportedType(ty)),
        }
    }

    pub fn tx_type(&self) -> u8 {
        match self {
            TxEnvelope::Legacy(_) => tx_type::LEGACY,
            TxEnvelope::Eip1559(_) => tx_type::EIP1559,
        }
    }

    pub fn sender(&self) -> Address {
        match self {
            TxEnvelope::Legacy(tx) => tx.sender,
            TxEnvelope::Eip1559(tx) => tx.sender,
        }
    }

    pub fn tx_hash(&self) -> B256 {
        match self {
            TxEnvelope::Legacy(tx) => tx.hash,
            TxEnvelope::Eip1559(tx) => tx.hash,
        }
    }

    pub fn nonce(&self) -> u64 {
        match self {
            TxEnvelope::Legacy(tx) => tx.tx().nonce,
            TxEnvelope::Eip1559(tx) => tx.tx().nonce,
        }
    }

    /// Encoded size in bytes, the quantity gossip batching sums against
    /// its soft cap.
    pub fn size(&self) -> usize {
        match self {
            TxEnvelope::Legacy(tx) => tx.size,
            TxEnvelope::Eip1559(tx) => tx.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{signed_legacy_tx, signing_key_address, test_signing_key};

    #[test]
    fn legacy_roundtrip_preserves_hash_and_sender() {
        let key = test_signing_key(1);
        let tx = signed_legacy_tx(&key, 0, 100);

        let encoded = tx.encode();
        let decoded = TxEnvelope::decode(&encoded).expect("decode");

        assert_eq!(decoded.tx_type(), tx_type::LEGACY);
        assert_eq!(decoded.tx_hash(), tx.tx_hash());
        assert_eq!(decoded.sender(), signing_key_address(&key));
        assert_eq!(decoded.size(), encoded.len());
    }

    #[test]
    fn decode_empty_input_fails() {
        assert!(matches!(
            TxEnvelope::decode(&[]),
            Err(EthTxError::EmptyInput)
        ));
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let key = test_signing_key(2);
        let mut encoded = signed_legacy_tx(&key, 0, 100).encode();
        encoded.push(0x00);
        assert!(matches!(
            TxEnvelope::decode(&encoded),
            Err(EthTxError::TrailingBytes)
        ));
    }

    #[test]
    fn decode_rejects_unsupported_type() {
        assert!(matches!(
            TxEnvelope::decode(&[0x03, 0x01, 0x02]),
            Err(EthTxError::UnsupportedType(0x03))
        ));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            TxEnvelope::decode(&[0xc3, 0x01, 0x02, 0x03]),
            Err(EthTxError::DecodeFailed)
        ));
    }
}
