//! RLP batch form of Ethereum transactions, the EthTxs gossip payload.
//!
//! A batch is an RLP list. Legacy transactions sit in the list as their
//! RLP form; typed transactions are nested as RLP byte strings wrapping
//! `type || payload`, per EIP-2718.

use alloy_rlp::Header;

use crate::envelope::{EthTxError, TxEnvelope};

/// Encode `txs` as one RLP list.
pub fn encode_batch(txs: &[TxEnvelope]) -> Vec<u8> {
    let mut payload = Vec::new();
    for tx in txs {
        match tx {
            TxEnvelope::Legacy(legacy) => legacy.rlp_encode(&mut payload),
            TxEnvelope::Eip1559(_) => {
                let raw = tx.encode();
                Header {
                    list: false,
                    payload_length: raw.len(),
                }
                .encode(&mut payload);
                payload.extend_from_slice(&raw);
            }
        }
    }

    let mut out = Vec::with_capacity(payload.len() + 9);
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(&mut out);
    out.extend_from_slice(&payload);
    out
}

/// Decode an RLP list of transactions. Total: any malformed input is an
/// error, never a panic.
pub fn decode_batch(bytes: &[u8]) -> Result<Vec<TxEnvelope>, EthTxError> {
    let mut buf = bytes;
    let header = Header::decode(&mut buf).map_err(|_| EthTxError::DecodeFailed)?;
    if !header.list || buf.len() < header.payload_length {
        return Err(EthTxError::DecodeFailed);
    }
    let (mut body, rest) = buf.split_at(header.payload_length);
    if !rest.is_empty() {
        return Err(EthTxError::TrailingBytes);
    }

    let mut txs = Vec::new();
    while !body.is_empty() {
        let first_byte = body[0];
        if first_byte >= 0xc0 {
            // Legacy transaction, decoded in place.
            txs.push(TxEnvelope::decode_from(&mut body)?);
        } else if first_byte >= 0x80 {
            // Typed transaction nested as a byte string.
            let string_header =
                Header::decode(&mut body).map_err(|_| EthTxError::DecodeFailed)?;
            if string_header.list || body.len() < string_header.payload_length {
                return Err(EthTxError::DecodeFailed);
            }
            let (raw, remainder) = body.split_at(string_header.payload_length);
            body = remainder;
            txs.push(TxEnvelope::decode(raw)?);
        } else {
            return Err(EthTxError::DecodeFailed);
        }
    }
    Ok(txs)
}
