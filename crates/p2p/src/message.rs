//! Wire messages exchanged over app gossip.
//!
//! A message is a codec version, a one-byte tag, and a length-prefixed
//! payload. Parsing is total: unknown tags, truncated payloads, trailing
//! bytes, and oversized messages are all errors, and message-layer errors
//! are never fatal to the transport.

use snowfall_codec::{CodecError, Packer, Unpacker, CODEC_VERSION};
use thiserror::Error;

/// Hard per-message size limit, enforced on both build and parse.
pub const MAX_MESSAGE_SIZE: usize = 256 * 1024;

/// Soft cap on the summed size of transactions in one EthTxs message.
/// A single transaction above the cap is still sent alone.
pub const ETH_TXS_SOFT_CAP_SIZE: usize = 64 * 1024;

mod tag {
    pub const ATOMIC_TX: u8 = 0;
    pub const ETH_TXS: u8 = 1;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("message of {0} bytes exceeds the {MAX_MESSAGE_SIZE}-byte limit")]
    TooLarge(usize),

    #[error("unknown message tag: {0}")]
    UnknownTag(u8),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A parsed gossip message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// One atomic transaction, as its full signed canonical encoding.
    AtomicTx { tx: Vec<u8> },
    /// A batch of Ethereum transactions, RLP-encoded as a list.
    EthTxs { txs: Vec<u8> },
}

impl Message {
    /// Serialize for the wire.
    pub fn build(&self) -> Result<Vec<u8>, MessageError> {
        let mut packer = Packer::new();
        packer.pack_u16(CODEC_VERSION);
        match self {
            Message::AtomicTx { tx } => {
                packer.pack_u8(tag::ATOMIC_TX);
                packer.pack_bytes(tx);
            }
            Message::EthTxs { txs } => {
                packer.pack_u8(tag::ETH_TXS);
                packer.pack_bytes(txs);
            }
        }
        let bytes = packer.into_bytes();
        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(MessageError::TooLarge(bytes.len()));
        }
        Ok(bytes)
    }

    /// Parse wire bytes into a typed message.
    pub fn parse(bytes: &[u8]) -> Result<Self, MessageError> {
        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(MessageError::TooLarge(bytes.len()));
        }

        let mut unpacker = Unpacker::new(bytes);
        let version = unpacker.unpack_u16()?;
        if version != CODEC_VERSION {
            return Err(CodecError::UnsupportedVersion(version).into());
        }

        let message = match unpacker.unpack_u8()? {
            tag::ATOMIC_TX => Message::AtomicTx {
                tx: unpacker.unpack_bytes()?.to_vec(),
            },
            tag::ETH_TXS => Message::EthTxs {
                txs: unpacker.unpack_bytes()?.to_vec(),
            },
            unknown => return Err(MessageError::UnknownTag(unknown)),
        };
        unpacker.finish()?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_tx_roundtrip() {
        let msg = Message::AtomicTx {
            tx: vec![1, 2, 3, 4],
        };
        let bytes = msg.build().unwrap();
        assert_eq!(Message::parse(&bytes), Ok(msg));
    }

    #[test]
    fn eth_txs_roundtrip() {
        let msg = Message::EthTxs {
            txs: vec![9; 1000],
        };
        let bytes = msg.build().unwrap();
        assert_eq!(Message::parse(&bytes), Ok(msg));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let msg = Message::AtomicTx { tx: vec![1] };
        let mut bytes = msg.build().unwrap();
        bytes[2] = 0x7F;
        assert_eq!(Message::parse(&bytes), Err(MessageError::UnknownTag(0x7F)));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let msg = Message::AtomicTx { tx: vec![1; 64] };
        let bytes = msg.build().unwrap();
        assert!(matches!(
            Message::parse(&bytes[..bytes.len() - 8]),
            Err(MessageError::Codec(_))
        ));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let msg = Message::EthTxs { txs: vec![5; 16] };
        let mut bytes = msg.build().unwrap();
        bytes.push(0);
        assert!(matches!(
            Message::parse(&bytes),
            Err(MessageError::Codec(CodecError::TrailingBytes(1)))
        ));
    }

    #[test]
    fn oversized_messages_are_rejected_both_ways() {
        let msg = Message::EthTxs {
            txs: vec![0; MAX_MESSAGE_SIZE],
        };
        assert!(matches!(msg.build(), Err(MessageError::TooLarge(_))));

        let bytes = vec![0u8; MAX_MESSAGE_SIZE + 1];
        assert!(matches!(
            Message::parse(&bytes),
            Err(MessageError::TooLarge(_))
        ));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            Message::parse(&[]),
            Err(MessageError::Codec(CodecError::UnexpectedEof))
        ));
    }
}
