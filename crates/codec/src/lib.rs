//! Versioned canonical wire codec.
//!
//! Every consensus-visible object is serialized with this codec: integers
//! big-endian, variable-length fields length-prefixed with a `u32`, enum-like
//! objects tagged with a `u32` type id, and the whole encoding prefixed with
//! a `u16` codec version. The encoding is unambiguous: re-encoding a decoded
//! value yields byte-identical output, which lets canonical byte comparison
//! stand in for structural comparison.

mod pack;

pub use pack::{Packer, Unpacker};

use thiserror::Error;

/// Current codec version. The first two bytes of every top-level encoding.
pub const CODEC_VERSION: u16 = 0;

/// Errors from decoding canonical bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("unsupported codec version: {0}")]
    UnsupportedVersion(u16),

    #[error("unknown type id: {0}")]
    UnknownTypeId(u32),

    #[error("length prefix overflows the input")]
    LengthOverflow,

    #[error("malformed value: {0}")]
    Malformed(&'static str),
}

/// A value with a canonical encoding.
pub trait Encode {
    fn encode(&self, packer: &mut Packer);
}

/// A value decodable from its canonical encoding.
pub trait Decode: Sized {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, CodecError>;
}

/// Serialize `value` with the codec version prefix.
pub fn to_bytes<T: Encode>(value: &T) -> Vec<u8> {
    let mut packer = Packer::new();
    packer.pack_u16(CODEC_VERSION);
    value.encode(&mut packer);
    packer.into_bytes()
}

/// Deserialize a version-prefixed encoding, rejecting version mismatches
/// and trailing bytes.
pub fn from_bytes<T: Decode>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut unpacker = Unpacker::new(bytes);
    let version = unpacker.unpack_u16()?;
    if version != CODEC_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    let value = T::decode(&mut unpacker)?;
    unpacker.finish()?;
    Ok(value)
}
