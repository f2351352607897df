//! Byte-level writer and checked reader.

use crate::CodecError;

/// Append-only canonical byte writer.
///
/// Writing cannot fail; length limits are enforced on the read side and by
/// the message layer's size caps.
#[derive(Debug, Default)]
pub struct Packer {
    buf: Vec<u8>,
}

impl Packer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn pack_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn pack_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn pack_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn pack_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write bytes with no length prefix. For fixed-width fields only.
    pub fn pack_fixed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a `u32` length prefix followed by the bytes.
    pub fn pack_bytes(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= u32::MAX as usize);
        self.pack_u32(bytes.len() as u32);
        self.pack_fixed(bytes);
    }

    /// Write the `u32` element count that precedes a sequence.
    pub fn pack_len(&mut self, len: usize) {
        debug_assert!(len <= u32::MAX as usize);
        self.pack_u32(len as u32);
    }
}

/// Checked reader over canonical bytes. Every read verifies the remaining
/// input before consuming it.
#[derive(Debug)]
pub struct Unpacker<'a> {
    buf: &'a [u8],
}

impl<'a> Unpacker<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.buf.len() < n {
            return Err(CodecError::UnexpectedEof);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    pub fn unpack_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn unpack_u16(&mut self) -> Result<u16, CodecError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn unpack_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn unpack_u64(&mut self) -> Result<u64, CodecError> {
        let bytes = self.take(8)?;
        let mut out = [0u8; 8];
        out.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(out))
    }

    /// Read `N` bytes with no length prefix.
    pub fn unpack_fixed<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read a `u32`-length-prefixed byte string.
    pub fn unpack_bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.unpack_u32()? as usize;
        if len > self.buf.len() {
            return Err(CodecError::LengthOverflow);
        }
        self.take(len)
    }

    /// Read a sequence's element count. The count is bounded by the
    /// remaining input so a hostile prefix cannot force a huge allocation.
    pub fn unpack_len(&mut self) -> Result<usize, CodecError> {
        let len = self.unpack_u32()? as usize;
        if len > self.buf.len() {
            return Err(CodecError::LengthOverflow);
        }
        Ok(len)
    }

    /// Assert the input is fully consumed.
    pub fn finish(&self) -> Result<(), CodecError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes(self.buf.len()))
        }
    }
}
