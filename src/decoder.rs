//! Zero-copy message reader
//!
//! The cursor operates on a borrowed slice and hands out sub-slices of it
//! for variable-length fields. Multi-byte values are read in native byte
//! order, mirroring [`MessageEncoder`](crate::encoder::MessageEncoder).

use crate::error::{Error, Result};

/// Cursor for reading an encoded message with position tracking
#[derive(Debug)]
pub struct MessageCursor<'a> {
    /// Buffer containing the encoded data
    pub buf: &'a [u8],
    /// Current read position
    pub pos: usize,
}

impl<'a> MessageCursor<'a> {
    /// Create a cursor at the start of `buf`
    #[inline]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Get remaining bytes in cursor
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Check if cursor is at end
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Read raw bytes without length prefix
    #[inline]
    pub fn get_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(len)?;
        self.pos += len;
        Ok(bytes)
    }

    /// Peek at bytes without advancing cursor
    #[inline]
    pub fn peek_bytes(&self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(Error::UnexpectedEof)?;
        if end > self.buf.len() {
            return Err(Error::UnexpectedEof);
        }
        Ok(&self.buf[self.pos..end])
    }

    #[inline]
    fn get_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.get_bytes(N)?);
        Ok(out)
    }

    /// Read a u8 value
    #[inline]
    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.get_array::<1>()?[0])
    }

    /// Read a u16 value
    #[inline]
    pub fn get_u16(&mut self) -> Result<u16> {
        Ok(u16::from_ne_bytes(self.get_array()?))
    }

    /// Read a u32 value
    #[inline]
    pub fn get_u32(&mut self) -> Result<u32> {
        Ok(u32::from_ne_bytes(self.get_array()?))
    }

    /// Read a u64 value
    #[inline]
    pub fn get_u64(&mut self) -> Result<u64> {
        Ok(u64::from_ne_bytes(self.get_array()?))
    }

    /// Read bytes carrying a u16 length prefix
    #[inline]
    pub fn get_sized(&mut self) -> Result<&'a [u8]> {
        let len = self.get_u16()? as usize;
        self.get_bytes(len)
    }

    /// Read an identifier with its 1-byte length descriptor
    ///
    /// Invalid UTF-8 is replaced rather than rejected; identifiers are
    /// informational.
    #[inline]
    pub fn get_id(&mut self) -> Result<String> {
        let len = self.get_u8()? as usize;
        let bytes = self.get_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
