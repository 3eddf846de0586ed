//! Bounds-checked message writer
//!
//! The encoder writes into a caller-provided buffer. Every multi-byte value
//! is written in native byte order: the binary form is shared between a
//! producer and consumer on the same host, it is not a portable wire format.

use crate::error::{Error, Result};
use crate::header::BaseHeader;

/// Message encoder that writes into a user-provided buffer
pub struct MessageEncoder<'a> {
    buf: &'a mut [u8],
    pos: usize,
    message_start: usize,
}

impl<'a> MessageEncoder<'a> {
    /// Create new encoder with the given buffer
    #[inline]
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            message_start: 0,
        }
    }

    /// Mark the current position as the start of a message
    #[inline]
    pub fn begin(&mut self) {
        self.message_start = self.pos;
    }

    #[inline]
    fn reserve(&mut self, n: usize) -> Result<&mut [u8]> {
        let end = self.pos.checked_add(n).ok_or(Error::ShortBuffer)?;
        if end > self.buf.len() {
            return Err(Error::ShortBuffer);
        }
        let start = self.pos;
        self.pos = end;
        Ok(&mut self.buf[start..end])
    }

    /// Write a u8 value
    #[inline]
    pub fn put_u8(&mut self, value: u8) -> Result<()> {
        self.reserve(1)?[0] = value;
        Ok(())
    }

    /// Write a u16 value
    #[inline]
    pub fn put_u16(&mut self, value: u16) -> Result<()> {
        self.reserve(2)?.copy_from_slice(&value.to_ne_bytes());
        Ok(())
    }

    /// Write a u32 value
    #[inline]
    pub fn put_u32(&mut self, value: u32) -> Result<()> {
        self.reserve(4)?.copy_from_slice(&value.to_ne_bytes());
        Ok(())
    }

    /// Write a u64 value
    #[inline]
    pub fn put_u64(&mut self, value: u64) -> Result<()> {
        self.reserve(8)?.copy_from_slice(&value.to_ne_bytes());
        Ok(())
    }

    /// Write raw bytes without length prefix
    #[inline]
    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Write an identifier with its 1-byte length descriptor
    #[inline]
    pub fn put_id(&mut self, id: &str) -> Result<()> {
        let len = u8::try_from(id.len()).map_err(|_| Error::BufferOverflow)?;
        self.put_u8(len)?;
        self.put_bytes(id.as_bytes())
    }

    /// Write bytes with a u16 length prefix
    #[inline]
    pub fn put_sized(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u16::try_from(bytes.len()).map_err(|_| Error::BufferOverflow)?;
        self.put_u16(len)?;
        self.put_bytes(bytes)
    }

    /// Get current position in buffer
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get remaining buffer capacity
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Finish the current message
    ///
    /// Patches the length field of the base header with the number of bytes
    /// written since [`begin`](Self::begin) and returns that length.
    #[inline]
    pub fn finish(&mut self) -> Result<usize> {
        let len = self.pos - self.message_start;
        let len16 = u16::try_from(len).map_err(|_| Error::BufferOverflow)?;

        let offset = self.message_start + BaseHeader::LENGTH_OFFSET;
        if offset + 2 > self.pos {
            return Err(Error::UnexpectedEof);
        }
        self.buf[offset..offset + 2].copy_from_slice(&len16.to_ne_bytes());
        Ok(len)
    }

    /// Reset encoder for reuse with the same buffer
    #[inline]
    pub fn reset(&mut self) {
        self.pos = 0;
        self.message_start = 0;
    }

    /// Get a slice of the current message
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[self.message_start..self.pos]
    }
}
