//! Fixed-capacity flat argument buffer
//!
//! For call sites that serialize arguments straight into bytes instead of a
//! structured [`Message`](crate::message::Message). Appends either fit
//! entirely or fail with [`Error::BufferOverflow`] and leave the buffer
//! untouched.

use crate::error::{Error, Result};
use crate::MAX_BUFFER_SIZE;

/// A value that can be copied into a [`LogBuffer`]
pub trait AppendValue {
    /// Number of bytes the value occupies
    fn size(&self) -> usize;

    /// Copy the value into `out`, which is exactly [`size`](Self::size) bytes
    fn write_to(&self, out: &mut [u8]);
}

macro_rules! impl_append_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl AppendValue for $ty {
                #[inline]
                fn size(&self) -> usize {
                    core::mem::size_of::<$ty>()
                }

                #[inline]
                fn write_to(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_ne_bytes());
                }
            }
        )*
    };
}

impl_append_scalar!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl AppendValue for bool {
    #[inline]
    fn size(&self) -> usize {
        1
    }

    #[inline]
    fn write_to(&self, out: &mut [u8]) {
        out[0] = u8::from(*self);
    }
}

impl AppendValue for &str {
    #[inline]
    fn size(&self) -> usize {
        self.len()
    }

    #[inline]
    fn write_to(&self, out: &mut [u8]) {
        out.copy_from_slice(self.as_bytes());
    }
}

impl AppendValue for &[u8] {
    #[inline]
    fn size(&self) -> usize {
        self.len()
    }

    #[inline]
    fn write_to(&self, out: &mut [u8]) {
        out.copy_from_slice(self);
    }
}

/// Append-only byte buffer of [`MAX_BUFFER_SIZE`] bytes
pub struct LogBuffer {
    data: [u8; MAX_BUFFER_SIZE],
    len: u16,
}

impl LogBuffer {
    /// Create an empty buffer
    #[inline]
    pub const fn new() -> Self {
        Self {
            data: [0; MAX_BUFFER_SIZE],
            len: 0,
        }
    }

    /// Copy `value` after the bytes already buffered
    pub fn append<V: AppendValue>(&mut self, value: V) -> Result<()> {
        let start = self.len as usize;
        let end = start + value.size();
        if end > MAX_BUFFER_SIZE {
            return Err(Error::BufferOverflow);
        }
        value.write_to(&mut self.data[start..end]);
        // end <= 2048 fits in u16
        self.len = end as u16;
        Ok(())
    }

    /// Bytes buffered so far
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// Number of bytes buffered
    #[inline]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether nothing has been appended
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total capacity in bytes
    #[inline]
    pub const fn capacity(&self) -> usize {
        MAX_BUFFER_SIZE
    }

    /// Space left in bytes
    #[inline]
    pub const fn remaining(&self) -> usize {
        MAX_BUFFER_SIZE - self.len as usize
    }

    /// Discard the buffered bytes
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LogBuffer")
            .field("len", &self.len)
            .field("capacity", &MAX_BUFFER_SIZE)
            .finish()
    }
}
