//! Verbose-mode argument codec
//!
//! Every argument travels as a 32-bit type-info word followed by the raw
//! value bytes. The type-info word carries exactly one kind bit and, for
//! fixed-width kinds, a width code in the low nibble:
//!
//! ```text
//!  bit  0-3   width code (1=8, 2=16, 3=32, 4=64 bit)
//!  bit  4     bool
//!  bit  5     signed integer
//!  bit  6     unsigned integer
//!  bit  7     float (width 3 = f32, width 4 = f64)
//!  bit  9     string (coding in bits 15-17, 1 = UTF-8)
//!  bit 10     raw bytes
//! ```
//!
//! Fixed-width values are copied in native byte order. Strings and raw
//! bytes carry no terminator; in a flat message stream they are preceded by
//! a u16 byte count.

use core::fmt;
use std::borrow::Cow;

use crate::decoder::MessageCursor;
use crate::encoder::MessageEncoder;
use crate::error::{Error, Result};
use crate::level::LogLevel;

/// Type-info word bit definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo;

impl TypeInfo {
    /// Width code mask (bits 0-3)
    pub const WIDTH_MASK: u32 = 0x0F;
    /// 8-bit width code
    pub const WIDTH_8: u32 = 0x1;
    /// 16-bit width code
    pub const WIDTH_16: u32 = 0x2;
    /// 32-bit width code
    pub const WIDTH_32: u32 = 0x3;
    /// 64-bit width code
    pub const WIDTH_64: u32 = 0x4;

    /// Bool kind (bit 4)
    pub const BOOL: u32 = 1 << 4;
    /// Signed integer kind (bit 5)
    pub const SIGNED: u32 = 1 << 5;
    /// Unsigned integer kind (bit 6)
    pub const UNSIGNED: u32 = 1 << 6;
    /// Float kind (bit 7)
    pub const FLOAT: u32 = 1 << 7;
    /// String kind (bit 9)
    pub const STRING: u32 = 1 << 9;
    /// Raw bytes kind (bit 10)
    pub const RAW: u32 = 1 << 10;
    /// All kind bits
    pub const KIND_MASK: u32 =
        Self::BOOL | Self::SIGNED | Self::UNSIGNED | Self::FLOAT | Self::STRING | Self::RAW;

    /// String coding shift
    pub const CODING_SHIFT: u32 = 15;
    /// String coding mask (bits 15-17)
    pub const CODING_MASK: u32 = 0x7 << Self::CODING_SHIFT;
    /// ASCII string coding
    pub const CODING_ASCII: u32 = 0x0 << Self::CODING_SHIFT;
    /// UTF-8 string coding
    pub const CODING_UTF8: u32 = 0x1 << Self::CODING_SHIFT;

    /// Byte count implied by a width code, if the code is a fixed width
    #[inline]
    pub const fn width_bytes(type_info: u32) -> Option<usize> {
        match type_info & Self::WIDTH_MASK {
            Self::WIDTH_8 => Some(1),
            Self::WIDTH_16 => Some(2),
            Self::WIDTH_32 => Some(4),
            Self::WIDTH_64 => Some(8),
            _ => None,
        }
    }
}

/// A single typed argument value
///
/// Strings and byte sequences borrow from their source when decoded and
/// own their bytes once stored in a message (see [`Argument`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// Boolean
    Bool(bool),
    /// Signed 8-bit integer
    I8(i8),
    /// Signed 16-bit integer
    I16(i16),
    /// Signed 32-bit integer
    I32(i32),
    /// Signed 64-bit integer
    I64(i64),
    /// Unsigned 8-bit integer
    U8(u8),
    /// Unsigned 16-bit integer
    U16(u16),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Unsigned 64-bit integer
    U64(u64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// UTF-8 string
    Str(Cow<'a, str>),
    /// Raw byte sequence
    Raw(Cow<'a, [u8]>),
}

/// An owned argument as stored in a message
pub type Argument = Value<'static>;

impl<'a> Value<'a> {
    /// Type-info word describing this value
    pub fn type_info(&self) -> u32 {
        match self {
            Value::Bool(_) => TypeInfo::BOOL | TypeInfo::WIDTH_8,
            Value::I8(_) => TypeInfo::SIGNED | TypeInfo::WIDTH_8,
            Value::I16(_) => TypeInfo::SIGNED | TypeInfo::WIDTH_16,
            Value::I32(_) => TypeInfo::SIGNED | TypeInfo::WIDTH_32,
            Value::I64(_) => TypeInfo::SIGNED | TypeInfo::WIDTH_64,
            Value::U8(_) => TypeInfo::UNSIGNED | TypeInfo::WIDTH_8,
            Value::U16(_) => TypeInfo::UNSIGNED | TypeInfo::WIDTH_16,
            Value::U32(_) => TypeInfo::UNSIGNED | TypeInfo::WIDTH_32,
            Value::U64(_) => TypeInfo::UNSIGNED | TypeInfo::WIDTH_64,
            Value::F32(_) => TypeInfo::FLOAT | TypeInfo::WIDTH_32,
            Value::F64(_) => TypeInfo::FLOAT | TypeInfo::WIDTH_64,
            Value::Str(_) => TypeInfo::STRING | TypeInfo::CODING_UTF8,
            Value::Raw(_) => TypeInfo::RAW,
        }
    }

    /// Raw value bytes in native byte order
    pub fn payload(&self) -> Cow<'_, [u8]> {
        match self {
            Value::Bool(v) => Cow::Owned(vec![u8::from(*v)]),
            Value::I8(v) => Cow::Owned(v.to_ne_bytes().to_vec()),
            Value::I16(v) => Cow::Owned(v.to_ne_bytes().to_vec()),
            Value::I32(v) => Cow::Owned(v.to_ne_bytes().to_vec()),
            Value::I64(v) => Cow::Owned(v.to_ne_bytes().to_vec()),
            Value::U8(v) => Cow::Owned(vec![*v]),
            Value::U16(v) => Cow::Owned(v.to_ne_bytes().to_vec()),
            Value::U32(v) => Cow::Owned(v.to_ne_bytes().to_vec()),
            Value::U64(v) => Cow::Owned(v.to_ne_bytes().to_vec()),
            Value::F32(v) => Cow::Owned(v.to_ne_bytes().to_vec()),
            Value::F64(v) => Cow::Owned(v.to_ne_bytes().to_vec()),
            Value::Str(s) => Cow::Borrowed(s.as_bytes()),
            Value::Raw(b) => Cow::Borrowed(b.as_ref()),
        }
    }

    /// Number of value bytes (excluding type info and length prefix)
    pub fn payload_len(&self) -> usize {
        match self {
            Value::Bool(_) | Value::I8(_) | Value::U8(_) => 1,
            Value::I16(_) | Value::U16(_) => 2,
            Value::I32(_) | Value::U32(_) | Value::F32(_) => 4,
            Value::I64(_) | Value::U64(_) | Value::F64(_) => 8,
            Value::Str(s) => s.len(),
            Value::Raw(b) => b.len(),
        }
    }

    /// Whether the encoded form carries a u16 length prefix
    #[inline]
    pub const fn is_variable_length(&self) -> bool {
        matches!(self, Value::Str(_) | Value::Raw(_))
    }

    /// Bytes this value occupies in a flat message stream
    pub fn encoded_len(&self) -> usize {
        let prefix = if self.is_variable_length() { 2 } else { 0 };
        4 + prefix + self.payload_len()
    }

    /// Detach from any borrowed source
    pub fn into_owned(self) -> Argument {
        match self {
            Value::Bool(v) => Value::Bool(v),
            Value::I8(v) => Value::I8(v),
            Value::I16(v) => Value::I16(v),
            Value::I32(v) => Value::I32(v),
            Value::I64(v) => Value::I64(v),
            Value::U8(v) => Value::U8(v),
            Value::U16(v) => Value::U16(v),
            Value::U32(v) => Value::U32(v),
            Value::U64(v) => Value::U64(v),
            Value::F32(v) => Value::F32(v),
            Value::F64(v) => Value::F64(v),
            Value::Str(s) => Value::Str(Cow::Owned(s.into_owned())),
            Value::Raw(b) => Value::Raw(Cow::Owned(b.into_owned())),
        }
    }
}

/// Encode a value into its type-info word and value bytes
pub fn encode(value: &Value<'_>) -> (u32, Vec<u8>) {
    (value.type_info(), value.payload().into_owned())
}

/// Decode a value from its type-info word and value bytes
///
/// Strings and raw bytes borrow from `bytes`. Fails with
/// [`Error::MalformedArgument`] when the type info does not name exactly one
/// kind, when the width code is not valid for that kind, or when `bytes`
/// does not hold exactly the implied number of bytes.
pub fn decode(type_info: u32, bytes: &[u8]) -> Result<Value<'_>> {
    let kind = type_info & TypeInfo::KIND_MASK;
    if kind.count_ones() != 1 {
        return Err(Error::MalformedArgument);
    }
    let known = TypeInfo::WIDTH_MASK | TypeInfo::KIND_MASK | TypeInfo::CODING_MASK;
    if type_info & !known != 0 {
        return Err(Error::MalformedArgument);
    }
    if kind != TypeInfo::STRING && type_info & TypeInfo::CODING_MASK != 0 {
        return Err(Error::MalformedArgument);
    }

    let width = type_info & TypeInfo::WIDTH_MASK;
    match kind {
        TypeInfo::BOOL => match (width, fixed::<1>(type_info, bytes)?) {
            (TypeInfo::WIDTH_8, [0]) => Ok(Value::Bool(false)),
            (TypeInfo::WIDTH_8, [1]) => Ok(Value::Bool(true)),
            _ => Err(Error::MalformedArgument),
        },
        TypeInfo::SIGNED => match width {
            TypeInfo::WIDTH_8 => Ok(Value::I8(i8::from_ne_bytes(fixed(type_info, bytes)?))),
            TypeInfo::WIDTH_16 => Ok(Value::I16(i16::from_ne_bytes(fixed(type_info, bytes)?))),
            TypeInfo::WIDTH_32 => Ok(Value::I32(i32::from_ne_bytes(fixed(type_info, bytes)?))),
            TypeInfo::WIDTH_64 => Ok(Value::I64(i64::from_ne_bytes(fixed(type_info, bytes)?))),
            _ => Err(Error::MalformedArgument),
        },
        TypeInfo::UNSIGNED => match width {
            TypeInfo::WIDTH_8 => Ok(Value::U8(u8::from_ne_bytes(fixed(type_info, bytes)?))),
            TypeInfo::WIDTH_16 => Ok(Value::U16(u16::from_ne_bytes(fixed(type_info, bytes)?))),
            TypeInfo::WIDTH_32 => Ok(Value::U32(u32::from_ne_bytes(fixed(type_info, bytes)?))),
            TypeInfo::WIDTH_64 => Ok(Value::U64(u64::from_ne_bytes(fixed(type_info, bytes)?))),
            _ => Err(Error::MalformedArgument),
        },
        TypeInfo::FLOAT => match width {
            TypeInfo::WIDTH_32 => Ok(Value::F32(f32::from_ne_bytes(fixed(type_info, bytes)?))),
            TypeInfo::WIDTH_64 => Ok(Value::F64(f64::from_ne_bytes(fixed(type_info, bytes)?))),
            _ => Err(Error::MalformedArgument),
        },
        TypeInfo::STRING => {
            let coding = type_info & TypeInfo::CODING_MASK;
            if width != 0 || (coding != TypeInfo::CODING_UTF8 && coding != TypeInfo::CODING_ASCII)
            {
                return Err(Error::MalformedArgument);
            }
            let text = core::str::from_utf8(bytes).map_err(|_| Error::MalformedArgument)?;
            Ok(Value::Str(Cow::Borrowed(text)))
        }
        TypeInfo::RAW if width == 0 => Ok(Value::Raw(Cow::Borrowed(bytes))),
        _ => Err(Error::MalformedArgument),
    }
}

/// Copy exactly `N` bytes, checking them against the width code
#[inline]
fn fixed<const N: usize>(type_info: u32, bytes: &[u8]) -> Result<[u8; N]> {
    if TypeInfo::width_bytes(type_info) != Some(N) {
        return Err(Error::MalformedArgument);
    }
    bytes.try_into().map_err(|_| Error::MalformedArgument)
}

/// Write a value into a flat message stream
pub fn encode_into(value: &Value<'_>, encoder: &mut MessageEncoder<'_>) -> Result<()> {
    encoder.put_u32(value.type_info())?;
    let payload = value.payload();
    if value.is_variable_length() {
        encoder.put_sized(&payload)
    } else {
        encoder.put_bytes(&payload)
    }
}

/// Read a value from a flat message stream
pub fn decode_from<'a>(cursor: &mut MessageCursor<'a>) -> Result<Value<'a>> {
    let type_info = cursor.get_u32()?;
    let kind = type_info & TypeInfo::KIND_MASK;
    let bytes = if kind == TypeInfo::STRING || kind == TypeInfo::RAW {
        cursor.get_sized()?
    } else {
        let len = TypeInfo::width_bytes(type_info).ok_or(Error::MalformedArgument)?;
        cursor.get_bytes(len)?
    };
    decode(type_info, bytes)
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::I8(v) => write!(f, "{v}"),
            Value::I16(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::U16(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
            Value::Raw(bytes) => {
                for byte in bytes.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value<'_> {
                #[inline]
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

impl_from_scalar!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
);

impl<'a> From<&'a str> for Value<'a> {
    #[inline]
    fn from(value: &'a str) -> Self {
        Value::Str(Cow::Borrowed(value))
    }
}

impl From<String> for Value<'_> {
    #[inline]
    fn from(value: String) -> Self {
        Value::Str(Cow::Owned(value))
    }
}

impl<'a> From<&'a String> for Value<'a> {
    #[inline]
    fn from(value: &'a String) -> Self {
        Value::Str(Cow::Borrowed(value.as_str()))
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    #[inline]
    fn from(value: &'a [u8]) -> Self {
        Value::Raw(Cow::Borrowed(value))
    }
}

impl From<Vec<u8>> for Value<'_> {
    #[inline]
    fn from(value: Vec<u8>) -> Self {
        Value::Raw(Cow::Owned(value))
    }
}

/// Severity levels are logged as their name
impl From<LogLevel> for Value<'_> {
    #[inline]
    fn from(value: LogLevel) -> Self {
        Value::Str(Cow::Borrowed(value.name()))
    }
}
