//! Error types for the DLT logging core

/// Errors that can occur while encoding, decoding, routing or configuring
/// log messages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Append would exceed the bounded buffer capacity
    #[error("buffer overflow")]
    BufferOverflow,
    /// Operation referenced an unregistered logger key
    #[error("logger not found: {0}")]
    LoggerNotFound(String),
    /// Config collaborator failed to load or parse
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// Unrecognized sink name during manager initialization
    #[error("invalid log sink: {0}")]
    InvalidLogSink(String),
    /// Argument type info or payload could not be decoded
    #[error("malformed argument")]
    MalformedArgument,
    /// Output buffer too small for the operation
    #[error("buffer too small for operation")]
    ShortBuffer,
    /// Unexpected end of encoded message data
    #[error("unexpected end of message data")]
    UnexpectedEof,
    /// Header flags request a feature this codec does not carry
    #[error("conflicting flags in message header")]
    FlagConflict,
    /// Timestamp field holds an out-of-range value
    #[error("invalid timestamp")]
    InvalidTimestamp,
    /// Header version field is not the supported protocol version
    #[error("unsupported protocol version")]
    UnsupportedVersion,
    /// Sink I/O failed
    #[error("i/o error: {0}")]
    Io(String),
}

impl Error {
    /// Returns a short, static description of the error kind
    pub const fn description(&self) -> &'static str {
        match self {
            Error::BufferOverflow => "buffer overflow",
            Error::LoggerNotFound(_) => "logger not found",
            Error::InvalidConfig(_) => "invalid config",
            Error::InvalidLogSink(_) => "invalid log sink",
            Error::MalformedArgument => "malformed argument",
            Error::ShortBuffer => "buffer too small for operation",
            Error::UnexpectedEof => "unexpected end of message data",
            Error::FlagConflict => "conflicting flags in message header",
            Error::InvalidTimestamp => "invalid timestamp",
            Error::UnsupportedVersion => "unsupported protocol version",
            Error::Io(_) => "i/o error",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// Result type alias for logging operations
pub type Result<T> = core::result::Result<T, Error>;
