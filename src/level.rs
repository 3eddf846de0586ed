//! Severity levels and threshold comparison

use core::fmt;

/// Severity of a log message, ordered from least to most verbose
///
/// The numeric value doubles as the DLT log sub-type carried in
/// [`MessageClass`](crate::header::MessageClass).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// No logging
    Off = 0x00,
    /// Fatal error, not recoverable
    Fatal = 0x01,
    /// Error with impact to correct functionality
    Error = 0x02,
    /// Warning if correct behavior cannot be ensured
    Warn = 0x03,
    /// Informational, providing high level understanding
    Info = 0x04,
    /// Detailed information for programmers
    Debug = 0x05,
    /// Extra-verbose debug messages
    Verbose = 0x06,
}

/// Threshold applied when a logger is created without an explicit one
pub const DEFAULT_THRESHOLD: LogLevel = LogLevel::Warn;

/// Name rendered for sub-types that do not map to a [`LogLevel`]
pub const UNKNOWN_LEVEL_NAME: &str = "Unknown";

impl LogLevel {
    /// All levels in numeric order
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Off,
        LogLevel::Fatal,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Verbose,
    ];

    /// Numeric value of the level
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Map a numeric value back to a level
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(LogLevel::Off),
            0x01 => Some(LogLevel::Fatal),
            0x02 => Some(LogLevel::Error),
            0x03 => Some(LogLevel::Warn),
            0x04 => Some(LogLevel::Info),
            0x05 => Some(LogLevel::Debug),
            0x06 => Some(LogLevel::Verbose),
            _ => None,
        }
    }

    /// Display name used in rendered lines
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            LogLevel::Off => "Off",
            LogLevel::Fatal => "Fatal",
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Verbose => "Verbose",
        }
    }

    /// Whether a message at `self` passes `threshold`
    ///
    /// The threshold is the most verbose level still allowed, so `Off` as a
    /// threshold disables every real severity.
    #[inline]
    pub const fn is_enabled_for(self, threshold: LogLevel) -> bool {
        self as u8 <= threshold as u8
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
