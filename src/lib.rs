//! dltlog: DLT-style structured logging
//!
//! Log calls build verbose-mode messages (self-describing typed arguments
//! behind a compact binary header), render them once into a text line and
//! hand them to the handlers registered for the calling logger.
//!
//! # Message Format
//!
//! ```text
//! +-----------+---------+---------+--------+--------+------------------+
//! | Htyp u32  | Cnt u8  | Len u16 | Msin u8| Noar u8| Tmsp ns u32, s u64|
//! +-----------+---------+---------+--------+--------+------------------+
//! | [Extension: ECU id | App id, Ctx id | session | file, line | tags ] |
//! | Arguments: (type_info u32 [len u16] value)*                         |
//! +---------------------------------------------------------------------+
//! ```
//!
//! All multi-byte fields use native byte order.
//!
//! # Flow
//!
//! ```text
//!  LoggerManager ── create_logger ──► Logger ── log_info() ──► LogStream
//!        ▲                                                        │
//!        └──────── handlers for ctx id ◄──── flush / drop ────────┘
//!                         │
//!              Console / File / Rotating / Network
//! ```
//!
//! # Example
//!
//! ```rust
//! use dltlog::*;
//!
//! let manager = LoggerManager::new(Identity::new("ECU1", "APP1"));
//! let logger = manager.create_logger("em", "engine manager", LogLevel::Info);
//! manager.add_logging_handler("em", std::sync::Arc::new(ConsoleHandler::new()))?;
//!
//! logger.log_info().append("speed").append(42u32);
//!
//! // Suppressed: Debug is more verbose than the Info threshold
//! logger.log_debug().append("not shown");
//! # Ok::<(), dltlog::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod argument;
pub mod buffer;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod handler;
pub mod header;
pub mod level;
pub mod logger;
pub mod manager;
pub mod message;
pub mod stamp;
pub mod stream;

// Re-export main types
pub use argument::{Argument, Value};
pub use buffer::LogBuffer;
pub use config::Config;
pub use error::{Error, Result};
pub use handler::{
    ConsoleHandler, FileHandler, LoggingHandler, NetworkHandler, RotatingFileHandler,
    SizeRollover, TimedRollover, Transport,
};
pub use header::{HeaderFlags, MessageClass, Timestamp};
pub use level::LogLevel;
pub use logger::Logger;
pub use manager::LoggerManager;
pub use message::{Identity, Message, MessageBuilder, SharedMessage};
pub use stream::LogStream;

/// DLT protocol version written into every header
pub const PROTOCOL_VERSION: u8 = 2;

/// Capacity of a [`LogBuffer`] in bytes
pub const MAX_BUFFER_SIZE: usize = 2048;
