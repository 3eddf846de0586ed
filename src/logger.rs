//! Named, thresholded logging endpoint

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use crate::level::LogLevel;
use crate::manager::Registry;
use crate::message::{Identity, SharedMessage};
use crate::stamp::StampSource;
use crate::stream::LogStream;

/// A logging context registered in a [`LoggerManager`](crate::LoggerManager)
///
/// Loggers are only created through the manager, which owns them. Streams
/// borrow the logger they were opened from; finished messages are routed
/// back through the manager to the handlers registered for [`key`](Self::key).
pub struct Logger {
    key: String,
    description: String,
    threshold: AtomicU8,
    identity: Identity,
    stamps: Arc<dyn StampSource>,
    registry: Weak<Registry>,
}

impl Logger {
    pub(crate) fn new(
        key: &str,
        description: &str,
        threshold: LogLevel,
        identity: Identity,
        stamps: Arc<dyn StampSource>,
        registry: Weak<Registry>,
    ) -> Self {
        Self {
            key: key.to_owned(),
            description: description.to_owned(),
            threshold: AtomicU8::new(threshold.as_u8()),
            identity,
            stamps,
            registry,
        }
    }

    /// Context id this logger is registered under
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Human readable description of the context
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Current severity threshold
    #[inline]
    pub fn threshold(&self) -> LogLevel {
        LogLevel::from_u8(self.threshold.load(Ordering::Relaxed)).unwrap_or(LogLevel::Off)
    }

    /// Replace the severity threshold; open streams see the change on their
    /// next append
    #[inline]
    pub fn set_threshold(&self, level: LogLevel) {
        self.threshold.store(level.as_u8(), Ordering::Relaxed);
    }

    /// Whether messages at `level` pass the current threshold
    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level.is_enabled_for(self.threshold())
    }

    /// Open a stream at an explicit severity
    pub fn with_level(&self, level: LogLevel) -> LogStream<'_> {
        LogStream::new(self, level)
    }

    /// Open a stream at [`LogLevel::Fatal`]
    #[inline]
    pub fn log_fatal(&self) -> LogStream<'_> {
        self.with_level(LogLevel::Fatal)
    }

    /// Open a stream at [`LogLevel::Error`]
    #[inline]
    pub fn log_error(&self) -> LogStream<'_> {
        self.with_level(LogLevel::Error)
    }

    /// Open a stream at [`LogLevel::Warn`]
    #[inline]
    pub fn log_warn(&self) -> LogStream<'_> {
        self.with_level(LogLevel::Warn)
    }

    /// Open a stream at [`LogLevel::Info`]
    #[inline]
    pub fn log_info(&self) -> LogStream<'_> {
        self.with_level(LogLevel::Info)
    }

    /// Open a stream at [`LogLevel::Debug`]
    #[inline]
    pub fn log_debug(&self) -> LogStream<'_> {
        self.with_level(LogLevel::Debug)
    }

    /// Open a stream at [`LogLevel::Verbose`]
    #[inline]
    pub fn log_verbose(&self) -> LogStream<'_> {
        self.with_level(LogLevel::Verbose)
    }

    pub(crate) fn identity(&self) -> &Identity {
        &self.identity
    }

    pub(crate) fn stamps(&self) -> &dyn StampSource {
        self.stamps.as_ref()
    }

    /// Hand a finished message to every handler registered for this logger,
    /// in registration order, on the calling thread
    pub(crate) fn dispatch(&self, message: SharedMessage) {
        let handlers = self
            .registry
            .upgrade()
            .and_then(|registry| registry.handlers(&self.key).ok());

        match handlers {
            Some(handlers) => {
                for handler in &handlers {
                    handler.emit(Arc::clone(&message));
                }
            }
            None => {
                eprintln!("dltlog: no logger registered for context '{}', message dropped", self.key);
                tracing::warn!(ctx_id = %self.key, "flush to unregistered logger, message dropped");
            }
        }
    }
}

impl core::fmt::Debug for Logger {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Logger")
            .field("key", &self.key)
            .field("description", &self.description)
            .field("threshold", &self.threshold())
            .finish()
    }
}
