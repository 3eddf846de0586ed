//! Per-call message stream
//!
//! ```text
//!   Logger::log_info() ──► Pending ──first enabled call──► Open ──append/with_*──► Open
//!                             │                              │
//!                             └────── flush() / drop ────────┘
//!                                            ▼
//!                                         Flushed  (terminal, further calls are no-ops)
//! ```
//!
//! The message builder, and with it the counter, capture time and thread id,
//! is only created once the level is enabled. Disabled calls never touch
//! the stamp source.

use std::sync::Arc;

use crate::argument::Value;
use crate::level::LogLevel;
use crate::logger::Logger;
use crate::message::MessageBuilder;

enum State {
    Pending,
    Open(MessageBuilder),
    Flushed,
}

/// Builder for one log message, routed to its logger on flush or drop
///
/// Every append re-checks the logger threshold before any encoding work,
/// so a disabled call costs one atomic load.
#[must_use = "a stream emits its message when flushed or dropped"]
pub struct LogStream<'a> {
    logger: &'a Logger,
    level: LogLevel,
    state: State,
}

impl<'a> LogStream<'a> {
    pub(crate) fn new(logger: &'a Logger, level: LogLevel) -> Self {
        let state = if logger.is_enabled(level) {
            State::Open(Self::start(logger, level))
        } else {
            State::Pending
        };
        Self {
            logger,
            level,
            state,
        }
    }

    fn start(logger: &Logger, level: LogLevel) -> MessageBuilder {
        MessageBuilder::verbose_mode(level, logger.key(), logger.identity(), logger.stamps())
    }

    /// Severity of the message being built
    #[inline]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Whether the stream still accepts arguments
    #[inline]
    pub fn is_open(&self) -> bool {
        !matches!(self.state, State::Flushed)
    }

    #[inline]
    fn open_if_enabled(&mut self) -> Option<&mut MessageBuilder> {
        if matches!(self.state, State::Flushed) || !self.logger.is_enabled(self.level) {
            return None;
        }
        if matches!(self.state, State::Pending) {
            self.state = State::Open(Self::start(self.logger, self.level));
        }
        match &mut self.state {
            State::Open(builder) => Some(builder),
            State::Pending | State::Flushed => None,
        }
    }

    /// Append one argument
    pub fn append<'v, V: Into<Value<'v>>>(&mut self, value: V) -> &mut Self {
        if let Some(builder) = self.open_if_enabled() {
            builder.add_argument(value.into().into_owned());
        }
        self
    }

    /// Attach the source file and line the message originates from
    pub fn with_location(&mut self, file: &str, line: u32) -> &mut Self {
        if let Some(builder) = self.open_if_enabled() {
            builder.set_location(file, line);
        }
        self
    }

    /// Attach a tag
    pub fn with_tag(&mut self, tag: &str) -> &mut Self {
        if let Some(builder) = self.open_if_enabled() {
            builder.add_tag(tag);
        }
        self
    }

    /// Attach a privacy level
    pub fn with_privacy(&mut self, level: u8) -> &mut Self {
        if let Some(builder) = self.open_if_enabled() {
            builder.set_privacy_level(level);
        }
        self
    }

    /// Finish the message and hand it to the logger's handlers
    ///
    /// Runs at most once. A message whose severity is disabled at this point
    /// is discarded.
    pub fn flush(&mut self) {
        let builder = match core::mem::replace(&mut self.state, State::Flushed) {
            State::Flushed => return,
            _ if !self.logger.is_enabled(self.level) => return,
            State::Pending => Self::start(self.logger, self.level),
            State::Open(builder) => builder,
        };
        self.logger.dispatch(Arc::new(builder.finish()));
    }
}

impl Drop for LogStream<'_> {
    fn drop(&mut self) {
        self.flush();
    }
}

impl core::fmt::Debug for LogStream<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LogStream")
            .field("logger", &self.logger.key())
            .field("level", &self.level)
            .field("open", &self.is_open())
            .finish()
    }
}
