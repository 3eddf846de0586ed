//! Message assembly, rendering and binary persistence
//!
//! A message is built in two phases. [`MessageBuilder`] accumulates
//! arguments and header decorations; [`MessageBuilder::finish`] consumes it
//! and produces an immutable [`Message`] whose text line is rendered once,
//! up front. Finished messages are shared between handlers as
//! [`SharedMessage`].
//!
//! # Text line
//!
//! ```text
//! {time}|{ecu_id}|{app_id}|{ctx_id}|{thread_id}|{Severity}|{arg1} {arg2} ...
//! ```
//!
//! # Binary layout
//!
//! ```text
//! +-----------+---------+---------+----------------------------------+
//! | Htyp u32  | Cnt u8  | Len u16 | content fields (msin/noar/tmsp)  |
//! +-----------+---------+---------+----------------------------------+
//! | [extension: ecu | app,ctx | session | file,line | tags | privacy] |
//! | arguments: (type_info u32 [len u16] bytes)*                       |
//! +-------------------------------------------------------------------+
//! ```

use core::fmt::{self, Write as _};
use std::sync::Arc;

use crate::argument::{self, Argument};
use crate::decoder::MessageCursor;
use crate::encoder::MessageEncoder;
use crate::error::{Error, Result};
use crate::header::{BaseHeader, ExtensionHeader, HeaderFlags};
use crate::level::LogLevel;
use crate::stamp::StampSource;

/// Finished message shared by every handler it is dispatched to
pub type SharedMessage = Arc<Message>;

/// Placeholder rendered for origin ids when a message has no extension header
pub const UNKNOWN_ID: &str = "UNKNOWN";

/// Process-wide origin identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    /// ECU identifier
    pub ecu_id: String,
    /// Application identifier
    pub app_id: String,
}

impl Identity {
    /// Create from ECU and application ids
    pub fn new(ecu_id: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            ecu_id: ecu_id.into(),
            app_id: app_id.into(),
        }
    }
}

/// Accumulating phase of a message
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    header: BaseHeader,
    extension: Option<ExtensionHeader>,
    arguments: Vec<Argument>,
    thread_id: String,
}

impl MessageBuilder {
    /// Start from an explicit base header, with no thread id
    pub fn new(header: BaseHeader) -> Self {
        Self {
            header,
            extension: None,
            arguments: Vec::new(),
            thread_id: String::new(),
        }
    }

    /// Verbose-mode log message at `level` for context `ctx_id`
    ///
    /// Counter, capture time and thread id come from `stamps`, all taken
    /// here; ECU and app ids from `identity`.
    pub fn verbose_mode(
        level: LogLevel,
        ctx_id: &str,
        identity: &Identity,
        stamps: &dyn StampSource,
    ) -> Self {
        let header = BaseHeader::verbose_log(level, stamps.next_counter(), stamps.now());
        let mut extension = ExtensionHeader::new();
        extension.set_ecu_id(&identity.ecu_id);
        extension.set_app_id(&identity.app_id);
        extension.set_ctx_id(ctx_id);

        Self {
            header,
            extension: Some(extension),
            arguments: Vec::new(),
            thread_id: stamps.thread_id(),
        }
    }

    /// Append one argument
    #[inline]
    pub fn add_argument(&mut self, argument: Argument) {
        self.arguments.push(argument);
    }

    /// Attach a source file and line
    pub fn set_location(&mut self, file: &str, line: u32) {
        self.header.flags.set_flag(HeaderFlags::WITH_SOURCE_LOCATION);
        self.extension_mut().set_location(file, line);
    }

    /// Attach a tag
    pub fn add_tag(&mut self, tag: &str) {
        self.header.flags.set_flag(HeaderFlags::WITH_TAGS);
        self.extension_mut().add_tag(tag);
    }

    /// Attach a privacy level
    pub fn set_privacy_level(&mut self, level: u8) {
        self.header.flags.set_flag(HeaderFlags::WITH_PRIVACY_LEVEL);
        self.extension_mut().set_privacy_level(level);
    }

    /// Attach a session id
    pub fn set_session_id(&mut self, session_id: u32) {
        self.header.flags.set_flag(HeaderFlags::WITH_SESSION_ID);
        self.extension_mut().set_session_id(session_id);
    }

    fn extension_mut(&mut self) -> &mut ExtensionHeader {
        self.extension.get_or_insert_with(ExtensionHeader::new)
    }

    /// Base header built so far
    pub fn header(&self) -> &BaseHeader {
        &self.header
    }

    /// Arguments appended so far
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Thread captured when the builder was created
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// End the accumulation phase and render the text line
    pub fn finish(mut self) -> Message {
        if self.header.arg_count.is_some() {
            self.header.arg_count = Some(u8::try_from(self.arguments.len()).unwrap_or(u8::MAX));
        }
        Message::assemble(self.header, self.extension, self.arguments, self.thread_id)
    }
}

/// Immutable, already-rendered log record
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    header: BaseHeader,
    extension: Option<ExtensionHeader>,
    arguments: Vec<Argument>,
    thread_id: String,
    text: String,
}

impl Message {
    fn assemble(
        header: BaseHeader,
        extension: Option<ExtensionHeader>,
        arguments: Vec<Argument>,
        thread_id: String,
    ) -> Self {
        let text = render(&header, extension.as_ref(), &arguments, &thread_id);
        Self {
            header,
            extension,
            arguments,
            thread_id,
            text,
        }
    }

    /// Base header
    pub fn header(&self) -> &BaseHeader {
        &self.header
    }

    /// Extension header, if present
    pub fn extension(&self) -> Option<&ExtensionHeader> {
        self.extension.as_ref()
    }

    /// Arguments in append order
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// Thread that built the message; empty for decoded messages
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Severity, if this is a log message
    pub fn log_level(&self) -> Option<LogLevel> {
        self.header.log_level()
    }

    /// Context id, empty if absent
    pub fn ctx_id(&self) -> &str {
        self.extension.as_ref().map_or("", ExtensionHeader::ctx_id)
    }

    /// Rendered text line
    pub fn as_text(&self) -> &str {
        &self.text
    }

    /// Size of the binary form in bytes
    pub fn encoded_len(&self) -> usize {
        let flags = &self.header.flags;
        let extension = if flags.with_extension() {
            self.extension
                .as_ref()
                .map_or_else(|| ExtensionHeader::new().encoded_len(flags), |ext| ext.encoded_len(flags))
        } else {
            0
        };
        self.header.encoded_len()
            + extension
            + self.arguments.iter().map(argument::Value::encoded_len).sum::<usize>()
    }

    /// Write the binary form into `buf`, returning the number of bytes used
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        if self.arguments.len() > u8::MAX as usize {
            return Err(Error::BufferOverflow);
        }

        let mut encoder = MessageEncoder::new(buf);
        encoder.begin();
        self.header.encode(&mut encoder)?;

        let flags = &self.header.flags;
        if flags.with_extension() {
            match &self.extension {
                Some(ext) => ext.encode(flags, &mut encoder)?,
                None => ExtensionHeader::new().encode(flags, &mut encoder)?,
            }
        }
        for arg in &self.arguments {
            argument::encode_into(arg, &mut encoder)?;
        }

        encoder.finish()
    }

    /// Binary form as a fresh vector
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.encoded_len()];
        let len = self.encode(&mut buf)?;
        buf.truncate(len);
        Ok(buf)
    }

    /// Rebuild a message from its binary form
    ///
    /// The length field bounds the read; trailing bytes after it are
    /// ignored. A payload that holds more or fewer arguments than the header
    /// announces fails with [`Error::MalformedArgument`].
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut cursor = MessageCursor::new(buf);
        let header = BaseHeader::decode(&mut cursor)?;

        let len = header.length as usize;
        if len < cursor.pos {
            return Err(Error::FlagConflict);
        }
        if buf.len() < len {
            return Err(Error::UnexpectedEof);
        }
        let mut cursor = MessageCursor {
            buf: &buf[..len],
            pos: cursor.pos,
        };

        let extension = if header.flags.with_extension() {
            Some(ExtensionHeader::decode(&header.flags, &mut cursor)?)
        } else {
            None
        };

        let count = header.arg_count.unwrap_or(0) as usize;
        let mut arguments = Vec::with_capacity(count);
        for _ in 0..count {
            let value = argument::decode_from(&mut cursor).map_err(|err| match err {
                Error::UnexpectedEof => Error::MalformedArgument,
                other => other,
            })?;
            arguments.push(value.into_owned());
        }
        if !cursor.is_at_end() {
            return Err(Error::MalformedArgument);
        }

        Ok(Self::assemble(header, extension, arguments, String::new()))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn render(
    header: &BaseHeader,
    extension: Option<&ExtensionHeader>,
    arguments: &[Argument],
    thread_id: &str,
) -> String {
    let time = header
        .timestamp
        .map(|ts| ts.to_string())
        .unwrap_or_default();
    let (ecu_id, app_id, ctx_id) = match extension {
        Some(ext) => (ext.ecu_id(), ext.app_id(), ext.ctx_id()),
        None => (UNKNOWN_ID, UNKNOWN_ID, UNKNOWN_ID),
    };

    let mut text = format!(
        "{time}|{ecu_id}|{app_id}|{ctx_id}|{thread_id}|{}|",
        header.level_name()
    );
    for arg in arguments {
        // Writing into a String cannot fail
        let _ = write!(text, "{arg} ");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::Value;
    use crate::header::{ContentInfo, MessageClass, Timestamp, TraceInfo};
    use std::borrow::Cow;
    use std::sync::atomic::{AtomicU8, Ordering};

    struct FixedStamps {
        counter: AtomicU8,
    }

    impl StampSource for FixedStamps {
        fn next_counter(&self) -> u8 {
            self.counter.fetch_add(1, Ordering::Relaxed)
        }

        fn thread_id(&self) -> String {
            "T1".into()
        }

        fn now(&self) -> Timestamp {
            Timestamp::new(1_700_000_000, 5)
        }
    }

    fn stamps() -> FixedStamps {
        FixedStamps {
            counter: AtomicU8::new(7),
        }
    }

    fn identity() -> Identity {
        Identity::new("ECU1", "APP1")
    }

    #[test]
    fn test_verbose_mode_message() {
        let builder = MessageBuilder::verbose_mode(LogLevel::Warn, "em", &identity(), &stamps());
        let header = builder.header();

        assert_eq!(header.flags.content_info(), ContentInfo::Verbose);
        assert!(header.flags.with_ecu_id());
        assert!(header.flags.with_app_and_ctx_id());
        assert!(!header.flags.with_tags());
        assert_eq!(header.counter, 7);
        assert_eq!(header.log_level(), Some(LogLevel::Warn));
        assert_eq!(header.timestamp, Some(Timestamp::new(1_700_000_000, 5)));
        assert!(builder.arguments().is_empty());
    }

    #[test]
    fn test_rendered_line() {
        let mut builder =
            MessageBuilder::verbose_mode(LogLevel::Info, "em", &identity(), &stamps());
        builder.add_argument(Value::Bool(true));
        builder.add_argument(Value::Str(Cow::Borrowed("ok")));
        builder.add_argument(Value::I32(-3));
        let message = builder.finish();

        let expected_head = format!("{}|ECU1|APP1|em|T1|Info|", Timestamp::new(1_700_000_000, 5));
        assert_eq!(message.as_text(), format!("{expected_head}true ok -3 "));
        assert_eq!(message.to_string(), message.as_text());
        assert_eq!(message.header().arg_count, Some(3));
    }

    #[test]
    fn test_render_without_extension() {
        let mut header = BaseHeader::new(HeaderFlags::new(), 0);
        header.class = Some(MessageClass::trace(TraceInfo::State));
        let message = MessageBuilder::new(header).finish();

        assert_eq!(message.as_text(), "|UNKNOWN|UNKNOWN|UNKNOWN||Unknown|");
    }

    #[test]
    fn test_decorations_set_flags() {
        let mut builder =
            MessageBuilder::verbose_mode(LogLevel::Debug, "em", &identity(), &stamps());
        builder.set_location("main.rs", 42);
        builder.add_tag("boot");
        builder.add_tag("net");
        builder.set_privacy_level(3);
        builder.set_session_id(9);
        let message = builder.finish();

        let flags = message.header().flags;
        assert!(flags.with_source_location());
        assert!(flags.with_tags());
        assert!(flags.with_privacy_level());
        assert!(flags.with_session_id());

        let ext = message.extension().unwrap();
        assert_eq!(ext.location().unwrap().file, "main.rs");
        assert_eq!(ext.location().unwrap().line, 42);
        assert_eq!(ext.tags(), ["boot", "net"]);
        assert_eq!(ext.privacy_level(), Some(3));
        assert_eq!(ext.session_id(), Some(9));
    }

    #[test]
    fn test_binary_roundtrip() {
        let mut builder =
            MessageBuilder::verbose_mode(LogLevel::Error, "ctx", &identity(), &stamps());
        builder.set_location("lib.rs", 7);
        builder.add_tag("t");
        builder.add_argument(Value::U16(512));
        builder.add_argument(Value::Str(Cow::Borrowed("payload")));
        builder.add_argument(Value::F64(2.5));
        builder.add_argument(Value::Raw(Cow::Borrowed(&[1, 2, 3])));
        let message = builder.finish();

        let bytes = message.to_bytes().unwrap();
        assert_eq!(bytes.len(), message.encoded_len());
        assert_eq!(
            u16::from_ne_bytes([bytes[BaseHeader::LENGTH_OFFSET], bytes[BaseHeader::LENGTH_OFFSET + 1]])
                as usize,
            bytes.len()
        );

        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded.arguments(), message.arguments());
        assert_eq!(decoded.extension(), message.extension());
        assert_eq!(decoded.header().flags, message.header().flags);
        assert_eq!(decoded.header().counter, message.header().counter);
        assert_eq!(decoded.log_level(), Some(LogLevel::Error));
        assert_eq!(decoded.thread_id(), "");
        assert!(decoded.as_text().ends_with("|ctx||Error|512 payload 2.5 010203 "));
    }

    #[test]
    fn test_encode_short_buffer() {
        let mut builder =
            MessageBuilder::verbose_mode(LogLevel::Info, "em", &identity(), &stamps());
        builder.add_argument(Value::U64(1));
        let message = builder.finish();

        let mut buf = vec![0u8; message.encoded_len() - 1];
        assert_eq!(message.encode(&mut buf), Err(Error::ShortBuffer));
    }

    #[test]
    fn test_decode_truncated() {
        let mut builder =
            MessageBuilder::verbose_mode(LogLevel::Info, "em", &identity(), &stamps());
        builder.add_argument(Value::U32(5));
        let bytes = builder.finish().to_bytes().unwrap();

        assert_eq!(Message::decode(&bytes[..bytes.len() - 1]), Err(Error::UnexpectedEof));
        assert_eq!(Message::decode(&bytes[..3]), Err(Error::UnexpectedEof));
    }

    #[test]
    fn test_decode_rejects_corrupt_argument() {
        let mut builder =
            MessageBuilder::verbose_mode(LogLevel::Info, "em", &identity(), &stamps());
        builder.add_argument(Value::I32(1));
        let message = builder.finish();
        let mut bytes = message.to_bytes().unwrap();

        // The argument's type info sits right after the headers
        let offset = bytes.len() - 8;
        let bogus = crate::argument::TypeInfo::SIGNED | 0x7;
        bytes[offset..offset + 4].copy_from_slice(&bogus.to_ne_bytes());
        assert_eq!(Message::decode(&bytes), Err(Error::MalformedArgument));
    }

    #[test]
    fn test_decode_rejects_segmentation() {
        let mut header = BaseHeader::verbose_log(LogLevel::Info, 0, Timestamp::new(0, 0));
        header.flags.set_flag(HeaderFlags::WITH_SEGMENTATION);
        let bytes = MessageBuilder::new(header).finish().to_bytes().unwrap();
        assert_eq!(Message::decode(&bytes), Err(Error::FlagConflict));
    }

    #[test]
    fn test_decode_rejects_out_of_range_timestamp() {
        let message =
            MessageBuilder::verbose_mode(LogLevel::Info, "em", &identity(), &stamps()).finish();
        let mut bytes = message.to_bytes().unwrap();

        // Verbose content: msin u8 at 7, noar u8 at 8, then tmsp
        bytes[9..13].copy_from_slice(&u32::MAX.to_ne_bytes());
        bytes[13..21].copy_from_slice(&u64::MAX.to_ne_bytes());
        assert_eq!(Message::decode(&bytes), Err(Error::InvalidTimestamp));

        bytes[9..13].copy_from_slice(&1_000_000_000u32.to_ne_bytes());
        bytes[13..21].copy_from_slice(&0u64.to_ne_bytes());
        assert_eq!(Message::decode(&bytes), Err(Error::InvalidTimestamp));

        bytes[9..13].copy_from_slice(&999_999_999u32.to_ne_bytes());
        let decoded = Message::decode(&bytes).unwrap();
        assert_eq!(decoded.header().timestamp, Some(Timestamp::new(0, 999_999_999)));
    }

    #[test]
    fn test_thread_id_taken_at_creation() {
        struct Moving {
            calls: AtomicU8,
        }

        impl StampSource for Moving {
            fn next_counter(&self) -> u8 {
                0
            }

            fn thread_id(&self) -> String {
                format!("T{}", self.calls.fetch_add(1, Ordering::Relaxed))
            }

            fn now(&self) -> Timestamp {
                Timestamp::new(0, 0)
            }
        }

        let source = Moving {
            calls: AtomicU8::new(0),
        };
        let mut builder = MessageBuilder::verbose_mode(LogLevel::Info, "em", &identity(), &source);
        assert_eq!(builder.thread_id(), "T0");

        // Later lookups on the source do not leak into the message
        assert_eq!(source.thread_id(), "T1");
        builder.add_argument(Value::U8(1));
        let message = builder.finish();
        assert_eq!(message.thread_id(), "T0");
        assert!(message.as_text().contains("|em|T0|Info|"));
    }

    #[test]
    fn test_off_level_renders_off() {
        let message =
            MessageBuilder::verbose_mode(LogLevel::Off, "em", &identity(), &stamps()).finish();
        assert_eq!(message.log_level(), Some(LogLevel::Off));
        assert!(message.as_text().contains("|T1|Off|"));

        let decoded = Message::decode(&message.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.log_level(), Some(LogLevel::Off));
    }
}
