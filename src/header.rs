//! Message header structures: flags, message class, timestamp and the
//! base/extension headers that precede the argument payload

use core::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::decoder::MessageCursor;
use crate::encoder::MessageEncoder;
use crate::error::{Error, Result};
use crate::level::{LogLevel, UNKNOWN_LEVEL_NAME};
use crate::PROTOCOL_VERSION;

/// Content info carried in the two lowest header flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContentInfo {
    /// Verbose mode data message (self-describing arguments)
    Verbose = 0x0,
    /// Non-verbose mode data message (catalog id only)
    NonVerbose = 0x1,
    /// Control message
    Control = 0x2,
    /// Reserved
    Reserved = 0x3,
}

impl ContentInfo {
    #[inline]
    const fn from_bits(bits: u32) -> Self {
        match bits & HeaderFlags::CONTENT_INFO_MASK {
            0x0 => ContentInfo::Verbose,
            0x1 => ContentInfo::NonVerbose,
            0x2 => ContentInfo::Control,
            _ => ContentInfo::Reserved,
        }
    }
}

/// 32-bit header type flag set
///
/// The version field (bits 5-7) is written once at construction and is
/// never touched by the flag setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderFlags {
    bits: u32,
}

impl HeaderFlags {
    /// Content info mask (bits 0-1)
    pub const CONTENT_INFO_MASK: u32 = 0x0000_0003;

    /// ECU id present in the extension header (bit 2)
    pub const WITH_ECU_ID: u32 = 1 << 2;

    /// App and ctx ids present in the extension header (bit 3)
    pub const WITH_APP_AND_CTX_ID: u32 = 1 << 3;

    /// Session id present (bit 4)
    pub const WITH_SESSION_ID: u32 = 1 << 4;

    /// Version field shift
    pub const VERSION_SHIFT: u32 = 5;

    /// Version field mask (bits 5-7)
    pub const VERSION_MASK: u32 = 0x7 << Self::VERSION_SHIFT;

    /// Source file name and line present (bit 8)
    pub const WITH_SOURCE_LOCATION: u32 = 1 << 8;

    /// Tags present (bit 9)
    pub const WITH_TAGS: u32 = 1 << 9;

    /// Privacy level present (bit 10)
    pub const WITH_PRIVACY_LEVEL: u32 = 1 << 10;

    /// Segmented message (bit 11)
    pub const WITH_SEGMENTATION: u32 = 1 << 11;

    /// Reserved flags mask
    pub const RESERVED: u32 = !0x0000_0FFF;

    /// Create an empty flag set carrying the protocol version
    #[inline]
    pub const fn new() -> Self {
        Self {
            bits: (PROTOCOL_VERSION as u32) << Self::VERSION_SHIFT,
        }
    }

    /// Flags for a verbose-mode data message with ECU and app/ctx ids
    #[inline]
    pub fn verbose_mode() -> Self {
        let mut flags = Self::new();
        flags.set_content_info(ContentInfo::Verbose);
        flags.set_flag(Self::WITH_ECU_ID | Self::WITH_APP_AND_CTX_ID);
        flags
    }

    /// Rebuild flags from their raw value, validating version and reserved bits
    #[inline]
    pub fn from_bits(bits: u32) -> Result<Self> {
        let flags = Self { bits };
        if flags.version() != PROTOCOL_VERSION {
            return Err(Error::UnsupportedVersion);
        }
        if bits & Self::RESERVED != 0 {
            return Err(Error::FlagConflict);
        }
        Ok(flags)
    }

    /// Raw flag bits
    #[inline]
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Protocol version recorded in the flags
    #[inline]
    pub const fn version(&self) -> u8 {
        ((self.bits & Self::VERSION_MASK) >> Self::VERSION_SHIFT) as u8
    }

    /// Content info of the message
    #[inline]
    pub const fn content_info(&self) -> ContentInfo {
        ContentInfo::from_bits(self.bits)
    }

    /// Replace the content info
    #[inline]
    pub fn set_content_info(&mut self, cnti: ContentInfo) {
        self.bits = (self.bits & !Self::CONTENT_INFO_MASK) | cnti as u32;
    }

    /// Set one or more presence flags
    #[inline]
    pub fn set_flag(&mut self, flag: u32) {
        self.bits |= flag & !(Self::VERSION_MASK | Self::CONTENT_INFO_MASK);
    }

    /// Clear one or more presence flags
    #[inline]
    pub fn clear_flag(&mut self, flag: u32) {
        self.bits &= !(flag & !(Self::VERSION_MASK | Self::CONTENT_INFO_MASK));
    }

    /// Check if a presence flag is set
    #[inline]
    pub const fn has_flag(&self, flag: u32) -> bool {
        self.bits & flag != 0
    }

    /// ECU id present
    #[inline]
    pub const fn with_ecu_id(&self) -> bool {
        self.has_flag(Self::WITH_ECU_ID)
    }

    /// App and ctx ids present
    #[inline]
    pub const fn with_app_and_ctx_id(&self) -> bool {
        self.has_flag(Self::WITH_APP_AND_CTX_ID)
    }

    /// Session id present
    #[inline]
    pub const fn with_session_id(&self) -> bool {
        self.has_flag(Self::WITH_SESSION_ID)
    }

    /// Source location present
    #[inline]
    pub const fn with_source_location(&self) -> bool {
        self.has_flag(Self::WITH_SOURCE_LOCATION)
    }

    /// Tags present
    #[inline]
    pub const fn with_tags(&self) -> bool {
        self.has_flag(Self::WITH_TAGS)
    }

    /// Privacy level present
    #[inline]
    pub const fn with_privacy_level(&self) -> bool {
        self.has_flag(Self::WITH_PRIVACY_LEVEL)
    }

    /// Segmented message
    #[inline]
    pub const fn with_segmentation(&self) -> bool {
        self.has_flag(Self::WITH_SEGMENTATION)
    }

    /// Whether any extension header field is flagged
    #[inline]
    pub const fn with_extension(&self) -> bool {
        self.has_flag(
            Self::WITH_ECU_ID
                | Self::WITH_APP_AND_CTX_ID
                | Self::WITH_SESSION_ID
                | Self::WITH_SOURCE_LOCATION
                | Self::WITH_TAGS
                | Self::WITH_PRIVACY_LEVEL,
        )
    }
}

impl Default for HeaderFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// Message kind selected by bits 1-3 of [`MessageClass`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    /// Log message
    Log = 0x0,
    /// Application trace message
    Trace = 0x1,
    /// Network trace message
    Network = 0x2,
    /// Control message
    Control = 0x3,
}

/// Trace message sub-types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TraceInfo {
    /// Value of a variable
    Variable = 0x1,
    /// Call of a function
    FunctionIn = 0x2,
    /// Return of a function
    FunctionOut = 0x3,
    /// State of a state machine
    State = 0x4,
    /// RTE event
    Vfb = 0x5,
}

/// Network trace message sub-types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NetworkInfo {
    /// Inter-process communication
    Ipc = 0x1,
    /// CAN bus
    Can = 0x2,
    /// FlexRay bus
    Flexray = 0x3,
    /// MOST bus
    Most = 0x4,
    /// Ethernet
    Ethernet = 0x5,
    /// SOME/IP
    SomeIp = 0x6,
}

/// Control message sub-types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlInfo {
    /// Request control message
    Request = 0x1,
    /// Response control message
    Response = 0x2,
}

/// 8-bit message info: kind in bits 1-3, kind-specific sub-type in bits 4-7
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageClass {
    bits: u8,
}

impl MessageClass {
    const KIND_SHIFT: u8 = 1;
    const KIND_MASK: u8 = 0x07 << Self::KIND_SHIFT;
    const SUB_TYPE_SHIFT: u8 = 4;

    #[inline]
    const fn new(kind: MessageKind, sub_type: u8) -> Self {
        Self {
            bits: ((kind as u8) << Self::KIND_SHIFT) | ((sub_type & 0x0F) << Self::SUB_TYPE_SHIFT),
        }
    }

    /// Log message at `level`
    #[inline]
    pub const fn log(level: LogLevel) -> Self {
        Self::new(MessageKind::Log, level as u8)
    }

    /// Application trace message
    #[inline]
    pub const fn trace(info: TraceInfo) -> Self {
        Self::new(MessageKind::Trace, info as u8)
    }

    /// Network trace message
    #[inline]
    pub const fn network(info: NetworkInfo) -> Self {
        Self::new(MessageKind::Network, info as u8)
    }

    /// Control message
    #[inline]
    pub const fn control(info: ControlInfo) -> Self {
        Self::new(MessageKind::Control, info as u8)
    }

    /// Rebuild from the raw byte
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self { bits }
    }

    /// Raw byte value
    #[inline]
    pub const fn bits(&self) -> u8 {
        self.bits
    }

    /// Message kind, `None` for the reserved kind values 4-7
    #[inline]
    pub const fn kind(&self) -> Option<MessageKind> {
        match (self.bits & Self::KIND_MASK) >> Self::KIND_SHIFT {
            0x0 => Some(MessageKind::Log),
            0x1 => Some(MessageKind::Trace),
            0x2 => Some(MessageKind::Network),
            0x3 => Some(MessageKind::Control),
            _ => None,
        }
    }

    /// Kind-specific sub-type
    #[inline]
    pub const fn sub_type(&self) -> u8 {
        self.bits >> Self::SUB_TYPE_SHIFT
    }

    /// Severity of a log message; `None` for other kinds or unmapped sub-types
    #[inline]
    pub const fn log_level(&self) -> Option<LogLevel> {
        match self.kind() {
            Some(MessageKind::Log) => LogLevel::from_u8(self.sub_type()),
            _ => None,
        }
    }
}

/// Wall-clock capture time of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    seconds: u64,
    nanoseconds: u32,
}

impl Timestamp {
    /// Encoded size in bytes (nanoseconds u32 + seconds u64)
    pub const SIZE: usize = 12;

    const NANOS_PER_SEC: u32 = 1_000_000_000;

    /// Create from explicit parts; excess nanoseconds carry into seconds,
    /// which saturate at `u64::MAX`
    #[inline]
    pub const fn new(seconds: u64, nanoseconds: u32) -> Self {
        Self {
            seconds: seconds.saturating_add((nanoseconds / Self::NANOS_PER_SEC) as u64),
            nanoseconds: nanoseconds % Self::NANOS_PER_SEC,
        }
    }

    /// Create from already normalized parts, `None` if `nanoseconds` is a
    /// whole second or more
    #[inline]
    pub const fn from_parts(seconds: u64, nanoseconds: u32) -> Option<Self> {
        if nanoseconds >= Self::NANOS_PER_SEC {
            return None;
        }
        Some(Self {
            seconds,
            nanoseconds,
        })
    }

    /// Capture the current wall-clock time
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::new(since_epoch.as_secs(), since_epoch.subsec_nanos())
    }

    /// Whole seconds since the Unix epoch
    #[inline]
    pub const fn seconds(&self) -> u64 {
        self.seconds
    }

    /// Sub-second nanoseconds
    #[inline]
    pub const fn nanoseconds(&self) -> u32 {
        self.nanoseconds
    }
}

impl fmt::Display for Timestamp {
    /// Renders local time as `YYYY-MM-DD HH:MM:SS.nnnnnnnnn`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let utc = i64::try_from(self.seconds)
            .ok()
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0));
        match utc {
            Some(utc) => {
                let local = utc.with_timezone(&chrono::Local);
                write!(
                    f,
                    "{}.{:09}",
                    local.format("%Y-%m-%d %H:%M:%S"),
                    self.nanoseconds
                )
            }
            None => write!(f, "{}.{:09}", self.seconds, self.nanoseconds),
        }
    }
}

/// Base header: flags, counter and the content-dependent fixed fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseHeader {
    /// Header type flags
    pub flags: HeaderFlags,
    /// Per-process message counter (wraps mod 256)
    pub counter: u8,
    /// Total encoded message length, filled in by the encoder
    pub length: u16,
    /// Message class
    pub class: Option<MessageClass>,
    /// Number of payload arguments
    pub arg_count: Option<u8>,
    /// Capture time
    pub timestamp: Option<Timestamp>,
    /// Non-verbose message id
    pub message_id: Option<u32>,
}

impl BaseHeader {
    /// Offset of the length field inside the encoded header
    pub const LENGTH_OFFSET: usize = 5;

    /// Create a header with only flags and counter set
    #[inline]
    pub const fn new(flags: HeaderFlags, counter: u8) -> Self {
        Self {
            flags,
            counter,
            length: 0,
            class: None,
            arg_count: None,
            timestamp: None,
            message_id: None,
        }
    }

    /// Header of a verbose-mode log message
    #[inline]
    pub fn verbose_log(level: LogLevel, counter: u8, timestamp: Timestamp) -> Self {
        let mut header = Self::new(HeaderFlags::verbose_mode(), counter);
        header.class = Some(MessageClass::log(level));
        header.arg_count = Some(0);
        header.timestamp = Some(timestamp);
        header
    }

    /// Encoded size of the header for its content info
    pub fn encoded_len(&self) -> usize {
        let fixed = 4 + 1 + 2;
        fixed
            + match self.flags.content_info() {
                ContentInfo::Verbose => 1 + 1 + Timestamp::SIZE,
                ContentInfo::NonVerbose => 1 + Timestamp::SIZE + 4,
                ContentInfo::Control => 1 + 1,
                ContentInfo::Reserved => 0,
            }
    }

    /// Severity of the message, if it is a log message
    #[inline]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.class.and_then(|class| class.log_level())
    }

    /// Severity name for rendering
    #[inline]
    pub fn level_name(&self) -> &'static str {
        self.log_level().map_or(UNKNOWN_LEVEL_NAME, LogLevel::name)
    }

    /// Encode the header; the length field is written as currently stored
    pub fn encode(&self, encoder: &mut MessageEncoder<'_>) -> Result<()> {
        encoder.put_u32(self.flags.bits())?;
        encoder.put_u8(self.counter)?;
        encoder.put_u16(self.length)?;

        let class = self.class.map_or(0, |c| c.bits());
        let timestamp = self.timestamp.unwrap_or_default();
        match self.flags.content_info() {
            ContentInfo::Verbose => {
                encoder.put_u8(class)?;
                encoder.put_u8(self.arg_count.unwrap_or(0))?;
                put_timestamp(encoder, &timestamp)?;
            }
            ContentInfo::NonVerbose => {
                encoder.put_u8(class)?;
                put_timestamp(encoder, &timestamp)?;
                encoder.put_u32(self.message_id.unwrap_or(0))?;
            }
            ContentInfo::Control => {
                encoder.put_u8(class)?;
                encoder.put_u8(self.arg_count.unwrap_or(0))?;
            }
            ContentInfo::Reserved => return Err(Error::FlagConflict),
        }
        Ok(())
    }

    /// Decode and validate a header
    pub fn decode(cursor: &mut MessageCursor<'_>) -> Result<Self> {
        let flags = HeaderFlags::from_bits(cursor.get_u32()?)?;
        if flags.with_segmentation() {
            return Err(Error::FlagConflict);
        }
        let mut header = Self::new(flags, cursor.get_u8()?);
        header.length = cursor.get_u16()?;

        match flags.content_info() {
            ContentInfo::Verbose => {
                header.class = Some(MessageClass::from_bits(cursor.get_u8()?));
                header.arg_count = Some(cursor.get_u8()?);
                header.timestamp = Some(get_timestamp(cursor)?);
            }
            ContentInfo::NonVerbose => {
                header.class = Some(MessageClass::from_bits(cursor.get_u8()?));
                header.timestamp = Some(get_timestamp(cursor)?);
                header.message_id = Some(cursor.get_u32()?);
            }
            ContentInfo::Control => {
                header.class = Some(MessageClass::from_bits(cursor.get_u8()?));
                header.arg_count = Some(cursor.get_u8()?);
            }
            ContentInfo::Reserved => return Err(Error::FlagConflict),
        }
        Ok(header)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

fn put_timestamp(encoder: &mut MessageEncoder<'_>, timestamp: &Timestamp) -> Result<()> {
    encoder.put_u32(timestamp.nanoseconds)?;
    encoder.put_u64(timestamp.seconds)
}

fn get_timestamp(cursor: &mut MessageCursor<'_>) -> Result<Timestamp> {
    let nanoseconds = cursor.get_u32()?;
    let seconds = cursor.get_u64()?;
    Timestamp::from_parts(seconds, nanoseconds).ok_or(Error::InvalidTimestamp)
}

/// Source file and line attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Source file identifier
    pub file: String,
    /// Line number
    pub line: u32,
}

/// Optional origin and annotation fields, each flagged in [`HeaderFlags`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionHeader {
    ecu_id: Option<String>,
    app_id: Option<String>,
    ctx_id: Option<String>,
    session_id: Option<u32>,
    location: Option<SourceLocation>,
    tags: Vec<String>,
    privacy_level: Option<u8>,
}

impl ExtensionHeader {
    /// Longest identifier expressible by the 1-byte length descriptor
    pub const MAX_ID_LEN: usize = u8::MAX as usize;

    /// Create an empty extension header
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ECU id
    pub fn set_ecu_id(&mut self, ecu_id: &str) {
        self.ecu_id = Some(truncate_id(ecu_id));
    }

    /// Set the application id
    pub fn set_app_id(&mut self, app_id: &str) {
        self.app_id = Some(truncate_id(app_id));
    }

    /// Set the context id
    pub fn set_ctx_id(&mut self, ctx_id: &str) {
        self.ctx_id = Some(truncate_id(ctx_id));
    }

    /// Set the session id
    pub fn set_session_id(&mut self, session_id: u32) {
        self.session_id = Some(session_id);
    }

    /// Set the source location
    pub fn set_location(&mut self, file: &str, line: u32) {
        self.location = Some(SourceLocation {
            file: truncate_id(file),
            line,
        });
    }

    /// Append a tag; tags beyond 255 are ignored
    pub fn add_tag(&mut self, tag: &str) {
        if self.tags.len() < u8::MAX as usize {
            self.tags.push(truncate_id(tag));
        }
    }

    /// Set the privacy level
    pub fn set_privacy_level(&mut self, level: u8) {
        self.privacy_level = Some(level);
    }

    /// ECU id, empty if unset
    pub fn ecu_id(&self) -> &str {
        self.ecu_id.as_deref().unwrap_or("")
    }

    /// Application id, empty if unset
    pub fn app_id(&self) -> &str {
        self.app_id.as_deref().unwrap_or("")
    }

    /// Context id, empty if unset
    pub fn ctx_id(&self) -> &str {
        self.ctx_id.as_deref().unwrap_or("")
    }

    /// Session id
    pub fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    /// Source location
    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    /// Tags in insertion order
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Privacy level
    pub fn privacy_level(&self) -> Option<u8> {
        self.privacy_level
    }

    /// Encoded size of the fields selected by `flags`
    pub fn encoded_len(&self, flags: &HeaderFlags) -> usize {
        let mut len = 0;
        if flags.with_ecu_id() {
            len += 1 + self.ecu_id().len();
        }
        if flags.with_app_and_ctx_id() {
            len += 2 + self.app_id().len() + self.ctx_id().len();
        }
        if flags.with_session_id() {
            len += 4;
        }
        if flags.with_source_location() {
            len += 1 + self.location.as_ref().map_or(0, |loc| loc.file.len()) + 4;
        }
        if flags.with_tags() {
            len += 1 + self.tags.iter().map(|tag| 1 + tag.len()).sum::<usize>();
        }
        if flags.with_privacy_level() {
            len += 1;
        }
        len
    }

    /// Encode the fields selected by `flags`
    pub fn encode(&self, flags: &HeaderFlags, encoder: &mut MessageEncoder<'_>) -> Result<()> {
        if flags.with_ecu_id() {
            encoder.put_id(self.ecu_id())?;
        }
        if flags.with_app_and_ctx_id() {
            encoder.put_id(self.app_id())?;
            encoder.put_id(self.ctx_id())?;
        }
        if flags.with_session_id() {
            encoder.put_u32(self.session_id.unwrap_or(0))?;
        }
        if flags.with_source_location() {
            let (file, line) = self
                .location
                .as_ref()
                .map_or(("", 0), |loc| (loc.file.as_str(), loc.line));
            encoder.put_id(file)?;
            encoder.put_u32(line)?;
        }
        if flags.with_tags() {
            encoder.put_u8(self.tags.len() as u8)?;
            for tag in &self.tags {
                encoder.put_id(tag)?;
            }
        }
        if flags.with_privacy_level() {
            encoder.put_u8(self.privacy_level.unwrap_or(0))?;
        }
        Ok(())
    }

    /// Decode the fields selected by `flags`
    pub fn decode(flags: &HeaderFlags, cursor: &mut MessageCursor<'_>) -> Result<Self> {
        let mut ext = Self::new();
        if flags.with_ecu_id() {
            ext.ecu_id = Some(cursor.get_id()?);
        }
        if flags.with_app_and_ctx_id() {
            ext.app_id = Some(cursor.get_id()?);
            ext.ctx_id = Some(cursor.get_id()?);
        }
        if flags.with_session_id() {
            ext.session_id = Some(cursor.get_u32()?);
        }
        if flags.with_source_location() {
            let file = cursor.get_id()?;
            let line = cursor.get_u32()?;
            ext.location = Some(SourceLocation { file, line });
        }
        if flags.with_tags() {
            let count = cursor.get_u8()?;
            for _ in 0..count {
                ext.tags.push(cursor.get_id()?);
            }
        }
        if flags.with_privacy_level() {
            ext.privacy_level = Some(cursor.get_u8()?);
        }
        Ok(ext)
    }
}

/// Cut an identifier to the 1-byte length limit on a char boundary
fn truncate_id(id: &str) -> String {
    if id.len() <= ExtensionHeader::MAX_ID_LEN {
        return id.to_owned();
    }
    let mut end = ExtensionHeader::MAX_ID_LEN;
    while !id.is_char_boundary(end) {
        end -= 1;
    }
    id[..end].to_owned()
}
