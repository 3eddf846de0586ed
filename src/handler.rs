//! Delivery targets for finished messages
//!
//! Every handler implements [`LoggingHandler::emit`]. Emits run on the
//! flushing thread, outside the registry lock, so each handler guards its
//! own state:
//!
//! | Handler                  | Output                          | Locking            |
//! |--------------------------|---------------------------------|--------------------|
//! | [`ConsoleHandler`]       | text line to stdout             | stdout lock        |
//! | [`FileHandler`]          | text line appended to a file    | internal mutex     |
//! | [`RotatingFileHandler`]  | as file, rolled over by policy  | internal mutex     |
//! | [`NetworkHandler`]       | binary message to a transport   | transport's own    |
//!
//! Handlers never fail the caller: I/O errors are reported as `warn!`
//! events and the message is dropped.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::warn;

use crate::message::{Message, SharedMessage};

/// Capability to receive finished messages
pub trait LoggingHandler: Send + Sync {
    /// Deliver one message
    fn emit(&self, message: SharedMessage);
}

/// Writes the rendered line of every message to standard output
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleHandler;

impl ConsoleHandler {
    /// Create a console handler
    pub const fn new() -> Self {
        Self
    }

    /// Write the rendered line of `message`, newline terminated, to `out`
    pub fn write_line<W: Write>(out: &mut W, message: &Message) -> io::Result<()> {
        writeln!(out, "{}", message.as_text())
    }
}

impl LoggingHandler for ConsoleHandler {
    fn emit(&self, message: SharedMessage) {
        // One locked write per line keeps concurrent lines whole
        let mut out = io::stdout().lock();
        if let Err(err) = Self::write_line(&mut out, &message) {
            warn!(error = %err, "console handler write failed");
        }
    }
}

/// An open log file and the bookkeeping rollover policies look at
#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    file: File,
    written: u64,
    opened_at: SystemTime,
}

impl LogFile {
    /// Open `path` for appending, creating it if needed
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            written,
            opened_at: SystemTime::now(),
        })
    }

    /// Path of the active file
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes in the active file
    #[inline]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// When the active file was opened
    #[inline]
    pub fn opened_at(&self) -> SystemTime {
        self.opened_at
    }

    /// Append one line
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.written += line.len() as u64 + 1;
        Ok(())
    }
}

/// Appends the rendered line of every message to a file
#[derive(Debug)]
pub struct FileHandler {
    file: Mutex<LogFile>,
}

impl FileHandler {
    /// Open `path` for appending
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        Ok(Self {
            file: Mutex::new(LogFile::open(path)?),
        })
    }

    /// Path of the log file
    pub fn path(&self) -> PathBuf {
        self.file.lock().path().to_path_buf()
    }
}

impl LoggingHandler for FileHandler {
    fn emit(&self, message: SharedMessage) {
        let mut file = self.file.lock();
        if let Err(err) = file.write_line(message.as_text()) {
            warn!(path = %file.path().display(), error = %err, "file handler write failed");
        }
    }
}

/// Decides when a [`RotatingFileHandler`] starts a new file and how the old
/// one is set aside
pub trait RolloverPolicy: Send {
    /// Whether writing `incoming` more bytes should first roll the file over
    fn should_rollover(&self, file: &LogFile, incoming: usize) -> bool;

    /// Move the active file out of the way; it is reopened afterwards
    fn do_rollover(&mut self, path: &Path) -> io::Result<()>;
}

/// `path` with `.suffix` appended to the full file name
fn suffixed(path: &Path, suffix: impl core::fmt::Display) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{suffix}"));
    PathBuf::from(name)
}

/// Roll over once the file would exceed `max_bytes`
///
/// Old files are kept as `path.1` (newest) through `path.N`; the oldest is
/// deleted. With `backup_count == 0` the file is simply truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRollover {
    /// Size limit of the active file
    pub max_bytes: u64,
    /// Number of rolled-over files to keep
    pub backup_count: u32,
}

impl RolloverPolicy for SizeRollover {
    fn should_rollover(&self, file: &LogFile, incoming: usize) -> bool {
        file.written() > 0 && file.written() + incoming as u64 > self.max_bytes
    }

    fn do_rollover(&mut self, path: &Path) -> io::Result<()> {
        if self.backup_count == 0 {
            return fs::remove_file(path);
        }

        let oldest = suffixed(path, self.backup_count);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.backup_count).rev() {
            let src = suffixed(path, index);
            if src.exists() {
                fs::rename(&src, suffixed(path, index + 1))?;
            }
        }
        fs::rename(path, suffixed(path, 1))
    }
}

/// Roll over once the active file is older than `interval`
///
/// Old files are renamed to `path.<unix seconds at rollover>`, or
/// `path.<secs>.<n>` with the first free `n` when that name is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedRollover {
    /// Maximum age of the active file
    pub interval: Duration,
}

impl RolloverPolicy for TimedRollover {
    fn should_rollover(&self, file: &LogFile, _incoming: usize) -> bool {
        let age = file.opened_at().elapsed().unwrap_or_default();
        file.written() > 0 && age >= self.interval
    }

    fn do_rollover(&mut self, path: &Path) -> io::Result<()> {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let mut target = suffixed(path, secs);
        let mut n = 1u32;
        while target.exists() {
            target = suffixed(path, format!("{secs}.{n}"));
            n += 1;
        }
        fs::rename(path, target)
    }
}

struct Rotating<P> {
    path: PathBuf,
    // `None` after a rollover whose reopen failed; the next write retries
    file: Option<LogFile>,
    policy: P,
}

/// File handler that starts a new file whenever its policy says so
pub struct RotatingFileHandler<P: RolloverPolicy> {
    inner: Mutex<Rotating<P>>,
}

impl<P: RolloverPolicy> RotatingFileHandler<P> {
    /// Open `path` for appending under `policy`
    pub fn open(path: impl Into<PathBuf>, policy: P) -> io::Result<Self> {
        let path = path.into();
        let file = LogFile::open(path.clone())?;
        Ok(Self {
            inner: Mutex::new(Rotating {
                path,
                file: Some(file),
                policy,
            }),
        })
    }

    /// Path of the active file
    pub fn path(&self) -> PathBuf {
        self.inner.lock().path.clone()
    }

    /// Whether the next message of `incoming` bytes would trigger a rollover
    ///
    /// Always `false` while no file is open.
    pub fn should_rollover(&self, incoming: usize) -> bool {
        let inner = self.inner.lock();
        Self::rollover_due(&inner, incoming)
    }

    /// Roll over now, regardless of the policy's verdict
    pub fn do_rollover(&self) -> io::Result<()> {
        let mut inner = self.inner.lock();
        Self::roll(&mut inner)
    }

    fn rollover_due(inner: &Rotating<P>, incoming: usize) -> bool {
        match &inner.file {
            Some(file) => inner.policy.should_rollover(file, incoming),
            None => false,
        }
    }

    fn roll(inner: &mut Rotating<P>) -> io::Result<()> {
        if let Some(active) = inner.file.as_mut() {
            active.file.flush()?;
        }
        let previous = inner.file.take();
        if let Err(err) = inner.policy.do_rollover(&inner.path) {
            // The old file was not moved, keep appending to it
            inner.file = previous;
            return Err(err);
        }
        drop(previous);
        inner.file = Some(LogFile::open(inner.path.clone())?);
        Ok(())
    }

    fn active(inner: &mut Rotating<P>) -> io::Result<&mut LogFile> {
        let file = match inner.file.take() {
            Some(file) => file,
            None => LogFile::open(inner.path.clone())?,
        };
        Ok(inner.file.insert(file))
    }

    fn write(inner: &mut Rotating<P>, line: &str) -> io::Result<()> {
        if Self::rollover_due(inner, line.len() + 1) {
            Self::roll(inner)?;
        }
        Self::active(inner)?.write_line(line)
    }
}

impl<P: RolloverPolicy> LoggingHandler for RotatingFileHandler<P> {
    fn emit(&self, message: SharedMessage) {
        let mut inner = self.inner.lock();
        if let Err(err) = Self::write(&mut inner, message.as_text()) {
            warn!(path = %inner.path.display(), error = %err, "rotating file handler write failed");
        }
    }
}

impl<P: RolloverPolicy + core::fmt::Debug> core::fmt::Debug for RotatingFileHandler<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RotatingFileHandler")
            .field("path", &inner.path)
            .field("file", &inner.file)
            .field("policy", &inner.policy)
            .finish()
    }
}

/// Byte sink a [`NetworkHandler`] forwards encoded messages to
///
/// Implementations apply their own timeouts and must be safe to call from
/// several flushing threads at once.
pub trait Transport: Send + Sync {
    /// Send one encoded message
    fn send(&self, bytes: &[u8]) -> io::Result<()>;
}

/// Forwards the binary form of every message to a [`Transport`]
#[derive(Debug)]
pub struct NetworkHandler<T: Transport> {
    transport: T,
}

impl<T: Transport> NetworkHandler<T> {
    /// Wrap a transport
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> LoggingHandler for NetworkHandler<T> {
    fn emit(&self, message: SharedMessage) {
        let bytes = match message.to_bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(ctx_id = message.ctx_id(), error = %err, "network handler could not encode message");
                return;
            }
        };
        if let Err(err) = self.transport.send(&bytes) {
            warn!(ctx_id = message.ctx_id(), error = %err, "network handler send failed");
        }
    }
}
