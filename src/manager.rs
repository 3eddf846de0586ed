//! Logger registry
//!
//! A [`LoggerManager`] is a cheap, cloneable handle onto one registry. The
//! registry maps a context id to its [`Logger`] and the ordered list of
//! handlers that receive the logger's messages:
//!
//! ```text
//!   LoggerManager ──Arc──► Registry
//!                           ├─ identity (ECU id, app id)
//!                           ├─ stamps   (counter, thread id, clock)
//!                           ├─ default handlers (from config sinks)
//!                           └─ Mutex<HashMap<ctx_id, Entry { logger, handlers }>>
//!
//!   Logger ──Weak──► Registry   (no cycle: the registry owns its loggers)
//! ```
//!
//! The mutex covers map lookups and list mutation only. Handlers are copied
//! out of the map before any of them runs.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{Config, LogSink};
use crate::error::{Error, Result};
use crate::handler::{ConsoleHandler, FileHandler, LoggingHandler};
use crate::level::{LogLevel, DEFAULT_THRESHOLD};
use crate::logger::Logger;
use crate::message::Identity;
use crate::stamp::{StampSource, SystemStamps};

/// Shared handle to a handler
pub type HandlerRef = Arc<dyn LoggingHandler>;

struct Entry {
    logger: Arc<Logger>,
    handlers: Vec<HandlerRef>,
}

pub(crate) struct Registry {
    identity: Identity,
    stamps: Arc<dyn StampSource>,
    default_handlers: Vec<HandlerRef>,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Registry {
    pub(crate) fn handlers(&self, key: &str) -> Result<Vec<HandlerRef>> {
        self.entries
            .lock()
            .get(key)
            .map(|entry| entry.handlers.clone())
            .ok_or_else(|| Error::LoggerNotFound(key.to_owned()))
    }
}

/// Registry of loggers and their handlers
#[derive(Clone)]
pub struct LoggerManager {
    registry: Arc<Registry>,
}

impl LoggerManager {
    /// Registry for `identity` with system stamps and no default handlers
    pub fn new(identity: Identity) -> Self {
        Self::with_stamps(identity, Arc::new(SystemStamps::new()), Vec::new())
    }

    /// Registry with an explicit stamp source and default handler list
    ///
    /// Every logger created afterwards starts with a copy of
    /// `default_handlers`.
    pub fn with_stamps(
        identity: Identity,
        stamps: Arc<dyn StampSource>,
        default_handlers: Vec<HandlerRef>,
    ) -> Self {
        Self {
            registry: Arc::new(Registry {
                identity,
                stamps,
                default_handlers,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Registry built from a loaded configuration
    ///
    /// Fails with [`Error::InvalidLogSink`] for an unrecognised sink name and
    /// with [`Error::InvalidConfig`] when a file sink has no usable path.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut handlers: Vec<HandlerRef> = Vec::with_capacity(config.log_sinks().len());
        for name in config.log_sinks() {
            match LogSink::parse(name)? {
                LogSink::Console => handlers.push(Arc::new(ConsoleHandler::new())),
                LogSink::File => {
                    let path = config.log_file().ok_or_else(|| {
                        Error::InvalidConfig("FILE sink requires LogFile".to_owned())
                    })?;
                    let handler = FileHandler::open(path).map_err(|err| {
                        Error::InvalidConfig(format!("cannot open {}: {err}", path.display()))
                    })?;
                    handlers.push(Arc::new(handler));
                }
            }
        }

        info!(
            ecu_id = config.ecu_id(),
            app_id = config.app_id(),
            sinks = ?config.log_sinks(),
            "logger manager initialised"
        );
        let identity = Identity::new(config.ecu_id(), config.app_id());
        Ok(Self::with_stamps(identity, Arc::new(SystemStamps::new()), handlers))
    }

    /// Load the configuration at `path` and build a registry from it
    pub fn init(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::from_config(&Config::load(path)?)
    }

    /// ECU and application ids stamped on every message
    pub fn identity(&self) -> &Identity {
        &self.registry.identity
    }

    /// Register a logger under `ctx_id`
    ///
    /// The first registration of a key wins: a later call with the same key
    /// returns the existing logger unchanged.
    pub fn create_logger(&self, ctx_id: &str, description: &str, threshold: LogLevel) -> Arc<Logger> {
        let mut entries = self.registry.entries.lock();
        if let Some(entry) = entries.get(ctx_id) {
            warn!(ctx_id = ctx_id, "logger already registered, keeping the first registration");
            return Arc::clone(&entry.logger);
        }

        let logger = Arc::new(Logger::new(
            ctx_id,
            description,
            threshold,
            self.registry.identity.clone(),
            Arc::clone(&self.registry.stamps),
            Arc::downgrade(&self.registry),
        ));
        entries.insert(
            ctx_id.to_owned(),
            Entry {
                logger: Arc::clone(&logger),
                handlers: self.registry.default_handlers.clone(),
            },
        );
        debug!(ctx_id = ctx_id, description = description, threshold = %threshold, "logger created");
        logger
    }

    /// Register a logger with the default threshold ([`LogLevel::Warn`])
    pub fn create_logger_with_default(&self, ctx_id: &str, description: &str) -> Arc<Logger> {
        self.create_logger(ctx_id, description, DEFAULT_THRESHOLD)
    }

    /// Look up a logger
    pub fn get_logger(&self, key: &str) -> Option<Arc<Logger>> {
        self.registry
            .entries
            .lock()
            .get(key)
            .map(|entry| Arc::clone(&entry.logger))
    }

    /// Append a handler to a logger's handler list
    pub fn add_logging_handler(&self, key: &str, handler: HandlerRef) -> Result<()> {
        let mut entries = self.registry.entries.lock();
        let entry = entries
            .get_mut(key)
            .ok_or_else(|| Error::LoggerNotFound(key.to_owned()))?;
        entry.handlers.push(handler);
        debug!(ctx_id = key, handlers = entry.handlers.len(), "logging handler added");
        Ok(())
    }

    /// Snapshot of a logger's handlers in registration order
    pub fn get_logging_handlers(&self, key: &str) -> Result<Vec<HandlerRef>> {
        self.registry.handlers(key)
    }

    /// Number of registered loggers
    pub fn len(&self) -> usize {
        self.registry.entries.lock().len()
    }

    /// Whether no logger is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl core::fmt::Debug for LoggerManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoggerManager")
            .field("identity", &self.registry.identity)
            .field("loggers", &self.len())
            .finish()
    }
}
