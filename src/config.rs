//! Logging configuration
//!
//! Loaded from a JSON document:
//!
//! ```json
//! {
//!   "EcuId": "ECU1",
//!   "AppId": "APP1",
//!   "LogSinks": ["CONSOLE", "FILE"],
//!   "LogFile": "/var/log/app.log"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sink names understood by [`LoggerManager::from_config`](crate::LoggerManager::from_config)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    /// `"CONSOLE"`: rendered lines to standard output
    Console,
    /// `"FILE"`: rendered lines appended to `LogFile`
    File,
}

impl LogSink {
    /// Map a configured sink name to a sink
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "CONSOLE" => Ok(LogSink::Console),
            "FILE" => Ok(LogSink::File),
            other => Err(Error::InvalidLogSink(other.to_owned())),
        }
    }
}

/// Process-wide logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "EcuId")]
    ecu_id: String,
    #[serde(rename = "AppId")]
    app_id: String,
    #[serde(rename = "LogSinks")]
    log_sinks: Vec<String>,
    #[serde(rename = "LogFile", default, skip_serializing_if = "Option::is_none")]
    log_file: Option<PathBuf>,
}

impl Config {
    /// Build a configuration in code
    pub fn new(
        ecu_id: impl Into<String>,
        app_id: impl Into<String>,
        log_sinks: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            ecu_id: ecu_id.into(),
            app_id: app_id.into(),
            log_sinks: log_sinks.into_iter().map(Into::into).collect(),
            log_file: None,
        }
    }

    /// Set the file used by the `"FILE"` sink
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Read and parse the configuration file at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|err| Error::InvalidConfig(format!("{}: {err}", path.display())))?;
        Self::from_json(&text)
    }

    /// Parse a configuration document
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| Error::InvalidConfig(err.to_string()))
    }

    /// ECU identifier
    pub fn ecu_id(&self) -> &str {
        &self.ecu_id
    }

    /// Application identifier
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Configured sink names, in order
    pub fn log_sinks(&self) -> &[String] {
        &self.log_sinks
    }

    /// File used by the `"FILE"` sink
    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}
