//! Service configuration
//!
//! Loaded from a JSON file and validated once at load; nothing downstream
//! re-checks these values.
//!
//! ```json
//! {
//!   "data_dir": "/var/lib/merkava/data",
//!   "maximum_recent": 20,
//!   "index_size": 17,
//!   "cache_capacity": 1024,
//!   "operation_timeout_ms": 5000,
//!   "http": { "host": "127.0.0.1", "port": 6363, "cors_origins": [] },
//!   "line_protocol": { "enabled": false, "host": "127.0.0.1", "port": 6364, "max_line_bytes": 16384 }
//! }
//! ```
//!
//! Only `data_dir` is required.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::channel::{
    ChannelSettings, DEFAULT_CACHE_CAPACITY, DEFAULT_INDEX_SIZE, DEFAULT_MAXIMUM_RECENT,
};
use crate::http_server::HttpServerConfig;
use crate::line_protocol::LineProtocolConfig;

/// Widest supported index entry (a `u64` needs 20 decimal digits).
pub const MAX_INDEX_SIZE: usize = 32;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Storage root holding one directory per channel (required)
    pub data_dir: PathBuf,

    /// Cap on records per recent call (default 20)
    #[serde(default = "default_maximum_recent")]
    pub maximum_recent: usize,

    /// Index entry width in bytes (default 17)
    #[serde(default = "default_index_size")]
    pub index_size: usize,

    /// Cached envelopes across all channels, 0 disables (default 1024)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Deadline for one operation in milliseconds (default 5000)
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    #[serde(default)]
    pub http: HttpServerConfig,

    #[serde(default)]
    pub line_protocol: LineProtocolConfig,
}

fn default_maximum_recent() -> usize {
    DEFAULT_MAXIMUM_RECENT
}
fn default_index_size() -> usize {
    DEFAULT_INDEX_SIZE
}
fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}
fn default_operation_timeout_ms() -> u64 {
    5000
}

impl Config {
    /// Configuration with defaults for everything but the data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            maximum_recent: default_maximum_recent(),
            index_size: default_index_size(),
            cache_capacity: default_cache_capacity(),
            operation_timeout_ms: default_operation_timeout_ms(),
            http: HttpServerConfig::default(),
            line_protocol: LineProtocolConfig::default(),
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration text
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "data_dir",
                reason: "must not be empty".to_string(),
            });
        }

        if self.maximum_recent == 0 {
            return Err(ConfigError::InvalidValue {
                field: "maximum_recent",
                reason: "must be > 0".to_string(),
            });
        }

        if self.index_size == 0 || self.index_size > MAX_INDEX_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "index_size",
                reason: format!("must be between 1 and {}, got {}", MAX_INDEX_SIZE, self.index_size),
            });
        }

        if self.operation_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "operation_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }

        if let Some(origin) = self.http.invalid_origins().first() {
            return Err(ConfigError::InvalidValue {
                field: "http.cors_origins",
                reason: format!("not a valid origin: {:?}", origin),
            });
        }

        if self.line_protocol.max_line_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "line_protocol.max_line_bytes",
                reason: "must be > 0".to_string(),
            });
        }

        if self.line_protocol.enabled
            && self.line_protocol.host == self.http.host
            && self.line_protocol.port == self.http.port
        {
            return Err(ConfigError::InvalidValue {
                field: "line_protocol.port",
                reason: "must differ from http.port on the same host".to_string(),
            });
        }

        Ok(())
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> &Path {
        &self.data_dir
    }

    pub fn channel_settings(&self) -> ChannelSettings {
        ChannelSettings {
            maximum_recent: self.maximum_recent,
            index_size: self.index_size,
        }
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}
