//! Line protocol listener settings

use serde::{Deserialize, Serialize};

/// Default cap on one request line, terminator included
pub const DEFAULT_MAX_LINE_BYTES: usize = 16_384;

/// Disabled unless the configuration file turns it on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineProtocolConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Longer request lines are answered with an error and the connection closed
    pub max_line_bytes: usize,
}

impl Default for LineProtocolConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 6364,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl LineProtocolConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
