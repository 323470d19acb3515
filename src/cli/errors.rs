//! CLI error types
//!
//! Every CLI error ends the process with exit status 1. The `MRKV_CLI_*`
//! code is printed ahead of the message.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::service::ServiceError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("data directory {} does not exist, run `merkava init` first", .0.display())]
    NotInitialized(PathBuf),

    #[error("{0}")]
    Service(#[from] ServiceError),
}

impl CliError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "MRKV_CLI_CONFIG_ERROR",
            Self::Io { .. } | Self::Json(_) => "MRKV_CLI_IO_ERROR",
            Self::NotInitialized(_) => "MRKV_CLI_NOT_INITIALIZED",
            Self::Service(_) => "MRKV_CLI_SERVICE_FAILED",
        }
    }
}

impl From<io::Error> for CliError {
    fn from(source: io::Error) -> Self {
        Self::io("stdio", source)
    }
}

pub type CliResult<T> = Result<T, CliError>;
