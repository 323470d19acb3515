//! Dispatch error types
//!
//! Uses thiserror for automatic Display and Error implementations.

use std::time::Duration;

use thiserror::Error;

use crate::channel::{ChannelError, ChannelErrorCode};

/// Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Failures between an inbound request and a channel operation
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Command name outside the closed operation set
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Command arguments missing or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation did not finish before the deadline
    #[error("Operation exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// The blocking task running the operation panicked or was cancelled
    #[error("Operation task failed: {0}")]
    TaskFailed(String),

    /// The channel reported an error
    #[error("{0}")]
    Channel(#[from] ChannelError),
}

impl DispatchError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            DispatchError::UnknownCommand(_) => 400,
            DispatchError::InvalidArgument(_) => 400,

            // 500 / 504
            DispatchError::TaskFailed(_) => 500,
            DispatchError::DeadlineExceeded(_) => 504,

            DispatchError::Channel(e) => match e.code() {
                ChannelErrorCode::InvalidInput => 400,
                ChannelErrorCode::ChannelClosed => 409,
                ChannelErrorCode::Unsupported => 501,
                ChannelErrorCode::StorageIoError
                | ChannelErrorCode::StorageWriteFailed
                | ChannelErrorCode::StorageReadFailed
                | ChannelErrorCode::DataCorruption
                | ChannelErrorCode::ConfigError
                | ChannelErrorCode::IdentifierOverflow => 500,
            },
        }
    }

    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::UnknownCommand(_) => "MRKV_UNKNOWN_COMMAND",
            DispatchError::InvalidArgument(_) => "MRKV_INVALID_ARGUMENT",
            DispatchError::DeadlineExceeded(_) => "MRKV_DEADLINE_EXCEEDED",
            DispatchError::TaskFailed(_) => "MRKV_TASK_FAILED",
            DispatchError::Channel(e) => e.code().code(),
        }
    }

    /// Caller-side problems (logged at warn level, counted as rejected)
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500 || self.status_code() == 501
    }
}
