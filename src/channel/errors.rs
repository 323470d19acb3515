//! Channel error types
//!
//! Error codes:
//! - MRKV_STORAGE_IO_ERROR (ERROR severity)
//! - MRKV_STORAGE_WRITE_FAILED (ERROR severity)
//! - MRKV_STORAGE_READ_FAILED (ERROR severity)
//! - MRKV_DATA_CORRUPTION (ERROR severity, scoped to one record or index)
//! - MRKV_INVALID_INPUT (ERROR severity)
//! - MRKV_CONFIG_ERROR (FATAL severity)
//! - MRKV_IDENTIFIER_OVERFLOW (ERROR severity)
//! - MRKV_CHANNEL_CLOSED (ERROR severity)
//! - MRKV_UNSUPPORTED (ERROR severity)
//!
//! "Record not found" and "record soft-deleted" are not errors: the channel
//! reports them as `Ok(None)`.

use std::fmt;
use std::io;

/// Severity levels for channel errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, server continues
    Error,
    /// The channel cannot be used at all
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Channel error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelErrorCode {
    /// Disk I/O failure outside a specific read or write
    StorageIoError,
    /// Record, index or counter write failed
    StorageWriteFailed,
    /// Record or index read failed
    StorageReadFailed,
    /// Stored bytes do not decode (bad magic, checksum, JSON or index entry)
    DataCorruption,
    /// Caller supplied input the channel cannot act on
    InvalidInput,
    /// Storage root missing or unusable
    ConfigError,
    /// Identifier does not fit the fixed index entry width
    IdentifierOverflow,
    /// Operation on a channel handle that has been flushed
    ChannelClosed,
    /// Operation the storage format cannot support
    Unsupported,
}

impl ChannelErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ChannelErrorCode::StorageIoError => "MRKV_STORAGE_IO_ERROR",
            ChannelErrorCode::StorageWriteFailed => "MRKV_STORAGE_WRITE_FAILED",
            ChannelErrorCode::StorageReadFailed => "MRKV_STORAGE_READ_FAILED",
            ChannelErrorCode::DataCorruption => "MRKV_DATA_CORRUPTION",
            ChannelErrorCode::InvalidInput => "MRKV_INVALID_INPUT",
            ChannelErrorCode::ConfigError => "MRKV_CONFIG_ERROR",
            ChannelErrorCode::IdentifierOverflow => "MRKV_IDENTIFIER_OVERFLOW",
            ChannelErrorCode::ChannelClosed => "MRKV_CHANNEL_CLOSED",
            ChannelErrorCode::Unsupported => "MRKV_UNSUPPORTED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ChannelErrorCode::ConfigError => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    /// Whether the failure came from the storage layer rather than from the caller
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            ChannelErrorCode::StorageIoError
                | ChannelErrorCode::StorageWriteFailed
                | ChannelErrorCode::StorageReadFailed
                | ChannelErrorCode::DataCorruption
        )
    }
}

impl fmt::Display for ChannelErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Channel error with full context
#[derive(Debug)]
pub struct ChannelError {
    code: ChannelErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl ChannelError {
    fn new(code: ChannelErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    fn with_source(code: ChannelErrorCode, message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Create a new storage I/O error
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_source(ChannelErrorCode::StorageIoError, message, source)
    }

    /// Create a new write failed error
    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_source(ChannelErrorCode::StorageWriteFailed, message, source)
    }

    /// Create a new read failed error
    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_source(ChannelErrorCode::StorageReadFailed, message, source)
    }

    /// Create a new data corruption error
    pub fn data_corruption(message: impl Into<String>) -> Self {
        Self::new(ChannelErrorCode::DataCorruption, message)
    }

    /// Create a data corruption error with byte offset context
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self::new(ChannelErrorCode::DataCorruption, reason)
            .with_details(format!("byte_offset: {}", offset))
    }

    /// Create a data corruption error with record identifier context
    pub fn corruption_for_record(id: u64, reason: impl Into<String>) -> Self {
        Self::new(ChannelErrorCode::DataCorruption, reason).with_details(format!("id: {}", id))
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ChannelErrorCode::InvalidInput, message)
    }

    /// Create a configuration error (storage root unusable)
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::new(ChannelErrorCode::ConfigError, message)
    }

    /// Create an identifier overflow error
    pub fn identifier_overflow(id: u64, width: usize) -> Self {
        Self::new(
            ChannelErrorCode::IdentifierOverflow,
            format!("identifier {} does not fit an index entry of {} bytes", id, width),
        )
    }

    /// Create an identifier overflow error for an exhausted counter
    pub fn counter_exhausted(id: u64) -> Self {
        Self::new(
            ChannelErrorCode::IdentifierOverflow,
            format!("identifier counter exhausted after {}", id),
        )
    }

    /// Create a closed channel error
    pub fn channel_closed(channel: &str) -> Self {
        Self::new(
            ChannelErrorCode::ChannelClosed,
            format!("channel '{}' has been flushed", channel),
        )
    }

    /// Create an unsupported operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ChannelErrorCode::Unsupported, message)
    }

    /// Attach details to the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Returns the error code
    pub fn code(&self) -> ChannelErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ChannelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;
