//! Observable events
//!
//! Events are explicit and typed; each maps to one stable log event name.

use std::fmt;

use super::logger::Severity;

/// Observable events in merkava
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration & lifecycle
    /// Configuration loaded and validated
    ConfigLoaded,
    /// Data directory initialized
    DataDirInitialized,
    /// A service task started listening
    ServerStart,
    /// Shutdown signal observed
    ShutdownStart,
    /// All service tasks stopped
    ShutdownComplete,

    // Channel lifecycle
    /// Channel opened (directory, index and counter ready)
    ChannelOpened,
    /// Channel flushed (all files and directory removed)
    ChannelFlushed,
    /// Torn trailing index entry removed at open
    IndexTailTruncated,

    // Record operations
    /// Record created and indexed
    RecordCreated,
    /// Record updated
    RecordUpdated,
    /// Record soft-deleted
    RecordDeleted,
    /// Record restored
    RecordRestored,
    /// Recent scan finished
    RecentScanned,

    // Requests
    /// Request rejected before or during dispatch
    RequestRejected,
    /// Request failed with a storage error
    RequestFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::DataDirInitialized => "DATA_DIR_INITIALIZED",
            Event::ServerStart => "SERVER_START",
            Event::ShutdownStart => "SHUTDOWN_START",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",

            Event::ChannelOpened => "CHANNEL_OPENED",
            Event::ChannelFlushed => "CHANNEL_FLUSHED",
            Event::IndexTailTruncated => "INDEX_TAIL_TRUNCATED",

            Event::RecordCreated => "RECORD_CREATED",
            Event::RecordUpdated => "RECORD_UPDATED",
            Event::RecordDeleted => "RECORD_DELETED",
            Event::RecordRestored => "RECORD_RESTORED",
            Event::RecentScanned => "RECENT_SCANNED",

            Event::RequestRejected => "REQUEST_REJECTED",
            Event::RequestFailed => "REQUEST_FAILED",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::IndexTailTruncated | Event::RequestRejected => Severity::Warn,
            Event::RequestFailed => Severity::Error,
            Event::RecordCreated
            | Event::RecordUpdated
            | Event::RecordDeleted
            | Event::RecordRestored
            | Event::RecentScanned => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
