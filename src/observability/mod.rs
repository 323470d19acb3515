//! Observability subsystem
//!
//! - Structured logging (one JSON object per line)
//! - Typed lifecycle events
//! - Process-wide operational counters
//!
//! Observability is read-only: nothing here influences channel behavior,
//! and a failed log write is dropped rather than surfaced.
//!
//! # Usage
//!
//! ```ignore
//! use merkava::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::ChannelOpened, &[("channel", "chat")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_records_created();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
