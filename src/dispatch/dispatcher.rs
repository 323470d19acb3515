//! Request dispatcher
//!
//! Maps one [`Request`] to exactly one channel operation. Every transport
//! (HTTP, line protocol, CLI `exec`) goes through here, so failure logging
//! and the rejected/failed counters live in one place.
//!
//! Channel operations are blocking file I/O. Async callers use
//! [`Dispatcher::execute_with_deadline`], which runs the operation on the
//! blocking pool under a deadline. A timed-out operation is reported to the
//! caller but keeps running to completion on its thread: file writes are
//! never abandoned halfway.

use std::sync::Arc;
use std::time::Duration;

use super::errors::{DispatchError, DispatchResult};
use super::operation::{Operation, Request};
use super::outcome::Outcome;
use crate::channel::ChannelErrorCode;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::registry::ChannelRegistry;

/// Default deadline for one operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(5000);

/// Runs requests against a channel registry
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ChannelRegistry>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<ChannelRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        self.registry.metrics()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one request on the current thread.
    pub fn execute(&self, request: Request) -> DispatchResult<Outcome> {
        let result = self.run(&request);
        if let Err(e) = &result {
            self.record_failure(&request.channel, request.operation.name(), e);
        }
        result
    }

    /// Run one request on the blocking pool under the operation deadline.
    pub async fn execute_with_deadline(self: &Arc<Self>, request: Request) -> DispatchResult<Outcome> {
        let channel = request.channel.clone();
        let operation = request.operation.name();

        let dispatcher = Arc::clone(self);
        let task = tokio::task::spawn_blocking(move || dispatcher.execute(request));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                let e = DispatchError::TaskFailed(join_error.to_string());
                self.record_failure(&channel, operation, &e);
                Err(e)
            }
            Err(_) => {
                let e = DispatchError::DeadlineExceeded(self.timeout);
                self.record_failure(&channel, operation, &e);
                Err(e)
            }
        }
    }

    /// A handle fetched just before a concurrent flush is closed by the time
    /// its lock is taken; the registry then hands out the fresh channel, so
    /// the operation is retried once.
    fn run(&self, request: &Request) -> DispatchResult<Outcome> {
        retry_if_closed(|| self.run_once(request))
    }

    fn run_once(&self, request: &Request) -> DispatchResult<Outcome> {
        let channel = || self.registry.channel(&request.channel);

        let outcome = match &request.operation {
            Operation::Create { payload } => Outcome::Created(channel()?.create(payload.clone())?),
            Operation::Retrieve { id, force } => match channel()?.retrieve(*id, *force)? {
                Some(envelope) => Outcome::Found(envelope),
                None => Outcome::Absent,
            },
            Operation::Update { id, payload } => {
                Outcome::Updated(channel()?.update(*id, payload.clone())?)
            }
            Operation::Delete { id } => {
                channel()?.delete(*id)?;
                Outcome::Deleted
            }
            Operation::Restore { id } => Outcome::Restored(channel()?.restore(*id)?),
            Operation::Recent { count } => Outcome::Recent(channel()?.recent_from_input(count)?),
            Operation::Stats => Outcome::Stats(channel()?.stats()?),
            // The registry must forget the handle, so flush goes through it
            Operation::Flush => Outcome::Flushed {
                files_removed: self.registry.flush(&request.channel)?,
            },
            Operation::Purge => match channel()?.purge()? {},
            Operation::Connect => {
                channel()?;
                Outcome::Connected
            }
        };

        Ok(outcome)
    }

    fn record_failure(&self, channel: &str, operation: &str, error: &DispatchError) {
        let status = error.status_code().to_string();
        let message = error.to_string();
        let fields = [
            ("channel", channel),
            ("operation", operation),
            ("code", error.code()),
            ("status", status.as_str()),
            ("error", message.as_str()),
        ];

        if error.is_client_error() {
            self.metrics().increment_operations_rejected();
            log_event_with_fields(Event::RequestRejected, &fields);
        } else {
            self.metrics().increment_operations_failed();
            log_event_with_fields(Event::RequestFailed, &fields);
        }
    }
}

/// Run `op`, and run it once more if it failed on a flushed channel handle.
fn retry_if_closed<T>(mut op: impl FnMut() -> DispatchResult<T>) -> DispatchResult<T> {
    match op() {
        Err(DispatchError::Channel(e)) if e.code() == ChannelErrorCode::ChannelClosed => op(),
        other => other,
    }
}
