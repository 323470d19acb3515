//! Long-running service composition
//!
//! A fixed set of tasks (the HTTP server, plus the line protocol listener
//! when enabled) starts together under one shutdown signal. Ctrl-C, or any
//! task exiting, stops all of them.

use std::fs;
use std::io;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::channel::RecordCache;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::http_server::HttpServer;
use crate::line_protocol::LineServer;
use crate::observability::{log_event, log_event_with_fields, Event, MetricsRegistry};
use crate::registry::ChannelRegistry;

/// Service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Data directory unusable: {0}")]
    DataDir(String),

    #[error("{listener} listener failed: {source}")]
    Listener {
        listener: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Service task failed: {0}")]
    Task(String),
}

/// Build the dispatcher stack for `config`: cache, metrics, registry.
pub fn build_dispatcher(config: &Config) -> Arc<Dispatcher> {
    let registry = ChannelRegistry::new(
        config.data_path(),
        config.channel_settings(),
        Arc::new(RecordCache::new(config.cache_capacity)),
        Arc::new(MetricsRegistry::new()),
    );
    Arc::new(Dispatcher::new(Arc::new(registry), config.operation_timeout()))
}

/// The running service
pub struct Service;

impl Service {
    /// Run until Ctrl-C or until any task stops.
    pub async fn run(config: Config) -> Result<(), ServiceError> {
        let data_dir = config.data_path();
        if !fs::metadata(data_dir).map(|m| m.is_dir()).unwrap_or(false) {
            return Err(ServiceError::DataDir(format!(
                "{} does not exist or is not a directory (run `merkava init` first)",
                data_dir.display()
            )));
        }

        let dispatcher = build_dispatcher(&config);
        let (stop, shutdown) = watch::channel(false);
        let mut tasks = JoinSet::new();

        let http = HttpServer::new(config.http.clone(), dispatcher.clone());
        let http_shutdown = shutdown.clone();
        tasks.spawn(async move {
            http.start(http_shutdown)
                .await
                .map_err(|source| ServiceError::Listener {
                    listener: "http",
                    source,
                })
        });

        if config.line_protocol.enabled {
            let line = LineServer::new(config.line_protocol.clone(), dispatcher.clone());
            let line_shutdown = shutdown.clone();
            tasks.spawn(async move {
                line.start(line_shutdown)
                    .await
                    .map_err(|source| ServiceError::Listener {
                        listener: "line",
                        source,
                    })
            });
        }

        let first = tokio::select! {
            _ = tokio::signal::ctrl_c() => None,
            finished = tasks.join_next() => finished,
        };

        log_event_with_fields(
            Event::ShutdownStart,
            &[("reason", if first.is_none() { "signal" } else { "task_exit" })],
        );
        let _ = stop.send(true);

        let mut result = flatten(first);
        while let Some(finished) = tasks.join_next().await {
            let outcome = flatten(Some(finished));
            if result.is_ok() {
                result = outcome;
            }
        }

        log_event(Event::ShutdownComplete);
        result
    }
}

fn flatten(
    finished: Option<Result<Result<(), ServiceError>, tokio::task::JoinError>>,
) -> Result<(), ServiceError> {
    match finished {
        None => Ok(()),
        Some(Ok(result)) => result,
        Some(Err(join_error)) => Err(ServiceError::Task(join_error.to_string())),
    }
}
