//! # HTTP Server
//!
//! `/health` and `/metrics` at the root, channel operations under `/v1`.
//! Request tracing and CORS wrap both.

use std::io;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use super::channel_routes::channel_routes;
use super::config::HttpServerConfig;
use super::observability_routes::observability_routes;
use crate::dispatch::Dispatcher;
use crate::observability::{log_event_with_fields, Event};

/// HTTP front end for a dispatcher
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let router = Self::build_router(&config, dispatcher);
        Self { config, router }
    }

    fn build_router(config: &HttpServerConfig, dispatcher: Arc<Dispatcher>) -> Router {
        Router::new()
            .merge(observability_routes(dispatcher.clone()))
            .nest("/v1", channel_routes(dispatcher))
            .layer(TraceLayer::new_for_http())
            .layer(config.cors_layer())
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// The assembled router, for serving in-process
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until `shutdown` flips to true
    pub async fn start(self, mut shutdown: watch::Receiver<bool>) -> io::Result<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr).await?;

        log_event_with_fields(
            Event::ServerStart,
            &[("listener", "http"), ("addr", &listener.local_addr()?.to_string())],
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                // A dropped sender also means shutdown
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await
    }
}
