//! # Merkava HTTP Server Module
//!
//! HTTP front end over the request dispatcher, built on axum.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/metrics` - Counters, cache statistics, open channels
//! - `/v1/:channel[/...]` - Channel operations

pub mod channel_routes;
pub mod config;
pub mod observability_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use server::HttpServer;
