//! merkava - an ordered record store
//!
//! Records live one file per record inside a per-channel directory; a
//! fixed-width, append-only index log keeps insertion order so the most
//! recent records can be read back without loading the whole channel.
//!
//! Layers, leaves first:
//!
//! - [`channel`]: record encoding, storage, index log, cache, lifecycle
//! - [`registry`]: one shared handle per channel name
//! - [`dispatch`]: closed operation set and transport status mapping
//! - [`http_server`], [`line_protocol`]: front ends
//! - [`service`], [`cli`]: process wiring

pub mod channel;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod http_server;
pub mod line_protocol;
pub mod observability;
pub mod registry;
pub mod service;
