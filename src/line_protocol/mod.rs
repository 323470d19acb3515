//! Line protocol front end
//!
//! A plain TCP listener speaking one request per line, answered with one
//! JSON object per line. Dispatch is shared with the HTTP front end.

mod config;
mod protocol;
mod server;

pub use config::LineProtocolConfig;
pub use protocol::{alive_line, error_line, ok_line, LineRequest, ISALIVE};
pub use server::{respond, LineServer};
