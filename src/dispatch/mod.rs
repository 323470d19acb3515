//! Request dispatch
//!
//! A closed set of operations replaces lookup-by-command-name: requests are
//! parsed into [`Operation`] once, at the transport boundary, and unknown
//! commands never reach a channel.

mod dispatcher;
mod errors;
mod operation;
mod outcome;

pub use dispatcher::{Dispatcher, DEFAULT_OPERATION_TIMEOUT};
pub use errors::{DispatchError, DispatchResult};
pub use operation::{parse_identifier, Operation, Request};
pub use outcome::Outcome;
