//! CLI module for Merkava
//!
//! Provides command-line interface for:
//! - init: Create the data directory
//! - serve: Run the HTTP (and optional line protocol) service
//! - exec: Execute JSON request lines from stdin

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, ConfigArg};
pub use commands::{exec, exec_lines, init, run, run_command, serve, ExecRequest};
pub use errors::{CliError, CliResult};
pub use io::{read_lines, write_line, write_response};
