//! Command-line arguments
//!
//! ```text
//! merkava [-v...] init  [--config <path>]
//! merkava [-v...] serve [--config <path>]
//! merkava [-v...] exec  [--config <path>]
//! ```

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Merkava - an ordered record store
#[derive(Parser, Debug)]
#[command(name = "merkava", version, about, long_about = None)]
pub struct Cli {
    /// Log at TRACE as well (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ConfigArg {
    /// Path to the JSON configuration file
    #[arg(long = "config", default_value = "./merkava.json")]
    pub path: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the data directory named by the configuration
    Init(ConfigArg),

    /// Serve HTTP, plus the line protocol when enabled, until Ctrl-C
    Serve(ConfigArg),

    /// Answer JSON request lines from stdin with one JSON line each
    Exec(ConfigArg),
}

impl Command {
    pub fn config_path(&self) -> &Path {
        match self {
            Command::Init(arg) | Command::Serve(arg) | Command::Exec(arg) => &arg.path,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
