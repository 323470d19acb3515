//! CLI command implementations

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::Config;
use crate::dispatch::{DispatchError, Dispatcher, Request};
use crate::line_protocol::{error_line, ok_line};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::service::{build_dispatcher, Service};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_lines, write_line, write_response};

/// One `exec` request line
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecRequest {
    pub channel: String,
    pub command: String,
    #[serde(default)]
    pub payload: Value,
}

/// Main CLI entry point
///
/// Parses arguments, applies verbosity and dispatches to the command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    Logger::set_min_severity(Severity::from_verbosity(cli.verbose));
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let config_path = cmd.config_path();
    match &cmd {
        Command::Init(_) => init(config_path),
        Command::Serve(_) => serve(config_path),
        Command::Exec(_) => exec(config_path),
    }
}

fn load_config(config_path: &Path) -> CliResult<Config> {
    let config = Config::load(config_path)?;
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("path", &config_path.display().to_string()),
            ("data_dir", &config.data_path().display().to_string()),
        ],
    );
    Ok(config)
}

fn require_data_dir(config: &Config) -> CliResult<()> {
    if config.data_path().is_dir() {
        Ok(())
    } else {
        Err(CliError::NotInitialized(config.data_path().to_path_buf()))
    }
}

/// Create the data directory. Idempotent.
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let data_dir = config.data_path();

    let existed = data_dir.is_dir();
    fs::create_dir_all(data_dir)
        .map_err(|e| CliError::io(format!("Failed to create {}", data_dir.display()), e))?;

    log_event_with_fields(
        Event::DataDirInitialized,
        &[
            ("data_dir", &data_dir.display().to_string()),
            ("created", if existed { "false" } else { "true" }),
        ],
    );

    write_response(
        &mut io::stdout().lock(),
        json!({
            "initialized": true,
            "created": !existed,
            "data_dir": data_dir.display().to_string(),
        }),
    )
}

/// Run the service until Ctrl-C
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    require_data_dir(&config)?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::io("Failed to start async runtime", e))?;
    runtime.block_on(Service::run(config))?;
    Ok(())
}

/// Execute request lines from stdin against the data directory
pub fn exec(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    require_data_dir(&config)?;

    let dispatcher = build_dispatcher(&config);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    exec_lines(&dispatcher, stdin.lock(), &mut stdout)
}

/// Answer every request line from `reader` with one response line.
///
/// A malformed line gets an error response; only I/O failures stop the loop.
pub fn exec_lines<R: BufRead, W: Write>(
    dispatcher: &Arc<Dispatcher>,
    reader: R,
    writer: &mut W,
) -> CliResult<()> {
    for line in read_lines(reader) {
        let line = line?;
        let response = match parse_exec_request(&line) {
            Ok(request) => match dispatcher.execute(request) {
                Ok(outcome) => ok_line(&outcome),
                Err(e) => error_line(&e),
            },
            Err(e) => {
                dispatcher.metrics().increment_operations_rejected();
                error_line(&e)
            }
        };
        write_line(writer, &response)?;
    }
    Ok(())
}

fn parse_exec_request(line: &str) -> Result<Request, DispatchError> {
    let request: ExecRequest = serde_json::from_str(line)
        .map_err(|e| DispatchError::InvalidArgument(format!("malformed request line: {}", e)))?;
    Request::from_command(&request.channel, &request.command, request.payload)
}
