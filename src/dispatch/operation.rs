//! Closed set of channel operations
//!
//! Every inbound request, whatever its transport, is parsed into one
//! [`Request`] at this boundary. Unknown command names and malformed
//! arguments are rejected here with a typed error.
//!
//! Command payload conventions (line protocol and `exec`):
//!
//! | Command            | Payload                                   |
//! |--------------------|-------------------------------------------|
//! | `create` / `push`  | any JSON value, stored as `data`          |
//! | `retrieve`         | `N`, `"N"` or `{"id": N, "force": bool}`  |
//! | `update`           | `{"id": N, "data": value}`                |
//! | `delete`/`restore` | `N`, `"N"` or `{"id": N}`                 |
//! | `recent`           | `N`, `"N"`, `{"count": N}` or nothing     |
//! | `stats`/`flush`/`purge`/`connect` | ignored                     |

use serde_json::Value;

use super::errors::{DispatchError, DispatchResult};

/// One channel operation with its arguments
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Create { payload: Value },
    Retrieve { id: u64, force: bool },
    Update { id: u64, payload: Value },
    Delete { id: u64 },
    Restore { id: u64 },
    /// Count kept as received; the channel parses it
    Recent { count: String },
    /// Index entry count and next identifier
    Stats,
    Flush,
    Purge,
    Connect,
}

impl Operation {
    /// Stable lower-case operation name
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Create { .. } => "create",
            Operation::Retrieve { .. } => "retrieve",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
            Operation::Restore { .. } => "restore",
            Operation::Recent { .. } => "recent",
            Operation::Stats => "stats",
            Operation::Flush => "flush",
            Operation::Purge => "purge",
            Operation::Connect => "connect",
        }
    }

    /// Parse a command name and its JSON payload.
    pub fn from_command(command: &str, payload: Value) -> DispatchResult<Self> {
        match command.to_lowercase().as_str() {
            "create" | "push" => Ok(Operation::Create { payload }),
            "retrieve" => Ok(Operation::Retrieve {
                id: identifier_argument(&payload)?,
                force: force_argument(&payload)?,
            }),
            "update" => {
                let id = identifier_argument(&payload)?;
                let data = match payload {
                    Value::Object(mut map) => map.remove("data"),
                    _ => None,
                };
                let payload = data.ok_or_else(|| {
                    DispatchError::InvalidArgument("update requires a \"data\" field".to_string())
                })?;
                Ok(Operation::Update { id, payload })
            }
            "delete" => Ok(Operation::Delete {
                id: identifier_argument(&payload)?,
            }),
            "restore" => Ok(Operation::Restore {
                id: identifier_argument(&payload)?,
            }),
            "recent" => Ok(Operation::Recent {
                count: count_argument(&payload)?,
            }),
            "stats" => Ok(Operation::Stats),
            "flush" => Ok(Operation::Flush),
            "purge" => Ok(Operation::Purge),
            "connect" => Ok(Operation::Connect),
            other => Err(DispatchError::UnknownCommand(other.to_string())),
        }
    }
}

/// A channel name plus the operation to run on it
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub channel: String,
    pub operation: Operation,
}

impl Request {
    pub fn new(channel: impl Into<String>, operation: Operation) -> Self {
        Self {
            channel: channel.into(),
            operation,
        }
    }

    /// Parse a request from its textual command form.
    pub fn from_command(channel: &str, command: &str, payload: Value) -> DispatchResult<Self> {
        if channel.trim().is_empty() {
            return Err(DispatchError::InvalidArgument(
                "channel name is required".to_string(),
            ));
        }
        Ok(Self::new(channel, Operation::from_command(command, payload)?))
    }
}

/// Parse a record identifier from text (URL segment or JSON string).
pub fn parse_identifier(text: &str) -> DispatchResult<u64> {
    text.trim().parse::<u64>().map_err(|_| {
        DispatchError::InvalidArgument(format!("record id is not a non-negative integer: {:?}", text))
    })
}

fn identifier_argument(payload: &Value) -> DispatchResult<u64> {
    match payload {
        Value::Number(n) => n.as_u64().ok_or_else(|| {
            DispatchError::InvalidArgument(format!("record id is not a non-negative integer: {}", n))
        }),
        Value::String(s) => parse_identifier(s),
        Value::Object(map) => match map.get("id") {
            Some(Value::Object(_)) | None => Err(DispatchError::InvalidArgument(
                "missing \"id\" field".to_string(),
            )),
            Some(id) => identifier_argument(id),
        },
        _ => Err(DispatchError::InvalidArgument(
            "record id is required".to_string(),
        )),
    }
}

fn force_argument(payload: &Value) -> DispatchResult<bool> {
    match payload.get("force") {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(force)) => Ok(*force),
        Some(other) => Err(DispatchError::InvalidArgument(format!(
            "\"force\" must be a boolean, got {}",
            other
        ))),
    }
}

fn count_argument(payload: &Value) -> DispatchResult<String> {
    match payload {
        Value::Null => Ok(String::new()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::Object(map) => match map.get("count") {
            Some(Value::Object(_)) => Err(DispatchError::InvalidArgument(
                "\"count\" must be a number".to_string(),
            )),
            Some(count) => count_argument(count),
            None => Ok(String::new()),
        },
        other => Err(DispatchError::InvalidArgument(format!(
            "\"count\" must be a number, got {}",
            other
        ))),
    }
}
