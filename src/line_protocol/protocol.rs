//! Line protocol framing
//!
//! Request, one per line:
//!
//! ```text
//! CHANNEL COMMAND [PAYLOAD]
//! ISALIVE
//! ```
//!
//! `PAYLOAD` is everything after the command. It is parsed as JSON when it
//! is valid JSON and taken as a plain string otherwise, so
//! `chat push hello there` stores the string `"hello there"`.
//!
//! Response, one JSON object per line:
//!
//! ```text
//! {"status":"ok","code":201,"result":{...}}
//! {"status":"error","code":"MRKV_UNKNOWN_COMMAND","message":"..."}
//! ```

use serde_json::{json, Value};

use crate::dispatch::{DispatchError, DispatchResult, Outcome, Request};

/// Liveness command, the only one without a channel
pub const ISALIVE: &str = "isalive";

/// One parsed request line
#[derive(Debug, Clone, PartialEq)]
pub enum LineRequest {
    IsAlive,
    Dispatch(Request),
}

impl LineRequest {
    /// Parse one request line (without its line terminator).
    pub fn parse(line: &str) -> DispatchResult<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Err(DispatchError::InvalidArgument("empty request line".to_string()));
        }

        let (channel, rest) = split_token(line);
        let (command, payload) = split_token(rest);

        if command.is_empty() {
            if channel.eq_ignore_ascii_case(ISALIVE) {
                return Ok(LineRequest::IsAlive);
            }
            return Err(DispatchError::InvalidArgument(format!(
                "expected CHANNEL COMMAND [PAYLOAD], got {:?}",
                line
            )));
        }

        Request::from_command(channel, command, parse_payload(payload)).map(LineRequest::Dispatch)
    }
}

fn split_token(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim_start()),
        None => (text, ""),
    }
}

fn parse_payload(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Encode a successful outcome as a response line
pub fn ok_line(outcome: &Outcome) -> String {
    json!({
        "status": "ok",
        "code": outcome.status_code(),
        "result": outcome.body(),
    })
    .to_string()
}

/// Encode a failure as a response line
pub fn error_line(error: &DispatchError) -> String {
    json!({
        "status": "error",
        "code": error.code(),
        "message": error.to_string(),
    })
    .to_string()
}

/// Response line for `ISALIVE`
pub fn alive_line() -> String {
    json!({ "status": "ok", "code": 200, "result": true }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Operation;

    fn dispatch(line: &str) -> Request {
        match LineRequest::parse(line).unwrap() {
            LineRequest::Dispatch(request) => request,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_isalive() {
        assert_eq!(LineRequest::parse("ISALIVE").unwrap(), LineRequest::IsAlive);
        assert_eq!(LineRequest::parse("  isalive \r").unwrap(), LineRequest::IsAlive);
    }

    #[test]
    fn test_json_payload() {
        let request = dispatch(r#"chat create {"text": "hi there"}"#);
        assert_eq!(request.channel, "chat");
        assert_eq!(
            request.operation,
            Operation::Create {
                payload: json!({"text": "hi there"})
            }
        );
    }

    #[test]
    fn test_plain_text_payload() {
        let request = dispatch("chat PUSH hello there");
        assert_eq!(
            request.operation,
            Operation::Create {
                payload: json!("hello there")
            }
        );
    }

    #[test]
    fn test_no_payload() {
        assert_eq!(dispatch("chat flush").operation, Operation::Flush);
        assert_eq!(
            dispatch("chat recent").operation,
            Operation::Recent {
                count: String::new()
            }
        );
        assert_eq!(dispatch("chat recent 3").operation, Operation::Recent { count: "3".into() });
    }

    #[test]
    fn test_malformed_lines() {
        assert!(LineRequest::parse("").is_err());
        assert!(LineRequest::parse("chat").is_err());
        assert!(matches!(
            LineRequest::parse("chat explode"),
            Err(DispatchError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_response_lines() {
        let ok: Value = serde_json::from_str(&ok_line(&Outcome::Absent)).unwrap();
        assert_eq!(ok["status"], "ok");
        assert_eq!(ok["code"], 404);
        assert!(ok["result"].is_null());

        let err: Value =
            serde_json::from_str(&error_line(&DispatchError::UnknownCommand("x".into()))).unwrap();
        assert_eq!(err["status"], "error");
        assert_eq!(err["code"], "MRKV_UNKNOWN_COMMAND");

        assert!(!alive_line().contains('\n'));
    }
}
