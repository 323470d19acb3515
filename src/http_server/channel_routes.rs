//! Channel HTTP Routes
//!
//! Thin mapping from HTTP verb to one channel operation:
//!
//! | Method | Path                     | Operation          |
//! |--------|--------------------------|--------------------|
//! | POST   | `/:channel`              | create             |
//! | DELETE | `/:channel`              | flush              |
//! | GET    | `/:channel/:id?force=`   | retrieve           |
//! | PATCH  | `/:channel/:id`          | update             |
//! | DELETE | `/:channel/:id`          | delete             |
//! | PUT    | `/:channel/:id`          | restore            |
//! | GET    | `/:channel/recent`       | recent (default 5) |
//! | GET    | `/:channel/recent/:num`  | recent             |
//! | GET    | `/:channel/stats`        | stats              |

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatch::{parse_identifier, DispatchError, Dispatcher, Operation, Outcome, Request};

/// Count used by `GET /:channel/recent` without a number
pub const DEFAULT_RECENT_COUNT: &str = "5";

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Default, Deserialize)]
pub struct RetrieveQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub status: u16,
}

/// Dispatch error rendered as a JSON error response
#[derive(Debug)]
pub struct ApiError(DispatchError);

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
            status,
        };
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

// ==================
// Channel Routes
// ==================

/// Create channel routes (mounted under `/v1`)
pub fn channel_routes(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/:channel", post(create_handler).delete(flush_handler))
        .route("/:channel/recent", get(recent_default_handler))
        .route("/:channel/recent/:num", get(recent_handler))
        .route("/:channel/stats", get(stats_handler))
        .route(
            "/:channel/:id",
            get(retrieve_handler)
                .patch(update_handler)
                .delete(delete_handler)
                .put(restore_handler),
        )
        .with_state(dispatcher)
}

// ==================
// Helper Functions
// ==================

async fn dispatch(dispatcher: &Arc<Dispatcher>, channel: String, operation: Operation) -> ApiResult {
    let outcome = dispatcher
        .execute_with_deadline(Request::new(channel, operation))
        .await?;
    Ok(outcome_response(outcome))
}

fn outcome_response(outcome: Outcome) -> Response {
    let status = StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::OK);
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    (status, Json(outcome.body())).into_response()
}

/// Empty body means a `null` payload
fn json_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| {
        ApiError(DispatchError::InvalidArgument(format!(
            "request body is not valid JSON: {}",
            e
        )))
    })
}

// ==================
// Handlers
// ==================

async fn create_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path(channel): Path<String>,
    body: Bytes,
) -> ApiResult {
    let payload = json_body(&body)?;
    dispatch(&dispatcher, channel, Operation::Create { payload }).await
}

async fn retrieve_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path((channel, id)): Path<(String, String)>,
    Query(query): Query<RetrieveQuery>,
) -> ApiResult {
    let id = parse_identifier(&id)?;
    dispatch(
        &dispatcher,
        channel,
        Operation::Retrieve {
            id,
            force: query.force,
        },
    )
    .await
}

async fn update_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path((channel, id)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult {
    let id = parse_identifier(&id)?;
    let payload = json_body(&body)?;
    dispatch(&dispatcher, channel, Operation::Update { id, payload }).await
}

async fn delete_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path((channel, id)): Path<(String, String)>,
) -> ApiResult {
    let id = parse_identifier(&id)?;
    dispatch(&dispatcher, channel, Operation::Delete { id }).await
}

async fn restore_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path((channel, id)): Path<(String, String)>,
) -> ApiResult {
    let id = parse_identifier(&id)?;
    dispatch(&dispatcher, channel, Operation::Restore { id }).await
}

async fn recent_default_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path(channel): Path<String>,
) -> ApiResult {
    let count = DEFAULT_RECENT_COUNT.to_string();
    dispatch(&dispatcher, channel, Operation::Recent { count }).await
}

async fn recent_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path((channel, count)): Path<(String, String)>,
) -> ApiResult {
    dispatch(&dispatcher, channel, Operation::Recent { count }).await
}

async fn stats_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path(channel): Path<String>,
) -> ApiResult {
    dispatch(&dispatcher, channel, Operation::Stats).await
}

async fn flush_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path(channel): Path<String>,
) -> ApiResult {
    dispatch(&dispatcher, channel, Operation::Flush).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_body_empty_is_null() {
        assert_eq!(json_body(&Bytes::from_static(b"")).unwrap(), Value::Null);
        assert_eq!(json_body(&Bytes::from_static(b" \n")).unwrap(), Value::Null);
        assert_eq!(
            json_body(&Bytes::from_static(br#"{"a":1}"#)).unwrap(),
            serde_json::json!({"a": 1})
        );
        assert!(json_body(&Bytes::from_static(b"{nope")).is_err());
    }

    #[test]
    fn test_no_content_has_empty_body() {
        let response = outcome_response(Outcome::Deleted);
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_error_response_status() {
        let response = ApiError(DispatchError::UnknownCommand("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
