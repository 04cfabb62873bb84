//! API error responses
//!
//! Every error leaves the server as `{"error": {"code": ..., "message": ...}}`
//! with a stable machine-readable code. Internal faults are logged in full and
//! reported to the client with a generic message.

use std::fmt::Display;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

/// An error returned from an API handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status
    pub status: StatusCode,
    /// Machine-readable error code
    pub code: &'static str,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    /// 400 with code `validation_error`
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(%message, "Rejected request");
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "validation_error",
            message,
        }
    }

    /// 500 with a generic message; the cause is only logged
    pub fn internal(cause: impl Display) -> Self {
        error!(error = %cause, "Internal error while handling request");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal_error",
            message: "internal server error".to_string(),
        }
    }
}

impl From<campsync::Error> for ApiError {
    fn from(err: campsync::Error) -> Self {
        match err {
            campsync::Error::BudgetExceedsSystemLimit { .. } => {
                warn!(error = %err, "Rejected oversized storage budget");
                Self {
                    status: StatusCode::PAYLOAD_TOO_LARGE,
                    code: err.code(),
                    message: err.to_string(),
                }
            }
            campsync::Error::InvalidCatalogEntry { .. } => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                code: err.code(),
                message: err.to_string(),
            },
            campsync::Error::Config(_) => Self::internal(err),
            campsync::Error::InvalidCoordinate(_)
            | campsync::Error::InvalidEventWindow(_)
            | campsync::Error::Validation(_) => Self::validation(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        }));
        (self.status, body).into_response()
    }
}
