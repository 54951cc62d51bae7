//! Response envelope and the error type every API handler returns.
//!
//! Success bodies are `{ "data": ..., "success": true }`, failures are
//! `{ "error": "...", "success": false }` with an optional `details` field
//! that is only filled in development.

use crate::upstream::UpstreamError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// Failure body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Errors surfaced by the HTTP layer
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// Malformed request, rejected before any upstream call
    #[error("{0}")]
    Validation(String),

    /// Upstream answered with a non-2xx status
    #[error("upstream returned {status}: {message}")]
    Upstream { status: StatusCode, message: String },

    /// Upstream could not be reached or sent something unreadable
    #[error("{message}")]
    Transport {
        message: String,
        details: Option<String>,
    },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    /// Map an upstream failure. `generic` is the endpoint's stable message;
    /// the underlying cause is kept only when `expose_details` is set.
    pub fn from_upstream(err: UpstreamError, generic: &str, expose_details: bool) -> Self {
        match err {
            UpstreamError::Status { status, message } => ApiError::Upstream { status, message },
            UpstreamError::Rejected(message) => ApiError::Upstream {
                status: StatusCode::BAD_GATEWAY,
                message,
            },
            other => ApiError::Transport {
                message: generic.to_string(),
                details: expose_details.then(|| other.to_string()),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream { status, .. } => *status,
            ApiError::Transport { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// User-facing message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(message) => message,
            ApiError::Upstream { message, .. } => message,
            ApiError::Transport { message, .. } => message,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let details = match self {
            ApiError::Transport { details, .. } => details.clone(),
            _ => None,
        };
        ErrorEnvelope {
            error: self.message().to_string(),
            success: false,
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.envelope())).into_response()
    }
}

/// Guarantee the `{ data, success }` shape for an upstream success body.
/// Bodies that already declare `success` are passed through unchanged.
pub fn ensure_envelope(body: Value) -> Value {
    match &body {
        Value::Object(map) if map.contains_key("success") => body,
        _ => json!({ "data": body, "success": true }),
    }
}
