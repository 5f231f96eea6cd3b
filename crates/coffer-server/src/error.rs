//! Error responses.

use axum::extract::rejection::PathRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use coffer_core::Error;

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorDetail {
    pub(crate) message: String,
    #[serde(rename = "type")]
    pub(crate) error_type: String,
    pub(crate) code: Option<String>,
}

impl ErrorResponse {
    pub(crate) fn new(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                error_type: error_type.into(),
                code: None,
            },
        }
    }

    pub(crate) fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error.code = Some(code.into());
        self
    }
}

/// Error returned by handlers, rendered as a JSON `{"error": {...}}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    /// Creates an error with an explicit status and error type.
    pub fn new(status: StatusCode, message: impl Into<String>, error_type: &str) -> Self {
        Self {
            status,
            body: ErrorResponse::new(message, error_type),
        }
    }

    /// Returns the HTTP status this error renders with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let (status, error_type, code) = match &err {
            Error::FileNotFound { .. } => (StatusCode::NOT_FOUND, "not_found_error", None),
            Error::InvalidFileName { .. } => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                Some("invalid_file_name"),
            ),
            Error::UnsupportedMediaType { .. } => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_media_type",
                None,
            ),
            Error::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", None)
            },
            Error::CorruptItemStore { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "item_store_error",
                Some("corrupt_item_store"),
            ),
            Error::UnreadableItemStore { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "item_store_error",
                Some("unreadable_item_store"),
            ),
            Error::InvalidConfig { .. }
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "server_error", None),
        };

        if !err.is_client_error() {
            tracing::error!(error = %err, "Request failed");
        }

        let mut body = ErrorResponse::new(err.to_string(), error_type);
        if let Some(code) = code {
            body = body.with_code(code);
        }
        Self { status, body }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text(), "invalid_request_error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
