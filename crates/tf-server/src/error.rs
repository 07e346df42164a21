//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`tf_core::Error`] so that route handlers
//! can return `Result<T, AppError>` and use `?` on core results.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(tf_core::Error);

impl From<tf_core::Error> for AppError {
    fn from(e: tf_core::Error) -> Self {
        Self(e)
    }
}

impl AppError {
    fn code(&self) -> &'static str {
        match &self.0 {
            tf_core::Error::NotFound { .. } => "not_found",
            tf_core::Error::Validation(_) => "validation_error",
            tf_core::Error::Io { .. } => "io_error",
            tf_core::Error::Tool { .. } => "tool_error",
            tf_core::Error::Download { .. } => "download_error",
            tf_core::Error::Pipeline { .. } => "pipeline_error",
            tf_core::Error::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "Server error in request handler");
        }

        let body = json!({
            "error": self.0.to_string(),
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
