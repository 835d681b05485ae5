//! Error-to-HTTP response conversion.
//!
//! Wraps [`bf_core::Error`] so that route handlers can return
//! `Result<T, AppError>` and use `?` on core results directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError {
    inner: bf_core::Error,
}

impl AppError {
    pub fn new(inner: bf_core::Error) -> Self {
        Self { inner }
    }

    /// Machine-readable error code included in the response body.
    pub fn code(&self) -> &'static str {
        match &self.inner {
            bf_core::Error::NotFound { .. } => "not_found",
            bf_core::Error::Validation(_) => "validation_error",
            bf_core::Error::Generation { .. } => "generation_error",
            bf_core::Error::Manifest { .. } => "manifest_error",
            bf_core::Error::Io { .. } => "io_error",
            bf_core::Error::Tool { .. } => "tool_error",
            bf_core::Error::Cancelled => "cancelled",
            bf_core::Error::Batch { .. } => "batch_failed",
            bf_core::Error::Internal(_) => "internal_error",
        }
    }
}

impl From<bf_core::Error> for AppError {
    fn from(e: bf_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
