//! Error types for the server module.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use glimpse_runner::RunnerError;
use serde_json::json;
use thiserror::Error;

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors surfaced by the orchestrator and the HTTP layer.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Workspace validation failed. A 404-class condition, never retried
    /// server-side.
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    /// The request itself is malformed (e.g. an unusable session id).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Spawning the preview container failed. Safe to retry from the client.
    #[error("Failed to start preview: {0}")]
    StartFailed(#[source] RunnerError),

    /// Another start for the same workspace held the lock past the deadline.
    #[error("Timed out waiting for preview start lock")]
    LockTimeout,

    /// Any other runtime failure (stop, inspection).
    #[error("Runtime error: {0}")]
    Runtime(#[from] RunnerError),
}

impl ServerError {
    fn code(&self) -> &'static str {
        match self {
            Self::WorkspaceNotFound(_) => "workspace_not_found",
            Self::InvalidRequest(_) => "invalid_request",
            Self::StartFailed(_) => "start_failed",
            Self::LockTimeout => "lock_timeout",
            Self::Runtime(_) => "runtime_error",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::WorkspaceNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::StartFailed(_) | Self::Runtime(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::LockTimeout => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}
