//! Application error type shared by both boundary adapters.
//!
//! Inner components (`core::prompt`, `core::audio`, `core::engine`) carry
//! their own error enums; everything converts into `AppError` at the
//! orchestration layer, and the HTTP adapter turns `AppError` into a JSON
//! body plus status code via `IntoResponse`. The MCP adapter formats the same
//! errors into `isError` tool results instead.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::core::audio::AudioError;
use crate::core::engine::EngineError;
use crate::core::prompt::PromptError;

pub type AppResult<T> = Result<T, AppError>;

/// Failure taxonomy for a single synthesis request
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or contradictory request fields
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Referenced local prompt or output file does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The synthesis engine has not been constructed yet
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Fetching a remote prompt failed (transport error or non-success status)
    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(String),

    /// The engine produced zero audio chunks
    #[error("no audio returned from model")]
    EmptyOutput,

    /// Any other unexpected failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::UpstreamFetch(_) => StatusCode::BAD_GATEWAY,
            AppError::EmptyOutput | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<PromptError> for AppError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::NotFound(path) => {
                AppError::NotFound(format!("prompt audio not found: {}", path.display()))
            }
            PromptError::UpstreamFetch(msg) => AppError::UpstreamFetch(msg),
            PromptError::Io(e) => AppError::Internal(format!("prompt storage failed: {e}")),
        }
    }
}

impl From<AudioError> for AppError {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::EmptyOutput => AppError::EmptyOutput,
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::Internal(format!("synthesis failed: {err}"))
    }
}
