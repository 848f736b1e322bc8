//! Error types and handling
//!
//! Three families live here:
//! - [`DataError`]: failures crossing the remote data boundary, surfaced by
//!   query and mutation hooks.
//! - [`ProxyError`]: edge function failures, rendered as `{"error": ...}`.
//! - [`AppError`]: generic HTTP errors for the remaining server routes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use super::validation::describe_validation_errors;

/// Failure of a call against the hosted data store
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataError {
    /// The backend answered with a non-success status (policy denied, constraint violation, ...)
    #[error("{message}")]
    Remote {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Transport(String),

    /// The response could not be decoded into the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Payload rejected before any remote call
    #[error("Invalid input: {0}")]
    Validation(String),

    /// An organization-scoped operation ran without a selected organization
    #[error("No organization selected")]
    MissingScope,
}

impl DataError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        DataError::Remote {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// HTTP status reported by the backend, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            DataError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        match self {
            DataError::Remote { status, code, .. } => {
                *status == 401 || *status == 403 || code.as_deref() == Some("42501")
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DataError::Transport("request timed out".to_string())
        } else if err.is_connect() {
            DataError::Transport("failed to connect to backend".to_string())
        } else if err.is_decode() {
            DataError::Decode(err.to_string())
        } else {
            DataError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Decode(err.to_string())
    }
}

impl From<validator::ValidationErrors> for DataError {
    fn from(err: validator::ValidationErrors) -> Self {
        DataError::Validation(describe_validation_errors(&err))
    }
}

/// Result type alias for the data layer
pub type DataResult<T> = Result<T, DataError>;

/// Failure of the `check-openai-models` edge function
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("API key is required")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    /// Upstream answered with a non-success status other than 401
    #[error("Failed to fetch models from OpenAI")]
    Upstream(StatusCode),

    /// Anything not anticipated above; the message is returned verbatim
    #[error("{0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingApiKey => StatusCode::BAD_REQUEST,
            ProxyError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            ProxyError::Upstream(status) => *status,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Body of every edge function error
#[derive(Serialize, Debug)]
pub struct ProxyErrorBody {
    pub error: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Edge function error");
        }
        (
            status,
            Json(ProxyErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Internal(err.to_string())
    }
}

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, should_log) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", false),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request", false),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", true),
        };

        if should_log {
            error!(error = %self, error_type = error_type, "Request error");
        }

        let body = ErrorResponse::new(error_type, self.to_string());

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Validation(message) => AppError::BadRequest(message),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
