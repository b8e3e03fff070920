use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use imgdepot::{IngestError, PipelineError};
use serde::{Deserialize, Serialize};

use crate::auth::AuthError;

pub type ServerResult<T> = Result<T, ServerError>;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] IngestError),

    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<String>,
    },

    #[error("Payload too large: max {0}MB allowed")]
    PayloadTooLarge(usize),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Not found")]
    NotFound,
}

/// API error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ServerError {
    pub fn bad_request(message: impl Into<String>, details: impl Into<String>) -> Self {
        ServerError::BadRequest {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Get HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Auth(err) => err.status_code(),
            ServerError::Validation(_) | ServerError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Pipeline(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            ServerError::Pipeline(_) | ServerError::Internal(_) | ServerError::Auth(AuthError::Internal(_))
        )
    }

    fn body(&self) -> ErrorResponse {
        if self.is_internal() {
            return ErrorResponse {
                error: INTERNAL_MESSAGE.to_string(),
                details: None,
            };
        }
        match self {
            ServerError::Auth(err) => ErrorResponse {
                error: err.to_string(),
                details: err.details().map(str::to_string),
            },
            ServerError::Validation(err) => ErrorResponse {
                error: err.message().to_string(),
                details: err.details(),
            },
            ServerError::BadRequest { message, details } => ErrorResponse {
                error: message.clone(),
                details: details.clone(),
            },
            other => ErrorResponse {
                error: other.to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        if self.is_internal() {
            tracing::error!(error = %self, "request_failed");
        }
        (self.status_code(), Json(self.body())).into_response()
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::bad_request("Invalid JSON body", err.to_string())
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("worker task failed: {err}"))
    }
}
