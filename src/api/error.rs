use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    ValidationError(String),

    StorageError { error: String, message: String },
}

/// Wire shape of every failure path: an `error` field, plus a diagnostic
/// `message` where one is available.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::StorageError { error, message } => {
                write!(f, "{}: {}", error, message)
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: msg,
                    message: None,
                },
            ),
            ApiError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: msg,
                    message: None,
                },
            ),
            ApiError::StorageError { error, message } => {
                tracing::error!("{}: {}", error, message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error,
                        message: Some(message),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::StorageError {
            error: "Storage failure".to_string(),
            message: err.to_string(),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn log_not_found() -> Self {
        ApiError::NotFound("Log not found".to_string())
    }

    pub fn storage(context: &str, err: anyhow::Error) -> Self {
        ApiError::StorageError {
            error: context.to_string(),
            message: err.to_string(),
        }
    }
}
