//! Error handling for the Shelf HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Standard error response format for all HTTP errors
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub details: Vec<serde_json::Value>,
    pub message: String,
    pub code: String,
    pub trace_id: String,
    pub timestamp: String,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation {
        details: Vec<serde_json::Value>,
        code: String,
        message: String,
    },

    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String, code: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error
    pub fn validation(details: Vec<serde_json::Value>, message: impl Into<String>) -> Self {
        Self::Validation {
            details,
            code: "validation_error".to_string(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            code: "unauthorized".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4();
        let timestamp = OffsetDateTime::now_utc().to_string();

        // Validation maps to 400 here: the book-tracker REST contract fixes
        // 400 for rejected fields (missing title/author, bad ranges).
        let (status, error_code, message, details) = match self {
            AppError::Validation {
                details,
                code,
                message,
            } => (StatusCode::BAD_REQUEST, code, message, Some(details)),
            AppError::NotFound { message, code } => (StatusCode::NOT_FOUND, code, message, None),
            AppError::Unauthorized { message, code } => {
                (StatusCode::UNAUTHORIZED, code, message, None)
            }
            AppError::Internal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error".to_string(),
                e.to_string(),
                None,
            ),
        };

        tracing::error!(
            error_id = %error_id,
            error_code = %error_code,
            status_code = %status.as_u16(),
            "Request error"
        );

        // In production, we might want to hide internal error details
        let message = if cfg!(not(debug_assertions)) && status == StatusCode::INTERNAL_SERVER_ERROR
        {
            "An internal server error occurred".to_string()
        } else {
            message
        };

        let error_response = json!({
            "error": {
                "code": error_code,
                "message": message,
                "details": details.unwrap_or_default(),
                "trace_id": error_id.to_string(),
                "timestamp": timestamp
            }
        });

        (status, Json(error_response)).into_response()
    }
}
