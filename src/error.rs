//! Error types for Shelfkeeper server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single broken rule, optionally tied to a request field
    #[error("Validation error: {message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
    },

    /// Field-level failures reported by `validator`
    #[error("Validation failed: {0}")]
    InvalidFields(#[from] validator::ValidationErrors),

    /// A precondition checked before a write no longer held when the write committed
    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn rule(message: impl Into<String>) -> Self {
        AppError::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Name reported in the `error.name` member of failure payloads
    pub fn name(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NotFoundError",
            AppError::Validation { .. } | AppError::InvalidFields(_) => "ValidationError",
            AppError::Consistency(_) => "ConsistencyError",
            AppError::BadRequest(_) => "BadRequest",
            AppError::Database(_) => "DatabaseError",
            AppError::Internal(_) => "InternalError",
        }
    }
}

/// Failure envelope: `{ success: false, message, error }`
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[schema(value_type = Object)]
    pub error: Value,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let name = self.name();
        let (status, message, error) = match self {
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                msg.clone(),
                json!({ "name": name, "detail": msg }),
            ),
            AppError::Validation { field, message } => {
                let error = match field {
                    Some(field) => json!({
                        "name": name,
                        "errors": { field: { "message": message } },
                    }),
                    None => json!({ "name": name, "detail": message }),
                };
                (StatusCode::BAD_REQUEST, message, error)
            }
            AppError::InvalidFields(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                json!({ "name": name, "errors": errors }),
            ),
            AppError::Consistency(msg) => (
                StatusCode::CONFLICT,
                msg.clone(),
                json!({ "name": name, "detail": msg }),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                json!({ "name": name, "detail": msg }),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    json!({ "name": name }),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    json!({ "name": name }),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
