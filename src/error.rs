//! Error taxonomy and its mapping onto the failure envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::response::ErrorBody;
use crate::store::StoreError;

/// A single failing field rule, as reported by the validation gate or the
/// schema checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// AppError
///
/// Every failure a request can end in. Services return these; the single
/// `IntoResponse` impl below turns them into the wire envelope.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Not found - {0}")]
    RouteNotFound(String),

    #[error("Validation failed")]
    ValidationFailed(Vec<FieldError>),

    #[error("Only image files are allowed (jpeg, jpg, png, gif, webp)")]
    InvalidFileType,

    #[error("File size is too large. Maximum size is {}MB", .max_bytes / (1024 * 1024))]
    FileTooLarge { max_bytes: usize },

    #[error("{0}")]
    BadRequest(String),

    #[error("Not authorized to access this route")]
    Unauthorized,

    #[error("User role {0} is not authorized to access this route")]
    Forbidden(String),

    #[error("{0}")]
    DuplicateResource(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationFailed(_)
            | AppError::InvalidFileType
            | AppError::FileTooLarge { .. }
            | AppError::BadRequest(_)
            | AppError::DuplicateResource(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(key) => {
                AppError::DuplicateResource(format!("Duplicate field value entered: {}", key))
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Internal(detail) => {
                // The detail stays in the logs; clients only see a generic message.
                tracing::error!(error = %detail, "request failed with internal error");
                ErrorBody::new("Server Error")
            }
            AppError::ValidationFailed(errors) => {
                ErrorBody::new("Validation failed").with_errors(errors)
            }
            other => ErrorBody::new(other.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
