use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::shared::types::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Requested status is not one of the known report statuses
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Caller's role may not perform the requested transition
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Caller is not the report's bound client or moderator
    #[error("Not responsible: {0}")]
    NotResponsible(String),

    /// Report is in a terminal status and can no longer be modified
    #[error("Report closed: {0}")]
    ReportClosed(String),

    #[error("No moderator available")]
    NoModeratorAvailable,

    /// Outbound notification to the measurement service failed
    #[error("Delivery failure: {0}")]
    DeliveryFailure(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                    None,
                )
            }
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Validation(ref msg) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                Some(vec![msg.clone()]),
            ),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::Unauthorized(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::Forbidden(ref msg) => (StatusCode::FORBIDDEN, msg.clone(), None),
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, msg.clone(), None),
            AppError::InvalidStatus(ref msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            // Both ownership failures collapse to a bare "forbidden" so the
            // response says nothing about the report itself
            AppError::PermissionDenied(ref msg) | AppError::NotResponsible(ref msg) => {
                tracing::debug!("Forbidden: {}", msg);
                (StatusCode::FORBIDDEN, "Forbidden".to_string(), None)
            }
            AppError::ReportClosed(ref msg) => (StatusCode::CONFLICT, msg.clone(), None),
            AppError::NoModeratorAvailable => {
                tracing::error!("No moderator accounts are provisioned");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "No moderator available".to_string(),
                    None,
                )
            }
            AppError::DeliveryFailure(ref msg) => {
                tracing::error!("Delivery failure: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone(), None)
            }
        };

        let body = Json(ApiResponse::<()>::error(Some(message), errors));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::InvalidStatus("x".into()), StatusCode::BAD_REQUEST),
            (AppError::PermissionDenied("x".into()), StatusCode::FORBIDDEN),
            (AppError::NotResponsible("x".into()), StatusCode::FORBIDDEN),
            (AppError::ReportClosed("x".into()), StatusCode::CONFLICT),
            (
                AppError::NoModeratorAvailable,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
