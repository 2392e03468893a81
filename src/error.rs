//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::models::order::OrderStatus;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error message.
///
/// # Error Categories
///
/// - **Input Errors**: malformed or missing request data
/// - **Authentication Errors**: missing, invalid or expired sessions, wrong passwords
/// - **Authorization Errors**: a valid session without the required role
/// - **Resource Errors**: requested documents not found or already present
/// - **Lifecycle Errors**: order status changes the state machine does not allow
/// - **Infrastructure Errors**: store failures, hashing or signing failures
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    Validation(String),

    /// Unique key already taken (e.g. a registered email).
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    Conflict(String),

    /// Requested document does not exist. Holds the entity name.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Password did not match the stored hash.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    InvalidCredentials(&'static str),

    /// No session token was presented.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Access denied. No token provided.")]
    Unauthorized,

    /// Token signature, expiry or revocation check failed.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid token.")]
    InvalidToken,

    /// Valid session lacking the required role.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("Access denied. {0}")]
    Forbidden(&'static str),

    /// Order status change not permitted by the lifecycle table.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Anything else that is the server's fault (hashing, signing, task join).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "message": "Order not found",
///   "code": "not_found"
/// }
/// ```
///
/// Server-side failures are logged with their details and reported to the
/// client with a generic message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::InvalidCredentials(_) => (StatusCode::BAD_REQUEST, "invalid_credentials"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::InvalidTransition { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition")
            }
            AppError::Database(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "message": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Malformed or missing JSON bodies.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Path segments that do not parse, e.g. a non-numeric product id.
impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("dup".into()), StatusCode::CONFLICT),
            (AppError::NotFound("Order"), StatusCode::NOT_FOUND),
            (AppError::InvalidCredentials("Invalid credentials"), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::InvalidToken, StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("Admins only."), StatusCode::FORBIDDEN),
            (
                AppError::InvalidTransition {
                    from: OrderStatus::Delivered,
                    to: OrderStatus::Pending,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(AppError::NotFound("Order").to_string(), "Order not found");
    }
}
