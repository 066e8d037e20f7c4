//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error code.
///
/// # Error Categories
///
/// - **Database Errors**: Any sqlx::Error from database operations
/// - **Authentication Errors**: Missing, unknown or revoked access tokens
/// - **Authorization Errors**: The caller's club role lacks a permission
/// - **Resource Errors**: Requested resources not found in the caller's club
/// - **Business Logic Errors**: Overlapping bookings, plan limits, last-owner rules
/// - **Validation Errors**: Invalid request data
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Access token is missing, invalid, or revoked.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Missing or invalid access token")]
    Unauthorized,

    /// The caller is known but not allowed to perform the operation.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("{0}")]
    Forbidden(String),

    /// Requested resource does not exist or belongs to another club.
    ///
    /// Returns HTTP 404 Not Found. The payload names the resource kind
    /// (`"club"`, `"team"`, ...).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The operation collides with existing state.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    Conflict(String),

    /// The club's subscription plan does not allow more of a resource.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("{0}")]
    PlanLimitReached(String),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    InvalidRequest(String),

    /// The email API rejected or failed a delivery.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Email delivery failed: {0}")]
    Email(String),
}

impl AppError {
    /// Shorthand for a `Forbidden` error with the standard message.
    pub fn forbidden() -> Self {
        AppError::Forbidden("You do not have permission to perform this action".to_string())
    }

    /// HTTP status code and machine-readable error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, String) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            AppError::NotFound(entity) => (StatusCode::NOT_FOUND, format!("{entity}_not_found")),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict".to_string()),
            AppError::PlanLimitReached(_) => {
                (StatusCode::FORBIDDEN, "plan_limit_reached".to_string())
            }
            AppError::InvalidRequest(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request".to_string())
            }
            AppError::Email(_) => (StatusCode::BAD_GATEWAY, "email_delivery_failed".to_string()),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error".to_string(),
            ),
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Database errors are logged and replaced with a generic message so that
/// query details never reach the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_code_names_the_entity() {
        let (status, code) = AppError::NotFound("booking").status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "booking_not_found");
        assert_eq!(AppError::NotFound("booking").to_string(), "booking not found");
    }

    #[test]
    fn plan_limits_are_forbidden() {
        let (status, code) =
            AppError::PlanLimitReached("Team limit reached".into()).status_and_code();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(code, "plan_limit_reached");
    }

    #[tokio::test]
    async fn database_errors_hide_details() {
        let response = AppError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "internal_error");
        assert_eq!(body["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn conflict_body_carries_message() {
        let response = AppError::Conflict("Facility already booked".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["message"], "Facility already booked");
    }
}
