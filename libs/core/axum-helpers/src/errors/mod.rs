pub mod codes;
pub mod handlers;

pub use codes::ErrorCode;

use axum::{
    Json,
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Standard error response structure.
///
/// Returned for every error response:
/// - `code`: Integer error code for logging/monitoring (e.g., 1001)
/// - `error`: Machine-readable error identifier (e.g., "INVALID_PARAMETER")
/// - `message`: Human-readable error message
/// - `details`: Optional additional error details
///
/// # JSON Example
///
/// ```json
/// {
///   "code": 1001,
///   "error": "INVALID_PARAMETER",
///   "message": "Invalid parameter 'limit' = '0': expected a positive integer"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Integer error code for logging and monitoring
    pub code: i32,
    /// Machine-readable error identifier for programmatic handling
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional structured error details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            error: code.as_str().to_string(),
            message: message.into(),
            details: None,
        }
    }
}

/// Application error type that can be converted to HTTP responses.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),

    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
}

impl AppError {
    /// Status code and error code for this error
    pub fn classify(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::QueryRejection(e) => (e.status(), ErrorCode::InvalidQuery),
            AppError::PathRejection(e) => (e.status(), ErrorCode::InvalidParameter),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidParameter),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::StoreError),
            AppError::InternalServerError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();

        // Internal details stay in the logs; clients get the default message.
        let message = match self {
            AppError::QueryRejection(e) => {
                tracing::warn!(error_code = code.code(), "Query string rejected: {:?}", e);
                e.body_text()
            }
            AppError::PathRejection(e) => {
                tracing::warn!(error_code = code.code(), "Path rejected: {:?}", e);
                e.body_text()
            }
            AppError::BadRequest(msg) => {
                tracing::info!(error_code = code.code(), "Bad request: {}", msg);
                msg
            }
            AppError::NotFound(msg) => {
                tracing::info!(error_code = code.code(), "Not found: {}", msg);
                msg
            }
            AppError::Store(msg) => {
                tracing::error!(error_code = code.code(), "Store error: {}", msg);
                code.default_message().to_string()
            }
            AppError::InternalServerError(msg) => {
                tracing::error!(error_code = code.code(), "Internal server error: {}", msg);
                code.default_message().to_string()
            }
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(response: Response) -> ErrorResponse {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_bad_request_uses_invalid_parameter_code() {
        let response = AppError::BadRequest("limit must be positive".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_of(response).await;
        assert_eq!(body.code, 1001);
        assert_eq!(body.error, "INVALID_PARAMETER");
        assert_eq!(body.message, "limit must be positive");
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn test_store_error_hides_driver_message() {
        let response = AppError::Store("connection refused at 10.0.0.3".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(response).await;
        assert_eq!(body.error, "STORE_ERROR");
        assert_eq!(body.message, ErrorCode::StoreError.default_message());
    }

    #[test]
    fn test_classify_not_found() {
        let (status, code) = AppError::NotFound("Event 7 not found".into()).classify();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, ErrorCode::NotFound);
    }
}
