//! Type-safe error codes for API responses.
//!
//! Each code carries a string identifier for clients, an integer for logs
//! and a default message.
//!
//! # Example
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::InvalidParameter;
//! assert_eq!(code.as_str(), "INVALID_PARAMETER");
//! assert_eq!(code.code(), 1001);
//! assert_eq!(code.default_message(), "Invalid request parameter");
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standardized error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000-1999)
    /// A query or path parameter is malformed or out of range
    InvalidParameter,

    /// The query string could not be decoded
    InvalidQuery,

    /// No route matches the request
    RouteNotFound,

    /// Requested resource was not found
    NotFound,

    // Server errors
    /// An unexpected internal server error occurred
    InternalError,

    // Store errors (2000-2999)
    /// The event store rejected or failed a query
    StoreError,
}

impl ErrorCode {
    /// SCREAMING_SNAKE_CASE identifier for clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidParameter => "INVALID_PARAMETER",
            Self::InvalidQuery => "INVALID_QUERY",
            Self::RouteNotFound => "ROUTE_NOT_FOUND",
            Self::NotFound => "NOT_FOUND",
            Self::InternalError => "INTERNAL_ERROR",
            Self::StoreError => "STORE_ERROR",
        }
    }

    /// Integer code for logging and monitoring.
    ///
    /// - 1000-1999: Client errors
    /// - 2000-2999: Store errors
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidParameter => 1001,
            Self::InvalidQuery => 1002,
            Self::RouteNotFound => 1003,
            Self::NotFound => 1004,
            Self::InternalError => 1005,

            Self::StoreError => 2001,
        }
    }

    /// Default user-facing message; handlers may override it.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::InvalidParameter => "Invalid request parameter",
            Self::InvalidQuery => "Invalid query string",
            Self::RouteNotFound => "The requested route does not exist",
            Self::NotFound => "Resource not found",
            Self::InternalError => "An internal server error occurred",
            Self::StoreError => "Event store error occurred",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
