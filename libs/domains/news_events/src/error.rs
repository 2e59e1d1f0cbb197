//! News event domain error types

use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

/// Result type for news event operations
pub type Result<T> = std::result::Result<T, NewsEventError>;

#[derive(Debug, Error)]
pub enum NewsEventError {
    /// A filter parameter could not be parsed into its expected shape
    #[error("Invalid parameter '{name}' = '{value}': {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Event not found: {id}")]
    NotFound { id: String },

    /// The event store failed to execute a stage sequence
    #[error("Store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<mongodb::error::Error>,
    },

    /// The taxonomy reference table could not be loaded
    #[error("Taxonomy error: {message}")]
    Taxonomy { message: String },
}

impl NewsEventError {
    pub fn invalid(
        name: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// A store error without an underlying driver error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. } | Self::NotFound { .. })
    }
}

impl From<mongodb::error::Error> for NewsEventError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Store {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<csv::Error> for NewsEventError {
    fn from(err: csv::Error) -> Self {
        Self::Taxonomy {
            message: err.to_string(),
        }
    }
}

/// Convert NewsEventError to AppError for standardized error responses
impl From<NewsEventError> for AppError {
    fn from(err: NewsEventError) -> Self {
        match err {
            e @ NewsEventError::InvalidParameter { .. } => AppError::BadRequest(e.to_string()),
            NewsEventError::NotFound { id } => {
                AppError::NotFound(format!("Event {} not found", id))
            }
            NewsEventError::Store { message, .. } => AppError::Store(message),
            NewsEventError::Taxonomy { message } => AppError::InternalServerError(message),
        }
    }
}

impl IntoResponse for NewsEventError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_message_names_the_parameter() {
        let err = NewsEventError::invalid("limit", "abc", "expected a positive integer");
        let message = err.to_string();
        assert!(message.contains("limit"));
        assert!(message.contains("abc"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_store_error_is_not_a_client_error() {
        let err = NewsEventError::store("connection refused");
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "Store error: connection refused");
    }

    #[test]
    fn test_invalid_parameter_maps_to_bad_request() {
        let app: AppError = NewsEventError::invalid("to", "x", "bad date").into();
        assert!(matches!(app, AppError::BadRequest(_)));

        let app: AppError = NewsEventError::NotFound { id: "7".into() }.into();
        assert!(matches!(app, AppError::NotFound(_)));

        let app: AppError = NewsEventError::store("cursor killed").into();
        assert!(matches!(app, AppError::Store(_)));

        let app: AppError = NewsEventError::Taxonomy { message: "bad row".into() }.into();
        assert!(matches!(app, AppError::InternalServerError(_)));
    }
}
