/// Database error type shared by connectors and health checks
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// Connection could not be established or verified
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] core_config::ConfigError),
}

/// Result type alias for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;
