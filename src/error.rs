//! Error types for vitals.

use std::net::SocketAddr;
use std::time::Duration;

use tokio_postgres::error::SqlState;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Pool runtime error: {0}")]
    PoolRuntime(#[from] deadpool_postgres::PoolError),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Store operation {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Caller-facing errors from the service layer.
///
/// Store failures are folded into a small taxonomy so callers can tell an
/// unreachable store from a missing record or a rejected input.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("conflicting concurrent write: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(String),
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Pool(_)
            | DatabaseError::PoolRuntime(_)
            | DatabaseError::Timeout { .. } => ServiceError::StoreUnavailable(err.to_string()),
            DatabaseError::Postgres(ref e)
                if e.code() == Some(&SqlState::UNIQUE_VIOLATION) =>
            {
                ServiceError::Conflict(err.to_string())
            }
            other => ServiceError::Store(other.to_string()),
        }
    }
}

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
