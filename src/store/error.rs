use std::time::Duration;
use thiserror::Error;

use crate::progress::types::OperationId;

/// Result type for artifact store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the artifact stores
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Invalid connection settings
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Database unreachable or authentication failure
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Connection pool issues
    #[error("Pool error: {0}")]
    PoolError(String),

    /// SQL errors, constraint violations
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Artifact could not be encoded or decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Store command timed out after {0:?}")]
    Timeout(Duration),

    #[error("Artifact for operation {0} not found")]
    NotFound(OperationId),
}

impl StoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            _ => "persistence_failure",
        }
    }
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db_error) => StoreError::DatabaseError(format!(
                "{}: {}",
                db_error.code().code(),
                db_error.message()
            )),
            None => StoreError::ConnectionError(err.to_string()),
        }
    }
}

impl From<deadpool_postgres::PoolError> for StoreError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        StoreError::PoolError(err.to_string())
    }
}

impl From<deadpool_postgres::BuildError> for StoreError {
    fn from(err: deadpool_postgres::BuildError) -> Self {
        StoreError::ConnectionError(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(StoreError::NotFound(OperationId::new()).kind(), "not_found");
        assert_eq!(
            StoreError::Timeout(Duration::from_secs(5)).kind(),
            "persistence_failure"
        );
    }

    #[test]
    fn test_from_serde_error() {
        let err: StoreError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, StoreError::SerializationError(_)));
    }
}
