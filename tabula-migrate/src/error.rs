//! Error types for the schema migration engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur while planning or applying schema changes.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Malformed or conflicting descriptor input.
    #[error("{0}")]
    BadRequest(String),

    /// The targeted table or field does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Failure reported by the database while executing a statement.
    #[error("{message}")]
    Internal {
        /// Driver message.
        message: String,
        /// Driver-specific error code, when the driver reports one.
        code: Option<i64>,
    },

    /// Invalid engine configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Descriptor decoding error.
    #[error("Invalid descriptor document: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrationError {
    /// Create a bad request error.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error without a driver code.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            code: None,
        }
    }

    /// Create an internal error carrying the driver's own code.
    pub fn driver(msg: impl Into<String>, code: i64) -> Self {
        Self::Internal {
            message: msg.into(),
            code: Some(code),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Status code exposed to callers (HTTP semantics).
    pub fn code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::Config(_) | Self::Json(_) => 400,
            Self::NotFound(_) => 404,
            Self::Internal { .. } | Self::Io(_) => 500,
        }
    }

    /// Whether the error came from caller input rather than the database.
    pub fn is_client_error(&self) -> bool {
        self.code() < 500
    }

    /// Serialisable form used in batch results.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            message: self.to_string(),
            code: self.code(),
        }
    }
}

/// Error payload embedded in batch results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable message.
    pub message: String,
    /// Status code.
    pub code: u16,
}

impl From<&MigrationError> for ErrorBody {
    fn from(err: &MigrationError) -> Self {
        err.to_body()
    }
}

impl From<toml::de::Error> for MigrationError {
    fn from(err: toml::de::Error) -> Self {
        MigrationError::Config(format!("Failed to parse TOML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(MigrationError::bad_request("x").code(), 400);
        assert_eq!(MigrationError::not_found("x").code(), 404);
        assert_eq!(MigrationError::internal("x").code(), 500);
        assert_eq!(MigrationError::config("x").code(), 400);
    }

    #[test]
    fn test_driver_error_preserves_message() {
        let err = MigrationError::driver("Duplicate column name 'x'", 1060);
        assert_eq!(err.to_string(), "Duplicate column name 'x'");
        match err {
            MigrationError::Internal { code, .. } => assert_eq!(code, Some(1060)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_body() {
        let body = MigrationError::not_found("Table 'ghosts' does not exist").to_body();
        assert_eq!(body.code, 404);
        assert!(body.message.contains("ghosts"));
        assert!(!MigrationError::internal("boom").is_client_error());
    }
}
