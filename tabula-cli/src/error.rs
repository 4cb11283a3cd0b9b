//! CLI error types and result alias.

use miette::Diagnostic;
use tabula_migrate::MigrationError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(tabula::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(tabula::config))]
    Config(String),

    /// Descriptor file could not be decoded
    #[error("Descriptor error: {0}")]
    #[diagnostic(code(tabula::descriptor), help("expected a table object, an array of tables or a table envelope"))]
    Descriptor(String),

    /// Validation error
    #[error("Validation error: {0}")]
    #[diagnostic(code(tabula::validation))]
    Validation(String),

    /// Migration error
    #[error("Migration error: {0}")]
    #[diagnostic(code(tabula::migration))]
    Migration(String),
}

impl From<MigrationError> for CliError {
    fn from(err: MigrationError) -> Self {
        match err {
            MigrationError::Config(msg) => CliError::Config(msg),
            MigrationError::Io(e) => CliError::Io(e),
            MigrationError::Json(e) => CliError::Descriptor(e.to_string()),
            other => CliError::Migration(format!("{} (code {})", other, other.code())),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Descriptor(err.to_string())
    }
}
