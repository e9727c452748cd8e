//! Error handling module
//!
//! Unified error types for ignore-rule parsing, snapshot inspection and the
//! comparison itself. Structural mismatches are never errors; they are data
//! carried by [`crate::result::CompareResult`].

use thiserror::Error;

/// Grammar every ignore clause has to follow.
pub const CLAUSE_GRAMMAR: &str = "table_name.identifier.name";

/// Failure while parsing one ignore clause.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IgnoreClauseError {
    /// Wrong number of segments, or an empty segment. Carries the clause as given.
    #[error("{0} is not a well formed clause: table_name.identifier.name")]
    MalformedClause(String),

    /// The middle segment is not one of the known categories.
    #[error("{0} is invalid. It must be in ['pk', 'fk', 'idx', 'col']")]
    InvalidIdentifier(String),
}

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    IgnoreClause(#[from] IgnoreClauseError),

    #[error("Invalid schema snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Stable machine-readable code, used when reporting failures from the binary.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::IgnoreClause(_) => "IGNORE_CLAUSE",
            AppError::InvalidSnapshot(_) => "INVALID_SNAPSHOT",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Connection(_) => "CONNECTION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Json(_) => "JSON_ERROR",
        }
    }
}

/// Result type alias used throughout the crate
pub type AppResult<T> = Result<T, AppError>;

/// Helper function to create a snapshot contract violation
pub fn invalid_snapshot(msg: impl Into<String>) -> AppError {
    AppError::InvalidSnapshot(msg.into())
}

/// Helper function to create a configuration error
pub fn config_error(msg: impl Into<String>) -> AppError {
    AppError::Config(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_clause_message() {
        let err = IgnoreClauseError::MalformedClause("too.few".to_string());
        assert_eq!(
            err.to_string(),
            "too.few is not a well formed clause: table_name.identifier.name"
        );
    }

    #[test]
    fn test_invalid_identifier_message() {
        let err = IgnoreClauseError::InvalidIdentifier("unknown".to_string());
        assert_eq!(
            err.to_string(),
            "unknown is invalid. It must be in ['pk', 'fk', 'idx', 'col']"
        );
    }

    #[test]
    fn test_clause_error_is_transparent() {
        let err: AppError = IgnoreClauseError::MalformedClause("none".to_string()).into();
        assert_eq!(
            err.to_string(),
            "none is not a well formed clause: table_name.identifier.name"
        );
        assert_eq!(err.code(), "IGNORE_CLAUSE");
    }
}
