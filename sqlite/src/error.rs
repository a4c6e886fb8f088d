//! Error types for history storage operations.
//!
//! Provides a unified error type covering database access, constraint
//! violations, conversion, migration, configuration, and argument failures.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during history storage operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[source] rusqlite::Error),

    /// A UNIQUE or NOT NULL constraint rejected a write (duplicate url or guid).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A stored value could not be converted back into a history type.
    #[error("conversion error: {0}")]
    ConversionError(String),

    /// The caller supplied an item the operation cannot act on.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Schema creation or version transition failure.
    #[error("migration error: {0}")]
    MigrationError(String),

    /// Table prefix contains invalid characters.
    #[error("invalid prefix '{0}': must contain only alphanumeric characters and underscores")]
    InvalidPrefix(String),

    /// Configuration file could not be read or written.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration file is not valid YAML for [`StoreConfig`](crate::StoreConfig).
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl From<rusqlite::Error> for HistoryError {
    fn from(err: rusqlite::Error) -> Self {
        if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            return HistoryError::ConstraintViolation(err.to_string());
        }
        match err {
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
            | rusqlite::Error::InvalidColumnType(..) => {
                HistoryError::ConversionError(err.to_string())
            }
            other => HistoryError::DatabaseError(other),
        }
    }
}

/// Convenience alias for results with [`HistoryError`].
pub type Result<T> = std::result::Result<T, HistoryError>;
