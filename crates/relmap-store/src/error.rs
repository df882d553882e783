//! Error types for the mapping and query layer.

use relmap_db::{MigrationError, PoolError};
use rusqlite::ErrorCode;

/// Errors that can occur during store operations.
///
/// Callers are expected to treat [`StoreError::NotFound`] as an ordinary
/// outcome and [`StoreError::Conflict`] as a rejected write; everything else
/// is an infrastructure failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A `first` read matched no rows.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A write violated a constraint (foreign key, NOT NULL, CHECK, UNIQUE).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A filter named a column the table does not have.
    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: &'static str, column: String },

    /// A raw query was given a statement that writes.
    #[error("statement is not read-only: {0}")]
    NotReadOnly(String),

    /// Any other SQLite failure.
    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// No pooled connection became available in time.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The pool could not be built.
    #[error(transparent)]
    PoolInit(#[from] PoolError),

    /// Schema migration failed.
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, ref message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(message.clone().unwrap_or_else(|| failure.to_string()))
            }
            other => Self::Database(other),
        }
    }
}
