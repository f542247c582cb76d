//! Error types for the relational layer.

use std::path::PathBuf;
use thiserror::Error;

/// Database and import error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Connection(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Failed to read source file {}: {reason}", path.display())]
    SourceRead { path: PathBuf, reason: String },

    #[error("Column '{column}' not found (available: {})", available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("Column layout for '{table}' does not match schema: expected {expected} columns, found {found}")]
    SchemaMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid value for {table}.{column} at row {row}: {reason}")]
    InvalidValue {
        table: String,
        column: String,
        row: usize,
        reason: String,
    },

    #[error("Unresolved values for required column {table}.{column}: {}", missing.join(", "))]
    UnresolvedForeignKey {
        table: String,
        column: String,
        missing: Vec<String>,
    },

    #[error("Bulk insert into '{table}' rolled back after {attempted} attempted rows: {source}")]
    BulkInsert {
        table: String,
        attempted: usize,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Connection pool poisoned")]
    Poisoned,
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Create a source-read error for a file.
    pub fn source_read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
