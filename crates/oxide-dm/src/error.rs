//! Error types for the DM dialect.

use std::num::ParseIntError;

/// Errors that can occur while generating or executing dialect SQL.
#[derive(Debug, thiserror::Error)]
pub enum DialectError {
    /// Database error reported by the executor.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A field kind has no column type and no explicit `TYPE` override.
    #[error("Invalid sql type {kind} in field {field} for dm")]
    UnmappableKind {
        /// The field that could not be mapped.
        field: String,
        /// The host kind of that field.
        kind: String,
    },

    /// A LIMIT or OFFSET value is not an integer.
    #[error("Invalid {clause} value '{value}': {source}")]
    InvalidPagination {
        /// Either `LIMIT` or `OFFSET`.
        clause: &'static str,
        /// The rejected value as rendered by the caller.
        value: String,
        /// The underlying parse error.
        #[source]
        source: ParseIntError,
    },

    /// The session context did not report a current schema.
    #[error("Current schema could not be determined")]
    UnknownSchema,

    /// An unknown column kind name was given.
    #[error("Unknown column kind: {0}")]
    UnknownKind(String),
}

/// Result type for dialect operations.
pub type Result<T> = std::result::Result<T, DialectError>;
