//! Custom error types for the common library
//!
//! This module defines the database error type shared by every service
//! in the workspace.

use sqlx::Error as SqlxError;
use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(#[source] MigrateError),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// Every bootstrap attempt failed
    #[error("failed to connect to the database after {attempts} attempts")]
    Unavailable {
        attempts: u32,
        #[source]
        last: SqlxError,
    },
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
