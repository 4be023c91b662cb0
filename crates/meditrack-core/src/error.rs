//! Core error types for meditrack-core.
//!
//! This module defines the error hierarchy using thiserror. The taxonomy
//! follows the failure surfaces of the core: entry lookup, schedule
//! validation, the external timer service, and SQLite storage. A timer
//! firing for a stale or deleted key is deliberately *not* an error; the
//! orchestrator discards it silently.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for meditrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// An operation referenced an entry id that does not exist.
    #[error("No medicine with id {id}")]
    NotFound { id: i64 },

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Schedule validation errors, rejected at the creation/edit boundary.
    #[error("Invalid schedule: {0}")]
    Validation(#[from] ValidationError),

    /// External timer service errors
    #[error("Timer service error: {0}")]
    Timer(#[from] TimerError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be decoded into its domain type
    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Schedule validation errors.
///
/// A malformed entry must never reach the trigger planner; these are
/// surfaced wherever user input crosses into the core.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Medicine name is empty or whitespace-only
    #[error("Medicine name must not be empty")]
    EmptyName,

    /// No active weekday selected
    #[error("At least one weekday must be selected")]
    EmptyWeekdays,

    /// Invalid value for a schedule field
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// External timer service errors.
#[derive(Error, Debug)]
pub enum TimerError {
    /// The platform timer service refused or failed the request
    /// (resource exhaustion, OS quota, backing store failure).
    #[error("Timer service unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<rusqlite::Error> for TimerError {
    fn from(err: rusqlite::Error) -> Self {
        TimerError::Unavailable(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
