//! Ghostferry Error Types

use thiserror::Error;

/// Result type alias for ghostferry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ghostferry error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Query execution failed: {0}")]
    QueryExecution(String),

    // Verification errors
    #[error("row fingerprints did not match on {table} for pagination keys {pagination_keys:?}")]
    VerificationFailed {
        table: String,
        pagination_keys: Vec<u64>,
    },

    // Replication errors
    #[error("Unsupported replication event: {0}")]
    UnsupportedReplicationEvent(String),

    // State errors
    #[error("State error: {0}")]
    State(String),

    #[error("Resume state corrupted for {table}: {reason}")]
    StateCorrupted { table: String, reason: String },

    // Cutover errors
    #[error("Cutover {phase} failed: {reason}")]
    CutoverFailed { phase: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl Error {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Database(_) | Error::QueryExecution(_))
    }
}
