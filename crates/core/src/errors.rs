//! Core error types for BookChat.
//!
//! This module defines storage-agnostic error types. Diesel and SQLite errors
//! are converted to these by the storage crate; HTTP errors from remotes are
//! classified into [`MirrorError`] by the mirror clients.

use chrono::ParseError as ChronoParseError;
use thiserror::Error;

use crate::mirror::MirrorError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the chat application.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Mirror operation failed: {0}")]
    Mirror(#[from] MirrorError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Storage-agnostic error type for persistence operations.
///
/// All details are carried as strings so the storage layer can convert
/// engine-specific errors without leaking its types into the domain.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    #[error("Database query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// The single-writer task is gone; no further writes can be served.
    #[error("Database writer unavailable: {0}")]
    WriterUnavailable(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

/// Validation errors for user input.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Message content must not be empty")]
    EmptyMessage,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),
}

/// Errors raised while loading process configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: expected 'owner/name:token', got '{value}'")]
    MalformedTarget { key: String, value: String },

    #[error("{key}: suffix must be a positive number")]
    InvalidTargetIndex { key: String },

    #[error("repository target {0} is configured more than once")]
    DuplicateTarget(usize),

    #[error("{repository} is configured as both target {first} and target {second}")]
    DuplicateRepository {
        repository: String,
        first: usize,
        second: usize,
    },

    #[error("{key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl Error {
    /// True when the failure was caused by caller input rather than the system.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Unexpected(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}
