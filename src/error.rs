//! Error types for Proxima.
//!
//! Proxima uses a hierarchical error system:
//! - `ProximaError` is the top-level error returned by all public APIs
//! - Specific error types (`StorageError`, `ValidationError`) provide detail
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use proxima::{Proxima, Config, Result};
//!
//! fn example() -> Result<()> {
//!     let db = Proxima::open("./proxima.db", Config::default())?;
//!     // ... operations that may fail ...
//!     db.close()?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Proxima operations.
pub type Result<T> = std::result::Result<T, ProximaError>;

/// Top-level error enum for all Proxima operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching to handle specific error cases.
#[derive(Debug, Error)]
pub enum ProximaError {
    /// Storage layer error (I/O, corruption, transactions).
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration error.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },

    /// Requested entity not found.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// General I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Vector index error (HNSW graph operations).
    #[error("Vector index error: {0}")]
    Index(String),
}

impl ProximaError {
    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a storage error.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Creates a vector index error with the given message.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }
}

/// Storage-related errors.
///
/// These errors indicate problems with the underlying storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database file or data is corrupted.
    #[error("Database corrupted: {0}")]
    Corrupted(String),

    /// Database file not found at expected path.
    #[error("Database not found: {0}")]
    DatabaseNotFound(PathBuf),

    /// Database is locked by another process.
    #[error("Database is locked by another writer")]
    DatabaseLocked,

    /// Transaction failed (commit, rollback, etc.).
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error from the redb storage engine.
    #[error("Storage engine error: {0}")]
    Redb(String),

    /// Database schema version doesn't match expected version.
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Expected schema version.
        expected: u32,
        /// Actual schema version found in database.
        found: u32,
    },
}

impl StorageError {
    /// Creates a corruption error with the given message.
    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::Corrupted(msg.into())
    }

    /// Creates a transaction error with the given message.
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// Creates a serialization error with the given message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a redb error with the given message.
    pub fn redb(msg: impl Into<String>) -> Self {
        Self::Redb(msg.into())
    }
}

// Conversions from redb error types
impl From<redb::Error> for StorageError {
    fn from(err: redb::Error) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(err: redb::DatabaseError) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(err: redb::TransactionError) -> Self {
        StorageError::Transaction(err.to_string())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(err: redb::CommitError) -> Self {
        StorageError::Transaction(format!("Commit failed: {}", err))
    }
}

impl From<redb::TableError> for StorageError {
    fn from(err: redb::TableError) -> Self {
        StorageError::Redb(format!("Table error: {}", err))
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(err: redb::StorageError) -> Self {
        StorageError::Redb(format!("Storage error: {}", err))
    }
}

// Convert bincode errors to StorageError
impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

// Also allow direct conversion to ProximaError for convenience
impl From<redb::Error> for ProximaError {
    fn from(err: redb::Error) -> Self {
        ProximaError::Storage(StorageError::from(err))
    }
}

impl From<redb::DatabaseError> for ProximaError {
    fn from(err: redb::DatabaseError) -> Self {
        ProximaError::Storage(StorageError::from(err))
    }
}

impl From<redb::TransactionError> for ProximaError {
    fn from(err: redb::TransactionError) -> Self {
        ProximaError::Storage(StorageError::from(err))
    }
}

impl From<redb::CommitError> for ProximaError {
    fn from(err: redb::CommitError) -> Self {
        ProximaError::Storage(StorageError::from(err))
    }
}

impl From<redb::TableError> for ProximaError {
    fn from(err: redb::TableError) -> Self {
        ProximaError::Storage(StorageError::from(err))
    }
}

impl From<redb::StorageError> for ProximaError {
    fn from(err: redb::StorageError) -> Self {
        ProximaError::Storage(StorageError::from(err))
    }
}

impl From<bincode::Error> for ProximaError {
    fn from(err: bincode::Error) -> Self {
        ProximaError::Storage(StorageError::from(err))
    }
}

/// Validation errors for input data.
///
/// These errors indicate problems with data provided by the caller.
/// They are surfaced synchronously and never retried internally.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Vector length doesn't match the database's configured dimension.
    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected dimension from database configuration.
        expected: usize,
        /// Actual dimension provided.
        got: usize,
    },

    /// A vector has zero magnitude, so cosine distance is undefined.
    #[error("Degenerate vector: zero magnitude, cosine distance undefined")]
    DegenerateVector,

    /// An argument has an invalid value.
    #[error("Invalid argument '{argument}': {reason}")]
    InvalidArgument {
        /// Name of the invalid argument.
        argument: String,
        /// Why the value is invalid.
        reason: String,
    },
}

impl ValidationError {
    /// Creates a dimension mismatch error.
    pub fn dimension_mismatch(expected: usize, got: usize) -> Self {
        Self::DimensionMismatch { expected, got }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }
}

/// Not found errors for specific entity types.
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// Record with the given id not found.
    #[error("Record not found: {0}")]
    Record(u64),
}

impl NotFoundError {
    /// Creates a record not found error.
    pub fn record(id: u64) -> Self {
        Self::Record(id)
    }
}
