//! Storage layer abstractions for Proxima.
//!
//! This module provides a trait-based abstraction over the record store,
//! allowing different backends to be used (e.g., redb, mock for testing).
//!
//! The store owns the canonical data. The HNSW index is a derived,
//! rebuildable structure — on open, the graph is reconstructed from the
//! vectors persisted here.

pub mod redb;
pub mod schema;

pub use self::redb::RedbStorage;
pub use schema::{DatabaseMetadata, SCHEMA_VERSION};

use std::collections::HashMap;
use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::record::EmbeddingRecord;
use crate::types::RecordId;

/// Storage engine trait for the vector record store.
///
/// This trait defines the contract that any storage backend must implement.
/// The primary implementation is [`RedbStorage`].
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow the database to be shared
/// across threads. The engine handles internal synchronization; records are
/// immutable after creation, so concurrent reads need no coordination.
pub trait StorageEngine: Send + Sync {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Returns the database metadata.
    fn metadata(&self) -> &DatabaseMetadata;

    /// Closes the storage engine, flushing any pending writes.
    ///
    /// This method consumes the storage engine. After calling `close()`,
    /// the engine cannot be used.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend supports reporting flush failures.
    /// Note: the current redb backend flushes on drop (infallible), so
    /// this always returns `Ok(())` for [`RedbStorage`].
    fn close(self: Box<Self>) -> Result<()>;

    /// Returns the path to the database file, if applicable.
    fn path(&self) -> Option<&Path>;

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Inserts a record and returns its newly assigned id.
    ///
    /// The id is allocated from a persisted counter inside the same write
    /// transaction as the record and vector writes, so ids are gap-free
    /// and a failed insert never consumes one. The record is durably
    /// committed before this method returns.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DimensionMismatch` if the vector length
    /// doesn't match the database's configured dimension. The store is
    /// left unchanged in that case.
    fn insert_record(&self, content: &str, vector: &[f32]) -> Result<RecordId>;

    /// Retrieves a record by id, including its vector.
    ///
    /// Returns `None` if no record with the given id exists.
    fn get_record(&self, id: RecordId) -> Result<Option<EmbeddingRecord>>;

    /// Retrieves multiple records in a single read transaction.
    ///
    /// Missing ids are silently omitted from the result (not an error):
    /// the caller is reconciling against a point-in-time index snapshot.
    fn fetch_records(&self, ids: &[RecordId]) -> Result<HashMap<RecordId, EmbeddingRecord>>;

    /// Returns all records in ascending id order.
    ///
    /// Used to rebuild the HNSW index on open. Ascending order plus a
    /// seeded RNG makes the rebuilt graph deterministic.
    fn all_records(&self) -> Result<Vec<EmbeddingRecord>>;

    /// Returns the number of stored records.
    fn record_count(&self) -> Result<u64>;
}

/// Opens a storage engine at the given path.
///
/// This is a convenience function that creates a [`RedbStorage`] instance.
/// For more control, use `RedbStorage::open()` directly.
///
/// # Errors
///
/// Returns an error if:
/// - The database file is corrupted
/// - The database is locked by another process
/// - Schema version doesn't match
/// - Embedding dimension doesn't match (for existing databases)
pub fn open_storage(path: impl AsRef<Path>, config: &Config) -> Result<Box<dyn StorageEngine>> {
    let storage = RedbStorage::open(path, config)?;
    Ok(Box::new(storage))
}
