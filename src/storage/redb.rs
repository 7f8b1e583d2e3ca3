//! redb storage engine implementation.
//!
//! This module provides the primary storage backend for Proxima using
//! [redb](https://docs.rs/redb), a pure Rust embedded key-value store.
//!
//! # Features
//!
//! - ACID transactions with MVCC
//! - Single-writer, multiple-reader concurrency
//! - Automatic crash recovery
//!
//! # File Layout
//!
//! When you open a database at `./proxima.db`, redb creates:
//! - `./proxima.db` - Main database file
//! - `./proxima.db.lock` - Lock file for writer coordination (may not be visible)

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ::redb::{Database, ReadableTable, ReadableTableMetadata};
use tracing::{debug, info, instrument, warn};

use super::schema::{
    decode_vector, encode_vector, DatabaseMetadata, StoredRecord, METADATA_KEY, METADATA_TABLE,
    NEXT_ID_KEY, RECORDS_TABLE, SCHEMA_VERSION, VECTORS_TABLE,
};
use super::StorageEngine;
use crate::config::Config;
use crate::error::{ProximaError, Result, StorageError, ValidationError};
use crate::record::EmbeddingRecord;
use crate::types::{RecordId, Timestamp};

/// redb storage engine wrapper.
///
/// This struct holds the redb database handle and cached metadata.
/// It implements [`StorageEngine`] for use with Proxima.
///
/// # Thread Safety
///
/// `RedbStorage` is `Send + Sync`. redb handles internal synchronization
/// using MVCC for readers and exclusive locking for writers.
#[derive(Debug)]
pub struct RedbStorage {
    /// The redb database handle.
    db: Database,

    /// Cached database metadata.
    metadata: DatabaseMetadata,

    /// Path to the database file.
    path: PathBuf,
}

impl RedbStorage {
    /// Opens or creates a database at the given path.
    ///
    /// If the database doesn't exist, it will be created and initialized
    /// with the configuration settings. If it exists, the configuration
    /// will be validated against the stored metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The database file is corrupted
    /// - The database is locked by another process
    /// - Schema version doesn't match
    /// - Embedding dimension doesn't match (for existing databases)
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let path = path.as_ref();
        let db_exists = path.exists();

        debug!(db_exists = db_exists, "Opening storage engine");

        let db = Self::create_database(path)?;

        if db_exists {
            Self::open_existing(db, path.to_path_buf(), config)
        } else {
            Self::initialize_new(db, path.to_path_buf(), config)
        }
    }

    /// Creates the redb database with appropriate settings.
    fn create_database(path: &Path) -> Result<Database> {
        // Note: redb doesn't expose a typed error variant for lock conflicts,
        // so we detect them via error message string matching. This may need
        // updating if redb changes its error messages in a future version.
        let db = Database::builder().create(path).map_err(|e| {
            if e.to_string().contains("locked") {
                StorageError::DatabaseLocked
            } else {
                StorageError::Redb(e.to_string())
            }
        })?;

        debug!("Database file opened successfully");
        Ok(db)
    }

    /// Initializes a new database with tables and metadata.
    #[instrument(skip(db, config), fields(path = %path.display()))]
    fn initialize_new(db: Database, path: PathBuf, config: &Config) -> Result<Self> {
        info!("Initializing new database");

        let metadata = DatabaseMetadata::new(config.dimension);

        // Create all tables, write metadata, and seed the id counter in a
        // single transaction
        let write_txn = db.begin_write().map_err(StorageError::from)?;
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes = bincode::serialize(&metadata)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;
            meta_table.insert(NEXT_ID_KEY, 1u64.to_be_bytes().as_slice())?;

            let _ = write_txn.open_table(RECORDS_TABLE)?;
            let _ = write_txn.open_table(VECTORS_TABLE)?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(
            schema_version = SCHEMA_VERSION,
            dimension = config.dimension.size(),
            "Database initialized"
        );

        Ok(Self { db, metadata, path })
    }

    /// Opens and validates an existing database.
    #[instrument(skip(db, config), fields(path = %path.display()))]
    fn open_existing(db: Database, path: PathBuf, config: &Config) -> Result<Self> {
        info!("Opening existing database");

        let read_txn = db.begin_read().map_err(StorageError::from)?;

        let metadata = {
            let meta_table = read_txn.open_table(METADATA_TABLE).map_err(|e| {
                StorageError::corrupted(format!("Cannot open metadata table: {}", e))
            })?;

            let metadata_bytes = meta_table
                .get(METADATA_KEY)
                .map_err(StorageError::from)?
                .ok_or_else(|| StorageError::corrupted("Missing database metadata"))?;

            bincode::deserialize::<DatabaseMetadata>(metadata_bytes.value())
                .map_err(|e| StorageError::corrupted(format!("Invalid metadata format: {}", e)))?
        };

        drop(read_txn);

        // Validate schema version
        if metadata.schema_version != SCHEMA_VERSION {
            warn!(
                expected = SCHEMA_VERSION,
                found = metadata.schema_version,
                "Schema version mismatch"
            );
            return Err(ProximaError::Storage(StorageError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found: metadata.schema_version,
            }));
        }

        // Validate embedding dimension
        if metadata.dimension != config.dimension {
            warn!(
                expected = config.dimension.size(),
                found = metadata.dimension.size(),
                "Embedding dimension mismatch"
            );
            return Err(ProximaError::Validation(
                ValidationError::DimensionMismatch {
                    expected: config.dimension.size(),
                    got: metadata.dimension.size(),
                },
            ));
        }

        // Update last_opened_at timestamp
        let mut metadata = metadata;
        metadata.touch();

        let write_txn = db.begin_write().map_err(StorageError::from)?;
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes = bincode::serialize(&metadata)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(
            schema_version = metadata.schema_version,
            dimension = metadata.dimension.size(),
            "Database opened successfully"
        );

        Ok(Self { db, metadata, path })
    }

    /// Returns a reference to the underlying redb database.
    #[inline]
    #[cfg(test)]
    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Assembles an `EmbeddingRecord` from its two table entries.
    fn assemble_record(
        id: RecordId,
        stored_bytes: &[u8],
        vector_bytes: &[u8],
    ) -> Result<EmbeddingRecord> {
        let stored: StoredRecord = bincode::deserialize(stored_bytes)
            .map_err(|e| StorageError::serialization(e.to_string()))?;
        let vector = decode_vector(vector_bytes).ok_or_else(|| {
            StorageError::corrupted(format!("Vector bytes for record {} are misaligned", id))
        })?;
        Ok(EmbeddingRecord {
            id,
            content: stored.content,
            vector,
            created_at: stored.created_at,
        })
    }
}

impl StorageEngine for RedbStorage {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    #[instrument(skip(self))]
    fn close(self: Box<Self>) -> Result<()> {
        info!("Closing storage engine");

        // redb flushes all data durably on drop. Since `Database::drop` is
        // infallible, this method currently always returns Ok(()). The Result
        // return type is retained for API forward-compatibility if a future
        // storage backend can report flush errors.
        drop(self.db);

        info!("Storage engine closed");
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    fn insert_record(&self, content: &str, vector: &[f32]) -> Result<RecordId> {
        let expected = self.metadata.dimension.size();
        if vector.len() != expected {
            return Err(ValidationError::dimension_mismatch(expected, vector.len()).into());
        }

        let stored = StoredRecord {
            content: content.to_string(),
            created_at: Timestamp::now(),
        };
        let record_bytes =
            bincode::serialize(&stored).map_err(|e| StorageError::serialization(e.to_string()))?;
        let vector_bytes = encode_vector(vector);

        // Counter read, record write, vector write, and counter bump all
        // commit atomically, so ids stay gap-free even across crashes.
        let write_txn = self.db.begin_write().map_err(StorageError::from)?;
        let id;
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let next_id = {
                let counter = meta_table
                    .get(NEXT_ID_KEY)
                    .map_err(StorageError::from)?
                    .ok_or_else(|| StorageError::corrupted("Missing id counter"))?;
                let bytes: [u8; 8] = counter.value().try_into().map_err(|_| {
                    StorageError::corrupted("Id counter is not 8 bytes")
                })?;
                u64::from_be_bytes(bytes)
            };
            meta_table.insert(NEXT_ID_KEY, (next_id + 1).to_be_bytes().as_slice())?;
            id = RecordId(next_id);

            let mut records = write_txn.open_table(RECORDS_TABLE)?;
            records.insert(id.as_u64(), record_bytes.as_slice())?;

            let mut vectors = write_txn.open_table(VECTORS_TABLE)?;
            vectors.insert(id.as_u64(), vector_bytes.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        debug!(id = %id, content_len = content.len(), "Record inserted");
        Ok(id)
    }

    fn get_record(&self, id: RecordId) -> Result<Option<EmbeddingRecord>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let records = read_txn.open_table(RECORDS_TABLE)?;
        let vectors = read_txn.open_table(VECTORS_TABLE)?;

        let stored = match records.get(id.as_u64())? {
            Some(value) => value,
            None => return Ok(None),
        };
        let vector = vectors.get(id.as_u64())?.ok_or_else(|| {
            StorageError::corrupted(format!("Record {} has no vector entry", id))
        })?;

        Ok(Some(Self::assemble_record(
            id,
            stored.value(),
            vector.value(),
        )?))
    }

    fn fetch_records(&self, ids: &[RecordId]) -> Result<HashMap<RecordId, EmbeddingRecord>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let records = read_txn.open_table(RECORDS_TABLE)?;
        let vectors = read_txn.open_table(VECTORS_TABLE)?;

        let mut out = HashMap::with_capacity(ids.len());
        for &id in ids {
            let stored = match records.get(id.as_u64())? {
                Some(value) => value,
                // Missing ids are omitted, not an error — the caller may be
                // holding a stale index snapshot
                None => continue,
            };
            let vector = vectors.get(id.as_u64())?.ok_or_else(|| {
                StorageError::corrupted(format!("Record {} has no vector entry", id))
            })?;
            out.insert(id, Self::assemble_record(id, stored.value(), vector.value())?);
        }

        Ok(out)
    }

    fn all_records(&self) -> Result<Vec<EmbeddingRecord>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let records = read_txn.open_table(RECORDS_TABLE)?;
        let vectors = read_txn.open_table(VECTORS_TABLE)?;

        // redb iterates u64 keys in ascending order, which is exactly the
        // insertion order we need for deterministic rebuild
        let mut out = Vec::new();
        for entry in records.iter()? {
            let (key, stored) = entry.map_err(StorageError::from)?;
            let id = RecordId(key.value());
            let vector = vectors.get(id.as_u64())?.ok_or_else(|| {
                StorageError::corrupted(format!("Record {} has no vector entry", id))
            })?;
            out.push(Self::assemble_record(id, stored.value(), vector.value())?);
        }

        Ok(out)
    }

    fn record_count(&self) -> Result<u64> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let records = read_txn.open_table(RECORDS_TABLE)?;
        Ok(records.len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingDimension;
    use tempfile::tempdir;

    fn small_config() -> Config {
        Config {
            dimension: EmbeddingDimension::Custom(4),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_creates_new_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        assert!(!path.exists());

        let storage = RedbStorage::open(&path, &Config::default()).unwrap();

        assert!(path.exists());
        assert_eq!(storage.metadata().schema_version, SCHEMA_VERSION);
        assert_eq!(storage.metadata().dimension, EmbeddingDimension::D384);

        Box::new(storage).close().unwrap();
    }

    #[test]
    fn test_open_existing_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let storage = RedbStorage::open(&path, &Config::default()).unwrap();
        let created_at = storage.metadata().created_at;
        Box::new(storage).close().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        let storage = RedbStorage::open(&path, &Config::default()).unwrap();

        // created_at should be preserved, last_opened_at updated
        assert_eq!(storage.metadata().created_at, created_at);
        assert!(storage.metadata().last_opened_at > created_at);

        Box::new(storage).close().unwrap();
    }

    #[test]
    fn test_dimension_mismatch_on_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let config_384 = Config::default();
        let storage = RedbStorage::open(&path, &config_384).unwrap();
        Box::new(storage).close().unwrap();

        let config_768 = Config {
            dimension: EmbeddingDimension::D768,
            ..Default::default()
        };
        let result = RedbStorage::open(&path, &config_768);

        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ProximaError::Validation(ValidationError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_insert_and_get_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let storage = RedbStorage::open(&path, &small_config()).unwrap();

        let id = storage
            .insert_record("hello world", &[1.0, 0.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(id, RecordId(1));

        let record = storage.get_record(id).unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.content, "hello world");
        assert_eq!(record.vector, vec![1.0, 0.0, 0.0, 0.0]);

        Box::new(storage).close().unwrap();
    }

    #[test]
    fn test_ids_are_gap_free_and_increasing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let storage = RedbStorage::open(&path, &small_config()).unwrap();

        let id1 = storage.insert_record("a", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        let id2 = storage.insert_record("b", &[0.0, 1.0, 0.0, 0.0]).unwrap();
        let id3 = storage.insert_record("c", &[0.0, 0.0, 1.0, 0.0]).unwrap();

        assert_eq!(id1, RecordId(1));
        assert_eq!(id2, RecordId(2));
        assert_eq!(id3, RecordId(3));

        Box::new(storage).close().unwrap();
    }

    #[test]
    fn test_dimension_mismatch_consumes_no_id() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let storage = RedbStorage::open(&path, &small_config()).unwrap();

        let err = storage.insert_record("bad", &[1.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            ProximaError::Validation(ValidationError::DimensionMismatch {
                expected: 4,
                got: 2
            })
        ));
        assert_eq!(storage.record_count().unwrap(), 0);

        // The next valid insert still gets id 1
        let id = storage.insert_record("ok", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(id, RecordId(1));

        Box::new(storage).close().unwrap();
    }

    #[test]
    fn test_get_nonexistent_record_returns_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let storage = RedbStorage::open(&path, &small_config()).unwrap();

        assert!(storage.get_record(RecordId(99)).unwrap().is_none());

        Box::new(storage).close().unwrap();
    }

    #[test]
    fn test_fetch_records_omits_missing_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let storage = RedbStorage::open(&path, &small_config()).unwrap();

        let id1 = storage.insert_record("a", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        let id2 = storage.insert_record("b", &[0.0, 1.0, 0.0, 0.0]).unwrap();

        let fetched = storage
            .fetch_records(&[id1, RecordId(50), id2])
            .unwrap();

        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[&id1].content, "a");
        assert_eq!(fetched[&id2].content, "b");
        assert!(!fetched.contains_key(&RecordId(50)));

        Box::new(storage).close().unwrap();
    }

    #[test]
    fn test_all_records_ascending_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let storage = RedbStorage::open(&path, &small_config()).unwrap();

        for i in 0..5 {
            let mut v = [0.0f32; 4];
            v[i % 4] = 1.0;
            storage.insert_record(&format!("record-{}", i), &v).unwrap();
        }

        let all = storage.all_records().unwrap();
        assert_eq!(all.len(), 5);
        for w in all.windows(2) {
            assert!(w[0].id < w[1].id, "Records not in ascending id order");
        }

        Box::new(storage).close().unwrap();
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let storage = RedbStorage::open(&path, &small_config()).unwrap();
        let id = storage
            .insert_record("persisted", &[0.5, 0.5, 0.0, 0.0])
            .unwrap();
        Box::new(storage).close().unwrap();

        let storage = RedbStorage::open(&path, &small_config()).unwrap();
        let record = storage.get_record(id).unwrap().unwrap();
        assert_eq!(record.content, "persisted");
        assert_eq!(record.vector, vec![0.5, 0.5, 0.0, 0.0]);

        // Counter also persisted: next insert continues the sequence
        let next = storage.insert_record("next", &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(next, RecordId(2));

        Box::new(storage).close().unwrap();
    }

    #[test]
    fn test_uncommitted_transaction_is_invisible() {
        // ATOMICITY: If we don't commit a write transaction, the data
        // must not be visible to subsequent reads.
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let storage = RedbStorage::open(&path, &small_config()).unwrap();

        {
            let write_txn = storage.database().begin_write().unwrap();
            {
                let mut table = write_txn.open_table(RECORDS_TABLE).unwrap();
                table.insert(99u64, b"phantom".as_slice()).unwrap();
            }
            // write_txn is dropped here without commit() -- rolled back
        }

        assert!(storage.get_record(RecordId(99)).unwrap().is_none());

        Box::new(storage).close().unwrap();
    }

    #[test]
    fn test_corruption_detection_invalid_metadata_bytes() {
        // Opening a database whose metadata contains garbage bytes
        // must return a Corrupted error, not a panic.
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.db");

        let storage = RedbStorage::open(&path, &small_config()).unwrap();
        let write_txn = storage.database().begin_write().unwrap();
        {
            let mut meta = write_txn.open_table(METADATA_TABLE).unwrap();
            meta.insert(METADATA_KEY, b"not-valid-bincode-data".as_slice())
                .unwrap();
        }
        write_txn.commit().unwrap();
        Box::new(storage).close().unwrap();

        let result = RedbStorage::open(&path, &small_config());
        assert!(result.is_err(), "Corrupted metadata must be rejected");
        match result.unwrap_err() {
            ProximaError::Storage(StorageError::Corrupted(msg)) => {
                assert!(msg.contains("Invalid metadata format"));
            }
            other => panic!("Expected StorageError::Corrupted, got: {:?}", other),
        }
    }
}
