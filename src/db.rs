//! Proxima main struct and lifecycle operations.
//!
//! The [`Proxima`] struct is the primary interface for the database.
//! It provides methods for:
//!
//! - Opening and closing the database
//! - Inserting embedding records
//! - Similarity matching against stored records
//! - Fetching records by id
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use proxima::{Proxima, Config, MatchParams};
//!
//! // Open or create a database
//! let db = Proxima::open("./proxima.db", Config::default())?;
//!
//! // Insert a record with its embedding
//! let id = db.insert_embedding("Always validate user input", &embedding)?;
//!
//! // Find similar records
//! let matches = db.match_embeddings(&query_embedding, &MatchParams::default())?;
//!
//! // Close when done
//! db.close()?;
//! ```
//!
//! # Thread Safety
//!
//! `Proxima` is `Send + Sync` and can be shared across threads using
//! `Arc`. The storage engine uses MVCC for concurrent reads with
//! exclusive write locking, and the in-memory index serializes writers
//! behind its own lock while searches proceed concurrently.

use std::path::Path;

use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::{NotFoundError, ProximaError, Result, ValidationError};
use crate::record::EmbeddingRecord;
use crate::search::{self, MatchParams, SearchMatch};
use crate::storage::{open_storage, DatabaseMetadata, StorageEngine};
use crate::types::RecordId;
use crate::vector::{is_degenerate, HnswIndex};

/// The main Proxima database handle.
///
/// This is the primary interface for all database operations. Create an
/// instance with [`Proxima::open()`] and close it with
/// [`Proxima::close()`].
///
/// # Ownership
///
/// `Proxima` owns its storage engine and vector index. When you call
/// `close()`, the handle is consumed and cannot be used afterward.
pub struct Proxima {
    /// Durable record store, the source of truth.
    storage: Box<dyn StorageEngine>,

    /// In-memory ANN index, rebuilt from storage on open.
    index: HnswIndex,

    /// Configuration used to open this database.
    config: Config,
}

impl std::fmt::Debug for Proxima {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxima")
            .field("config", &self.config)
            .field("dimension", &self.dimension())
            .finish_non_exhaustive()
    }
}

impl Proxima {
    /// Opens or creates a database at the specified path.
    ///
    /// If the database doesn't exist, it will be created with the given
    /// configuration. If it exists, the configuration is validated
    /// against the stored settings (the embedding dimension must match).
    /// The vector index is rebuilt from stored records in ascending id
    /// order, so it is identical across reopens for an unchanged store.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration is invalid (see [`Config::validate`])
    /// - Database file is corrupted
    /// - Database is locked by another process
    /// - Schema version doesn't match
    /// - Embedding dimension doesn't match the existing database
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        config.validate().map_err(ProximaError::from)?;

        info!("Opening Proxima");

        let storage = open_storage(&path, &config)?;
        let dimension = config.dimension();

        // Rebuild the index from the store. A vector that fails to
        // index would make the record unreachable, so rebuild is strict.
        let records = storage.all_records()?;
        let count = records.len();
        let index = HnswIndex::rebuild(
            dimension,
            &config.hnsw,
            records.into_iter().map(|r| (r.id, r.vector)),
        )?;

        info!(dimension, records = count, "Proxima opened successfully");

        Ok(Self {
            storage,
            index,
            config,
        })
    }

    /// Closes the database, flushing all pending writes.
    ///
    /// This method consumes the `Proxima` instance, ensuring it cannot
    /// be used after closing. The in-memory index is simply dropped; it
    /// is rebuilt from storage on the next open.
    #[instrument(skip(self))]
    pub fn close(self) -> Result<()> {
        info!("Closing Proxima");
        self.storage.close()?;
        info!("Proxima closed successfully");
        Ok(())
    }

    /// Inserts a content string with its embedding and returns the
    /// assigned id.
    ///
    /// Ids are allocated from a monotonically increasing counter with no
    /// gaps: the first record gets id 1, the next id 2, and so on. The
    /// record is durably committed before the index is updated, so a
    /// crash between the two leaves the store authoritative and the
    /// record is re-indexed on the next open.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::DimensionMismatch`] if the vector length
    ///   differs from the configured dimension (no id is consumed)
    /// - [`ValidationError::DegenerateVector`] if every component is
    ///   zero, since such a vector has no defined cosine similarity
    #[instrument(skip(self, content, vector), fields(dim = vector.len()))]
    pub fn insert_embedding(&self, content: &str, vector: &[f32]) -> Result<RecordId> {
        let expected = self.dimension();
        if vector.len() != expected {
            return Err(ValidationError::dimension_mismatch(expected, vector.len()).into());
        }
        if is_degenerate(vector) {
            return Err(ValidationError::DegenerateVector.into());
        }

        let id = self.storage.insert_record(content, vector)?;

        if let Err(err) = self.index.insert(id, vector) {
            // The record is already durable; it will be indexed on the
            // next open
            warn!(id = %id, error = %err, "Record stored but indexing failed");
            return Err(err);
        }

        Ok(id)
    }

    /// Finds stored records similar to the query embedding.
    ///
    /// Returns up to `params.count` matches whose cosine similarity to
    /// the query strictly exceeds `params.threshold`, ordered by
    /// descending similarity with ties broken by smaller id. An empty
    /// database, or one with no qualifying records, returns an empty
    /// vector.
    ///
    /// The search does not modify any state: repeating it against an
    /// unchanged database returns identical results.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::InvalidArgument`] if `params.count == 0` or
    ///   the threshold is outside `[0, 1]`
    /// - [`ValidationError::DimensionMismatch`] on wrong query length
    /// - [`ValidationError::DegenerateVector`] on a zero-magnitude query
    #[instrument(skip(self, query), fields(dim = query.len(), count = params.count))]
    pub fn match_embeddings(&self, query: &[f32], params: &MatchParams) -> Result<Vec<SearchMatch>> {
        search::match_embeddings(
            &self.index,
            self.storage.as_ref(),
            &self.config.hnsw,
            query,
            params,
        )
    }

    /// Fetches a record by id.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError::Record`] if no record has the given id.
    pub fn get_record(&self, id: RecordId) -> Result<EmbeddingRecord> {
        self.storage
            .get_record(id)?
            .ok_or_else(|| NotFoundError::record(id.as_u64()).into())
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> Result<u64> {
        self.storage.record_count()
    }

    /// Returns true if the database holds no records.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns a reference to the database configuration.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the database metadata.
    #[inline]
    pub fn metadata(&self) -> &DatabaseMetadata {
        self.storage.metadata()
    }

    /// Returns the embedding dimension configured for this database.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.config.dimension()
    }
}

// Proxima is auto Send + Sync: Box<dyn StorageEngine + Send + Sync> and
// HnswIndex (RwLock-guarded graph) are both Send + Sync.
