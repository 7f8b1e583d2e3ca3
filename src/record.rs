//! The embedding record, the canonical unit of stored data.

use serde::{Deserialize, Serialize};

use crate::types::{Embedding, RecordId, Timestamp};

/// A stored embedding record: text payload plus its vector.
///
/// Records are immutable after creation. The store owns the canonical
/// data; the HNSW index is a derived structure rebuilt from records.
///
/// # Serialization
///
/// The content and timestamp are serialized with bincode; the vector is
/// stored separately as raw little-endian f32 bytes to keep the main
/// table compact (see `storage::schema`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier, assigned by the store.
    pub id: RecordId,

    /// Text payload associated with the vector. May be empty;
    /// opaque to the index.
    pub content: String,

    /// Embedding vector. Always exactly the database's configured
    /// dimension.
    pub vector: Embedding,

    /// When this record was inserted.
    pub created_at: Timestamp,
}

impl EmbeddingRecord {
    /// Creates a record with the current timestamp.
    pub fn new(id: RecordId, content: impl Into<String>, vector: Embedding) -> Self {
        Self {
            id,
            content: content.into(),
            vector,
            created_at: Timestamp::now(),
        }
    }
}
