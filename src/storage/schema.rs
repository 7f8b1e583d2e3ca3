//! Database schema definitions and versioning.
//!
//! This module defines the table structure for the redb storage engine.
//! All table definitions are compile-time constants to ensure consistency.
//!
//! # Schema Versioning
//!
//! The schema version is stored in the metadata table. When opening an
//! existing database, we check the version and fail if it doesn't match.
//!
//! # Table Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ METADATA_TABLE                                               │
//! │   Key: &str                                                  │
//! │   Value: &[u8] (bincode)                                     │
//! │   Entries: "db_metadata" -> DatabaseMetadata                 │
//! │            "next_record_id" -> u64 big-endian bytes          │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │ RECORDS_TABLE                                                │
//! │   Key: u64 (RecordId)                                        │
//! │   Value: &[u8] (bincode StoredRecord: content + created_at) │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │ VECTORS_TABLE                                                │
//! │   Key: u64 (RecordId)                                        │
//! │   Value: &[u8] (raw little-endian f32 bytes, dim * 4)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Vectors are stored separately from record payloads so payload scans
//! don't drag vector bytes through the page cache.

use redb::TableDefinition;
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingDimension;
use crate::types::Timestamp;

/// Current schema version.
///
/// Increment this when making breaking changes to the schema.
/// The database will refuse to open if versions don't match.
pub const SCHEMA_VERSION: u32 = 1;

/// Metadata key for the database metadata entry.
pub const METADATA_KEY: &str = "db_metadata";

/// Metadata key for the persisted id counter.
pub const NEXT_ID_KEY: &str = "next_record_id";

// ============================================================================
// Table Definitions
// ============================================================================

/// Metadata table for database-level information.
pub const METADATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

/// Records table.
///
/// Key: RecordId as u64
/// Value: bincode-serialized StoredRecord (content + created_at, no vector)
pub const RECORDS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("records");

/// Vectors table.
///
/// Key: RecordId as u64
/// Value: raw little-endian f32 bytes (dimension * 4 bytes)
pub const VECTORS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("vectors");

// ============================================================================
// Stored Record
// ============================================================================

/// On-disk shape of a record in `RECORDS_TABLE`.
///
/// The vector is stored in `VECTORS_TABLE` under the same key; the id is
/// the table key itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Text payload.
    pub content: String,

    /// Insertion timestamp.
    pub created_at: Timestamp,
}

// ============================================================================
// Database Metadata
// ============================================================================

/// Database metadata stored under the key "db_metadata".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    /// Schema version for compatibility checking.
    pub schema_version: u32,

    /// Embedding dimension configured for this database.
    ///
    /// Once set, this cannot be changed without recreating the database.
    pub dimension: EmbeddingDimension,

    /// Timestamp when the database was created.
    pub created_at: Timestamp,

    /// Last time the database was opened (updated on each open).
    pub last_opened_at: Timestamp,
}

impl DatabaseMetadata {
    /// Creates new metadata for a fresh database.
    pub fn new(dimension: EmbeddingDimension) -> Self {
        let now = Timestamp::now();
        Self {
            schema_version: SCHEMA_VERSION,
            dimension,
            created_at: now,
            last_opened_at: now,
        }
    }

    /// Updates the last_opened_at timestamp.
    pub fn touch(&mut self) {
        self.last_opened_at = Timestamp::now();
    }

    /// Checks if this metadata is compatible with the current schema.
    pub fn is_compatible(&self) -> bool {
        self.schema_version == SCHEMA_VERSION
    }
}

// ============================================================================
// Vector Encoding Helpers
// ============================================================================

/// Encodes a vector as raw little-endian f32 bytes.
#[inline]
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for &v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decodes raw little-endian f32 bytes back into a vector.
///
/// Returns `None` if the byte length is not a multiple of 4.
#[inline]
pub fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
