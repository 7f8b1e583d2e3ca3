//! # Proxima
//!
//! Embedded vector database with approximate nearest-neighbor search.
//!
//! Proxima stores text records alongside their embedding vectors in a
//! durable single-file store, and serves similarity queries through an
//! in-memory HNSW graph index rebuilt from the store on open.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use proxima::{Proxima, Config, MatchParams};
//!
//! // Open or create a database
//! let db = Proxima::open("./proxima.db", Config::default())?;
//!
//! // Insert records with pre-computed embeddings
//! db.insert_embedding("Always validate user input", &embedding_a)?;
//! db.insert_embedding("Prefer explicit error handling", &embedding_b)?;
//!
//! // Find records similar to a query embedding
//! let matches = db.match_embeddings(&query, &MatchParams::default())?;
//! for m in matches {
//!     println!("{} ({:.3}): {}", m.id, m.similarity, m.content);
//! }
//!
//! // Clean up
//! db.close()?;
//! ```
//!
//! ## Key Concepts
//!
//! ### Record
//!
//! A **record** pairs a content string with its embedding vector and a
//! creation timestamp. Records receive monotonically increasing u64 ids
//! starting at 1, with no gaps.
//!
//! ### Similarity
//!
//! Matching uses cosine similarity. A query returns records whose
//! similarity strictly exceeds the threshold (default 0.78), ranked
//! descending with ties broken by smaller id.
//!
//! ### Index
//!
//! The HNSW index is a derived structure: the record store is the
//! source of truth, and the graph is reconstructed from it on every
//! open. Search is approximate; construction and search beam widths are
//! tunable through [`HnswConfig`].
//!
//! ## Thread Safety
//!
//! `Proxima` is `Send + Sync` and can be shared across threads using
//! `Arc`. Storage uses MVCC for concurrent reads with exclusive write
//! locking; the index serializes writers behind a `RwLock`.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod db;
mod error;
mod record;
mod types;

pub mod storage;

mod search;

/// Vector index module for HNSW-based approximate nearest neighbor search.
pub mod vector;

// ============================================================================
// Public API re-exports
// ============================================================================

// Main database interface
pub use db::Proxima;

// Configuration
pub use config::{Config, EmbeddingDimension, HnswConfig};

// Error handling
pub use error::{NotFoundError, ProximaError, Result, StorageError, ValidationError};

// Core types
pub use record::EmbeddingRecord;
pub use types::{Embedding, RecordId, Timestamp};

// Search
pub use search::{MatchParams, SearchMatch, DEFAULT_COUNT, DEFAULT_THRESHOLD};

// Storage (for advanced users)
pub use storage::DatabaseMetadata;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common Proxima usage.
///
/// ```rust
/// use proxima::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{Config, EmbeddingDimension, HnswConfig};
    pub use crate::db::Proxima;
    pub use crate::error::{ProximaError, Result};
    pub use crate::record::EmbeddingRecord;
    pub use crate::search::{MatchParams, SearchMatch};
    pub use crate::types::{RecordId, Timestamp};
}
