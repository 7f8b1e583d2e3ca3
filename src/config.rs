//! Configuration types for Proxima.
//!
//! The [`Config`] struct controls database behavior:
//! - Embedding dimension (384, 768, or custom)
//! - HNSW graph tuning parameters
//!
//! # Example
//! ```rust
//! use proxima::{Config, EmbeddingDimension};
//!
//! // Use defaults (384 dimensions)
//! let config = Config::default();
//!
//! // Customize for a different embedding model
//! let config = Config {
//!     dimension: EmbeddingDimension::Custom(1536),
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Database configuration options.
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use proxima::{Config, HnswConfig};
///
/// let config = Config {
///     hnsw: HnswConfig {
///         ef_search: 100,
///         ..Default::default()
///     },
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Embedding vector dimension. Locked at database creation;
    /// reopening with a different dimension is rejected.
    pub dimension: EmbeddingDimension,

    /// HNSW index tuning parameters.
    pub hnsw: HnswConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // 384 matches all-MiniLM-L6-v2, the most common small encoder
            dimension: EmbeddingDimension::D384,
            hnsw: HnswConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// Called automatically by `Proxima::open()`. You can also call this
    /// explicitly to check configuration before attempting to open.
    ///
    /// # Errors
    /// Returns `ValidationError` if:
    /// - Custom dimension is 0 or > 4096
    /// - `m` is less than 2
    /// - `ef_construction` or `ef_search` is 0
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let EmbeddingDimension::Custom(dim) = self.dimension {
            if dim == 0 {
                return Err(ValidationError::invalid_argument(
                    "dimension",
                    "custom dimension must be greater than 0",
                ));
            }
            if dim > 4096 {
                return Err(ValidationError::invalid_argument(
                    "dimension",
                    "custom dimension must not exceed 4096",
                ));
            }
        }

        self.hnsw.validate()
    }

    /// Returns the embedding dimension as a numeric value.
    pub fn dimension(&self) -> usize {
        self.dimension.size()
    }
}

/// Embedding vector dimensions.
///
/// Standard dimensions are provided for common models. Use `Custom` for
/// other embedding services.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingDimension {
    /// 384 dimensions (all-MiniLM-L6-v2).
    #[default]
    D384,

    /// 768 dimensions (bge-base-en-v1.5, BERT-base).
    D768,

    /// Custom dimension for other embedding models.
    ///
    /// Must be between 1 and 4096.
    Custom(usize),
}

impl EmbeddingDimension {
    /// Returns the numeric size of this dimension.
    ///
    /// # Example
    /// ```rust
    /// use proxima::EmbeddingDimension;
    ///
    /// assert_eq!(EmbeddingDimension::D384.size(), 384);
    /// assert_eq!(EmbeddingDimension::D768.size(), 768);
    /// assert_eq!(EmbeddingDimension::Custom(1536).size(), 1536);
    /// ```
    #[inline]
    pub const fn size(&self) -> usize {
        match self {
            Self::D384 => 384,
            Self::D768 => 768,
            Self::Custom(n) => *n,
        }
    }
}

/// HNSW graph tuning parameters.
///
/// Defaults balance recall and construction cost for stores up to a few
/// hundred thousand vectors. Higher `ef_construction` and `ef_search`
/// improve recall at the cost of insert/search latency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Maximum neighbors per node per layer. Layer 0 permits `2 * m`.
    pub m: usize,

    /// Beam width used while linking a new node into the graph.
    pub ef_construction: usize,

    /// Default beam width for search when the caller doesn't override it.
    pub ef_search: usize,

    /// Hard cap on the node's highest layer.
    pub max_layer: usize,

    /// Cap on candidates visited during a single layer-0 beam search.
    /// Guarantees termination independent of graph pathology.
    pub max_visited: usize,

    /// Seed for the layer-assignment RNG. `None` seeds from entropy;
    /// setting a value makes graph construction fully deterministic.
    pub level_seed: Option<u64>,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 100,
            ef_search: 50,
            max_layer: 16,
            max_visited: 10_000,
            level_seed: None,
        }
    }
}

impl HnswConfig {
    /// Validates the HNSW parameters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.m < 2 {
            return Err(ValidationError::invalid_argument(
                "hnsw.m",
                "must be at least 2",
            ));
        }
        if self.ef_construction == 0 {
            return Err(ValidationError::invalid_argument(
                "hnsw.ef_construction",
                "must be greater than 0",
            ));
        }
        if self.ef_search == 0 {
            return Err(ValidationError::invalid_argument(
                "hnsw.ef_search",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Level probability for random layer assignment: `1 / ln(m)`.
    ///
    /// Produces exponential decay so layer `l+1` holds roughly this
    /// fraction of layer `l`'s nodes, mirroring skip-list levels.
    #[inline]
    pub fn level_probability(&self) -> f64 {
        1.0 / (self.m as f64).ln()
    }

    /// Neighbor capacity at the given layer (`2 * m` at layer 0).
    #[inline]
    pub const fn max_neighbors(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m * 2
        } else {
            self.m
        }
    }
}
