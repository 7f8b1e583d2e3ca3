//! Query engine: similarity matching over the store and index.
//!
//! Translates a caller-facing similarity threshold into a distance
//! cutoff, over-fetches from the ANN index to compensate for the strict
//! post-filter, and joins surviving ids back to full records in the
//! store. Index entries with no backing record are dropped with a
//! warning rather than failing the query.

use tracing::{debug, warn};

use crate::config::HnswConfig;
use crate::error::{Result, ValidationError};
use crate::storage::StorageEngine;
use crate::types::RecordId;
use crate::vector::HnswIndex;

/// Default similarity threshold for matching.
pub const DEFAULT_THRESHOLD: f32 = 0.78;

/// Default number of matches returned.
pub const DEFAULT_COUNT: usize = 5;

/// Upper bound on the layer-0 beam width used for over-fetching.
const MAX_OVERFETCH_EF: usize = 256;

/// Parameters for a similarity match query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchParams {
    /// Minimum cosine similarity for a result to qualify, in `[0, 1]`.
    /// A candidate qualifies only if its similarity is strictly greater
    /// than this value.
    pub threshold: f32,
    /// Maximum number of matches to return. Must be greater than 0.
    pub count: usize,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            count: DEFAULT_COUNT,
        }
    }
}

impl MatchParams {
    /// Validates the parameters.
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(
                ValidationError::invalid_argument("count", "must be greater than 0").into(),
            );
        }
        if !(0.0..=1.0).contains(&self.threshold) || self.threshold.is_nan() {
            return Err(ValidationError::invalid_argument(
                "threshold",
                "must be within [0.0, 1.0]",
            )
            .into());
        }
        Ok(())
    }

    /// The distance cutoff equivalent to the similarity threshold.
    /// A candidate qualifies when `distance < max_distance`.
    #[inline]
    pub fn max_distance(&self) -> f32 {
        1.0 - self.threshold
    }
}

/// A single similarity match.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchMatch {
    /// Id of the matched record.
    pub id: RecordId,
    /// Stored content of the matched record.
    pub content: String,
    /// Cosine similarity to the query, in `(threshold, 1]` for well
    /// formed vectors.
    pub similarity: f32,
}

/// Runs a similarity match against the index and joins results with the
/// store.
///
/// Over-fetches four times the requested count from the index (capped)
/// so that the strict threshold filter still has enough survivors, then
/// keeps candidates with `distance < 1 - threshold`, resolves them to
/// records, and returns the top `count` ordered by descending
/// similarity with ties broken by smaller id.
pub(crate) fn match_embeddings(
    index: &HnswIndex,
    store: &dyn StorageEngine,
    config: &HnswConfig,
    query: &[f32],
    params: &MatchParams,
) -> Result<Vec<SearchMatch>> {
    params.validate()?;

    let fetch_k = params
        .count
        .max(params.count.saturating_mul(4).min(MAX_OVERFETCH_EF));
    let ef = config.ef_search.max(fetch_k).min(MAX_OVERFETCH_EF);

    let candidates = index.search(query, fetch_k, ef)?;

    let max_distance = params.max_distance();
    let qualified: Vec<(RecordId, f32)> = candidates
        .into_iter()
        .filter(|&(_, distance)| distance < max_distance)
        .collect();

    debug!(
        candidates = qualified.len(),
        max_distance, "Threshold filter applied"
    );

    if qualified.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<RecordId> = qualified.iter().map(|&(id, _)| id).collect();
    let mut records = store.fetch_records(&ids)?;

    let mut matches = Vec::with_capacity(qualified.len());
    for (id, distance) in qualified {
        match records.remove(&id) {
            Some(record) => matches.push(SearchMatch {
                id,
                content: record.content,
                similarity: 1.0 - distance,
            }),
            None => {
                // Index and store drifted; skip the orphan rather than
                // failing the whole query
                warn!(id = %id, "Indexed record missing from store, dropping from results");
            }
        }
    }

    matches.truncate(params.count);
    Ok(matches)
}
