//! Vector similarity primitives.
//!
//! Two pieces: the [`cosine_distance`] function used everywhere a
//! similarity score is needed, and the [`HnswIndex`] approximate
//! nearest-neighbor graph built over the record store.

pub mod distance;
pub mod hnsw;

pub use distance::{cosine_distance, is_degenerate};
pub use hnsw::HnswIndex;
