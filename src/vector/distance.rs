//! Cosine distance between embedding vectors.
//!
//! The distance function is the leaf dependency of the whole engine:
//! graph construction and search ranking both flow through it, so it
//! must be deterministic and exactly symmetric. The accumulation order
//! is identical regardless of argument order (f32 multiplication is
//! commutative), so `cosine_distance(a, b) == cosine_distance(b, a)`
//! bit-for-bit.

use crate::error::{Result, ValidationError};

/// Computes cosine distance: `1 - dot(a, b) / (|a| * |b|)`.
///
/// The result lies in `[0, 2]`: 0 for identical direction, 1 for
/// orthogonal, 2 for opposite.
///
/// # Errors
///
/// - `ValidationError::DimensionMismatch` if the vectors differ in length
/// - `ValidationError::DegenerateVector` if either vector has zero
///   magnitude (cosine is undefined)
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(ValidationError::dimension_mismatch(a.len(), b.len()).into());
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(ValidationError::DegenerateVector.into());
    }

    Ok(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Returns true if the vector has zero magnitude.
///
/// Uses the same f32 sum-of-squares arithmetic as [`cosine_distance`],
/// so tiny components whose squares underflow to 0.0 count as
/// degenerate here too. Used to reject such vectors at insert time,
/// before they can poison graph construction.
#[inline]
pub fn is_degenerate(v: &[f32]) -> bool {
    v.iter().map(|&x| x * x).sum::<f32>() == 0.0
}
