//! Core type definitions for Proxima identifiers and timestamps.
//!
//! Record ids are small monotonically assigned integers rather than UUIDs:
//! the store allocates them gap-free from a persisted counter, and the HNSW
//! graph uses them directly as node identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Record identifier, assigned by the store at insertion time.
///
/// Ids are gap-free and strictly increasing across the lifetime of a
/// database. A failed insert never consumes an id. Ids are never reused.
///
/// # Example
/// ```
/// use proxima::RecordId;
///
/// let id = RecordId(1);
/// assert!(id < RecordId(2));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Returns the raw integer value.
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Creates a RecordId from a raw integer.
    #[inline]
    pub const fn from_u64(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in milliseconds.
///
/// Using i64 allows representing dates far into the future and past.
/// Millisecond precision is sufficient for insertion ordering; concurrent
/// inserts may share a timestamp (non-decreasing, not strictly increasing).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    ///
    /// If the system clock is before the Unix epoch (should never happen
    /// in practice), returns a timestamp of 0 (epoch) rather than panicking.
    #[inline]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as i64)
    }

    /// Creates a timestamp from Unix milliseconds.
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as Unix milliseconds.
    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Embedding vector type alias.
///
/// Embeddings are f32 vectors of fixed dimension (typically 384 or 768).
pub type Embedding = Vec<f32>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_ordering() {
        assert!(RecordId(1) < RecordId(2));
        assert!(RecordId(0) < RecordId(u64::MAX));
    }

    #[test]
    fn test_record_id_roundtrip() {
        let id = RecordId::from_u64(42);
        assert_eq!(id.as_u64(), 42);
        assert_eq!(format!("{}", id), "42");
    }

    #[test]
    fn test_record_id_serialization() {
        let id = RecordId(7);
        let bytes = bincode::serialize(&id).unwrap();
        let restored: RecordId = bincode::deserialize(&bytes).unwrap();
        assert_eq!(id, restored);
    }

    #[test]
    fn test_timestamp_now() {
        let t1 = Timestamp::now();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let t2 = Timestamp::now();
        assert!(t1 < t2, "Timestamps should be ordered");
    }

    #[test]
    fn test_timestamp_ordering() {
        let t1 = Timestamp::from_millis(1000);
        let t2 = Timestamp::from_millis(2000);
        assert!(t1 < t2);
    }

    #[test]
    fn test_timestamp_serialization() {
        let t = Timestamp::from_millis(1234567890);
        let bytes = bincode::serialize(&t).unwrap();
        let restored: Timestamp = bincode::deserialize(&bytes).unwrap();
        assert_eq!(t, restored);
    }
}
