//! Integration tests for similarity matching.
//!
//! Exercises the full path: insert through the public API, then query
//! with `match_embeddings` and check ranking, threshold filtering, and
//! edge-case behavior.

use proxima::{
    Config, EmbeddingDimension, HnswConfig, MatchParams, Proxima, ProximaError, RecordId,
    ValidationError,
};
use tempfile::tempdir;

fn open_db(dir: &tempfile::TempDir, dim: usize) -> Proxima {
    let config = Config {
        dimension: EmbeddingDimension::Custom(dim),
        hnsw: HnswConfig {
            level_seed: Some(7),
            ..Default::default()
        },
    };
    Proxima::open(dir.path().join("test.db"), config).unwrap()
}

/// Deterministic pseudo-embedding with a dominant direction per seed.
fn make_vector(seed: u64, dim: usize) -> Vec<f32> {
    (0..dim)
        .map(|i| (seed as f32 * 0.37 + i as f32 * 0.11).sin())
        .collect()
}

#[test]
fn test_orthogonal_vectors_scenario() {
    // Three records: aligned, orthogonal, and diagonal relative to the
    // query direction
    let dir = tempdir().unwrap();
    let db = open_db(&dir, 2);

    let aligned = db.insert_embedding("aligned", &[1.0, 0.0]).unwrap();
    let orthogonal = db.insert_embedding("orthogonal", &[0.0, 1.0]).unwrap();
    let diagonal = db.insert_embedding("diagonal", &[1.0, 1.0]).unwrap();

    // Default threshold 0.78: only the aligned record qualifies.
    // The diagonal one sits at similarity ~0.707, below the cutoff.
    let matches = db
        .match_embeddings(&[1.0, 0.0], &MatchParams::default())
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, aligned);
    assert_eq!(matches[0].content, "aligned");
    assert!(matches[0].similarity > 0.999);

    // Lowering the threshold admits the diagonal record, ranked second
    let matches = db
        .match_embeddings(
            &[1.0, 0.0],
            &MatchParams {
                threshold: 0.5,
                count: 2,
            },
        )
        .unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, aligned);
    assert_eq!(matches[1].id, diagonal);
    assert!((matches[1].similarity - 0.7071).abs() < 1e-3);

    // The orthogonal record never qualifies at a positive threshold
    assert!(matches.iter().all(|m| m.id != orthogonal));
}

#[test]
fn test_empty_database_returns_no_matches() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir, 4);

    let matches = db
        .match_embeddings(&[1.0, 0.0, 0.0, 0.0], &MatchParams::default())
        .unwrap();
    assert!(matches.is_empty());
}

#[test]
fn test_count_zero_is_rejected() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir, 4);
    db.insert_embedding("a", &[1.0, 0.0, 0.0, 0.0]).unwrap();

    let err = db
        .match_embeddings(
            &[1.0, 0.0, 0.0, 0.0],
            &MatchParams {
                threshold: 0.5,
                count: 0,
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ProximaError::Validation(ValidationError::InvalidArgument { .. })
    ));
}

#[test]
fn test_threshold_out_of_range_is_rejected() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir, 4);

    let err = db
        .match_embeddings(
            &[1.0, 0.0, 0.0, 0.0],
            &MatchParams {
                threshold: 1.5,
                count: 5,
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ProximaError::Validation(ValidationError::InvalidArgument { .. })
    ));
}

#[test]
fn test_query_dimension_mismatch() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir, 4);
    db.insert_embedding("a", &[1.0, 0.0, 0.0, 0.0]).unwrap();

    let err = db
        .match_embeddings(&[1.0, 0.0], &MatchParams::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ProximaError::Validation(ValidationError::DimensionMismatch { expected: 4, got: 2 })
    ));
}

#[test]
fn test_degenerate_query_is_rejected() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir, 4);
    db.insert_embedding("a", &[1.0, 0.0, 0.0, 0.0]).unwrap();

    let err = db
        .match_embeddings(&[0.0; 4], &MatchParams::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ProximaError::Validation(ValidationError::DegenerateVector)
    ));
}

#[test]
fn test_count_limits_results() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir, 4);

    // Ten records all close to the query direction
    for i in 0..10 {
        let v = [1.0, 0.01 * i as f32, 0.0, 0.0];
        db.insert_embedding(&format!("record-{}", i), &v).unwrap();
    }

    let matches = db
        .match_embeddings(
            &[1.0, 0.0, 0.0, 0.0],
            &MatchParams {
                threshold: 0.9,
                count: 3,
            },
        )
        .unwrap();
    assert_eq!(matches.len(), 3);

    // Descending similarity order
    for w in matches.windows(2) {
        assert!(w[0].similarity >= w[1].similarity);
    }
}

#[test]
fn test_identical_vectors_tie_break_by_smaller_id() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir, 4);

    let v = [0.3, 0.7, -0.2, 0.5];
    let first = db.insert_embedding("copy-a", &v).unwrap();
    let second = db.insert_embedding("copy-b", &v).unwrap();
    assert!(first < second);

    let matches = db
        .match_embeddings(
            &v,
            &MatchParams {
                threshold: 0.9,
                count: 2,
            },
        )
        .unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, first);
    assert_eq!(matches[1].id, second);
}

#[test]
fn test_search_is_idempotent() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir, 8);

    for i in 0..50u64 {
        db.insert_embedding(&format!("record-{}", i), &make_vector(i, 8))
            .unwrap();
    }

    let query = make_vector(23, 8);
    let params = MatchParams {
        threshold: 0.3,
        count: 10,
    };
    let first = db.match_embeddings(&query, &params).unwrap();
    for _ in 0..3 {
        assert_eq!(db.match_embeddings(&query, &params).unwrap(), first);
    }
}

#[test]
fn test_no_qualifying_matches_returns_empty() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir, 2);

    db.insert_embedding("east", &[1.0, 0.0]).unwrap();

    // Query pointing the opposite way: similarity -1, far below any
    // non-negative threshold
    let matches = db
        .match_embeddings(&[-1.0, 0.0], &MatchParams::default())
        .unwrap();
    assert!(matches.is_empty());
}

#[test]
fn test_match_results_carry_content() {
    let dir = tempdir().unwrap();
    let db = open_db(&dir, 4);

    let id = db
        .insert_embedding("the quick brown fox", &[0.1, 0.9, 0.2, 0.0])
        .unwrap();
    assert_eq!(id, RecordId(1));

    let matches = db
        .match_embeddings(&[0.1, 0.9, 0.2, 0.0], &MatchParams::default())
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].content, "the quick brown fox");
}
