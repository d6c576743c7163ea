//! Black-box coverage of the literal single-node end-to-end scenarios:
//! a fresh PUT/SEARCH, an overwrite, and a delete, all driven purely
//! through `DataNodeHandler`'s public API.

use meshvec::{Config, DataNodeHandler, VectorRecord};
use tempfile::tempdir;

fn open_node() -> (tempfile::TempDir, DataNodeHandler) {
    let dir = tempdir().unwrap();
    let config = Config {
        dimension: 4,
        shard_count: 1,
        ..Default::default()
    };
    let handler = DataNodeHandler::open(dir.path(), config).unwrap();
    (dir, handler)
}

#[test]
fn scenario_1_search_returns_closest_key() {
    let (_dir, handler) = open_node();

    let mut meta = std::collections::HashMap::new();
    meta.insert("t".to_string(), "x".to_string());
    handler
        .put(VectorRecord::new("a", vec![1.0, 0.0, 0.0, 0.0]).with_metadata(meta))
        .unwrap();

    let mut meta2 = std::collections::HashMap::new();
    meta2.insert("t".to_string(), "y".to_string());
    handler
        .put(VectorRecord::new("b", vec![0.0, 1.0, 0.0, 0.0]).with_metadata(meta2))
        .unwrap();

    let results = handler
        .search(&[1.0, 0.0, 0.0, 0.0], 1, None, None)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0.key, "a");
}

#[test]
fn scenario_2_overwrite_changes_vector_and_search_order() {
    let (_dir, handler) = open_node();

    handler
        .put(VectorRecord::new("a", vec![1.0, 0.0, 0.0, 0.0]))
        .unwrap();
    handler
        .put(VectorRecord::new("a", vec![0.0, 0.0, 0.0, 1.0]))
        .unwrap();

    let record = handler.get("a").unwrap();
    assert_eq!(record.vector, vec![0.0, 0.0, 0.0, 1.0]);

    // With no other record present, a search for the old vector still
    // returns "a" (the only record), but at its new, farther distance.
    let results = handler
        .search(&[1.0, 0.0, 0.0, 0.0], 1, None, None)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0.key, "a");
    assert!(results[0].1 > 1.9 && results[0].1 < 2.1);
}

#[test]
fn scenario_3_delete_removes_from_get_and_search() {
    let (_dir, handler) = open_node();

    handler
        .put(VectorRecord::new("a", vec![1.0, 0.0, 0.0, 0.0]))
        .unwrap();
    handler
        .put(VectorRecord::new("b", vec![0.0, 1.0, 0.0, 0.0]))
        .unwrap();
    handler.delete("a").unwrap();

    let err = handler.get("a").unwrap_err();
    assert!(err.is_not_found());

    let results = handler
        .search(&[1.0, 0.0, 0.0, 0.0], 5, None, None)
        .unwrap();
    assert!(results.iter().all(|(record, _)| record.key != "a"));
}

#[test]
fn boundary_search_on_empty_index_returns_empty() {
    let (_dir, handler) = open_node();
    let results = handler.search(&[0.0, 0.0, 0.0, 0.0], 10, None, None).unwrap();
    assert!(results.is_empty());
}

#[test]
fn boundary_search_top_k_larger_than_live_count_is_clamped() {
    let (_dir, handler) = open_node();
    handler
        .put(VectorRecord::new("a", vec![1.0, 0.0, 0.0, 0.0]))
        .unwrap();
    handler
        .put(VectorRecord::new("b", vec![0.0, 1.0, 0.0, 0.0]))
        .unwrap();

    let results = handler
        .search(&[0.0, 0.0, 0.0, 0.0], 50, None, None)
        .unwrap();
    assert_eq!(results.len(), 2);
    // Ascending by distance.
    assert!(results[0].1 <= results[1].1);
}

#[test]
fn boundary_search_after_mass_delete_returns_one_result() {
    let (_dir, handler) = open_node();
    for (key, v) in [
        ("a", [1.0, 0.0, 0.0, 0.0]),
        ("b", [0.0, 1.0, 0.0, 0.0]),
        ("c", [0.0, 0.0, 1.0, 0.0]),
    ] {
        handler.put(VectorRecord::new(key, v.to_vec())).unwrap();
    }
    handler.delete("a").unwrap();
    handler.delete("b").unwrap();

    let results = handler
        .search(&[0.0, 0.0, 0.0, 1.0], 10, None, None)
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0.key, "c");
}

#[test]
fn search_threshold_drops_far_candidates() {
    let (_dir, handler) = open_node();
    handler
        .put(VectorRecord::new("near", vec![1.0, 0.0, 0.0, 0.0]))
        .unwrap();
    handler
        .put(VectorRecord::new("far", vec![0.0, 0.0, 0.0, 1.0]))
        .unwrap();

    let results = handler
        .search(&[1.0, 0.0, 0.0, 0.0], 10, None, Some(0.5))
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0.key, "near");
}

#[test]
fn wrong_dimension_put_is_rejected() {
    let (_dir, handler) = open_node();
    let err = handler
        .put(VectorRecord::new("a", vec![1.0, 0.0]))
        .unwrap_err();
    assert!(err.is_invalid_input());
}
