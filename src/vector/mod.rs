//! Vector index abstractions for approximate nearest neighbor search.
//!
//! This module provides a trait-based abstraction over vector indexes so
//! the storage engine isn't hard-wired to a single ANN backend. The
//! production implementation uses [`hnsw_rs`] (pure Rust).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │         VectorIndex trait         │
//! └──────────┬───────────────────────┘
//!            │
//!    ┌───────┴────────┐
//!    │   HnswIndex    │  (hnsw_rs wrapper, DistL2)
//!    └────────────────┘
//! ```
//!
//! IDs are caller-assigned `usize` (the data node's dense `hnsw_id`
//! counter, see [`crate::node`]) rather than generated internally — the
//! KV store keyed by that same id space is the source of truth, and the
//! HNSW graph is a derived, rebuildable structure.

mod hnsw;

pub use hnsw::HnswIndex;

use std::path::Path;

use crate::error::Result;

/// Vector index trait for approximate nearest neighbor search.
///
/// Implementations must be `Send + Sync`. All mutating methods take
/// `&self` and use interior mutability, so reads (including concurrent
/// searches) are not blocked behind a single writer lock any longer than
/// necessary.
pub trait VectorIndex: Send + Sync {
    /// Inserts a single vector under a caller-assigned id.
    ///
    /// Ids are expected to be dense and assigned by a monotonic counter
    /// owned by the caller; this index does not allocate or reuse them.
    fn insert(&self, id: usize, embedding: &[f32]) -> Result<()>;

    /// Inserts a batch of vectors. More efficient than individual
    /// inserts for large batches (parallel insertion, single lock
    /// acquisition).
    fn insert_batch(&self, items: &[(&Vec<f32>, usize)]) -> Result<()>;

    /// Searches for the k nearest neighbors to the query vector.
    ///
    /// Returns `(id, distance)` pairs sorted by distance ascending
    /// (closest first). Distance metric is squared Euclidean (L2):
    /// 0.0 = identical.
    fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Result<Vec<(usize, f32)>>;

    /// Searches with a filter predicate applied during graph traversal
    /// (not post-filtering) so filtered-out points don't reduce the
    /// effective result count below `k` unnecessarily.
    ///
    /// The filter must implement `hnsw_rs::FilterT` (closures do
    /// automatically via blanket impl).
    fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
        filter: &(dyn Fn(&usize) -> bool + Sync),
    ) -> Result<Vec<(usize, f32)>>;

    /// Marks an id as deleted (soft-delete).
    ///
    /// The vector remains in the graph but is excluded from search
    /// results. HNSW graphs don't support point removal — removing
    /// nodes breaks proximity edges that other nodes rely on; a full
    /// rebuild is required to reclaim the space (see
    /// [`crate::node::DataNodeHandler::rebuild`]).
    fn delete(&self, id: usize) -> Result<()>;

    /// Returns true if the given id is marked as deleted.
    fn is_deleted(&self, id: usize) -> bool;

    /// Returns the number of active (non-deleted) vectors.
    fn len(&self) -> usize;

    /// Returns the total number of vectors ever inserted, including
    /// soft-deleted ones.
    fn total_count(&self) -> usize;

    /// Returns true if the index has no active vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persists index metadata to disk.
    fn save(&self, dir: &Path, name: &str) -> Result<()>;
}
