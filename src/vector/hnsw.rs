//! HNSW vector index implementation using hnsw_rs.
//!
//! Wraps `hnsw_rs::Hnsw<f32, DistL2>` with:
//! - Caller-assigned `usize` ids (no internal id remapping layer)
//! - Soft-delete via `HashSet` + filtered search
//! - JSON metadata persistence (`.hnsw.meta`)
//!
//! # Thread Safety
//!
//! The `hnsw_rs::Hnsw` graph uses an internal lock, so `insert()` takes
//! `&self`. The tombstone set is protected by a `std::sync::RwLock`.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use hnsw_rs::prelude::*;

use crate::config::HnswConfig;
use crate::error::{MeshError, Result};

use super::VectorIndex;

/// Newtype wrapper that bridges `&dyn Fn(&usize) -> bool` to `FilterT`.
///
/// Rust's blanket impl `impl<F: Fn(&DataId) -> bool> FilterT for F` only
/// works for concrete types. When we have a `&dyn Fn` trait object (from
/// the `VectorIndex` trait's `search_filtered` method), we can't coerce
/// it to `&dyn FilterT` directly. This wrapper implements `FilterT` by
/// delegating to the wrapped closure trait object.
struct FilterBridge<'a>(&'a (dyn Fn(&usize) -> bool + Sync));

impl FilterT for FilterBridge<'_> {
    fn hnsw_filter(&self, id: &DataId) -> bool {
        (self.0)(id)
    }
}

/// HNSW vector index backed by `hnsw_rs`.
///
/// Each data node owns one `HnswIndex` for its shard's local vectors.
///
/// # Persistence Strategy
///
/// Tombstones are persisted to a JSON `.hnsw.meta` sidecar. The graph
/// itself is rebuilt from the KV store's embeddings on open, because
/// `hnsw_rs::HnswIo::load_hnsw` has lifetime constraints that create
/// self-referential struct issues. The graph dump files (via
/// `file_dump`) are saved for future optimization but not currently
/// loaded back.
pub struct HnswIndex {
    /// The underlying HNSW graph. Uses `'static` lifetime because all
    /// data is heap-owned (not memory-mapped).
    hnsw: Hnsw<'static, f32, DistL2>,

    /// Soft-deleted ids, excluded from search.
    deleted: RwLock<HashSet<usize>>,

    /// Immutable configuration (used during save/rebuild lifecycle).
    #[allow(dead_code)]
    config: HnswConfig,

    /// Embedding dimension (must match all inserted vectors).
    dimension: usize,
}

/// Serializable metadata for persistence.
#[derive(serde::Serialize, serde::Deserialize)]
pub(crate) struct IndexMetadata {
    pub(crate) dimension: usize,
    pub(crate) deleted: Vec<usize>,
}

impl HnswIndex {
    /// Creates a new empty HNSW index.
    ///
    /// # Arguments
    /// * `dimension` - Expected embedding dimension (validated on insert)
    /// * `config` - HNSW tuning parameters
    pub fn new(dimension: usize, config: &HnswConfig) -> Self {
        let hnsw = Hnsw::new(
            config.max_nb_connection,
            config.max_elements,
            config.max_layer,
            config.ef_construction,
            DistL2 {},
        );

        Self {
            hnsw,
            deleted: RwLock::new(HashSet::new()),
            config: config.clone(),
            dimension,
        }
    }

    /// Restores the tombstone set from persisted metadata.
    ///
    /// Called after rebuilding the graph from the KV store.
    pub fn restore_deleted_set(&self, deleted_ids: &[usize]) -> Result<()> {
        let mut deleted = self
            .deleted
            .write()
            .map_err(|_| MeshError::index("index state lock poisoned"))?;
        deleted.extend(deleted_ids.iter().copied());
        Ok(())
    }

    /// Saves index metadata (tombstones) to a JSON file.
    ///
    /// Creates `{dir}/{name}.hnsw.meta`. Also attempts to save the HNSW
    /// graph via `file_dump` for future optimization (graph loading is
    /// not currently implemented due to lifetime constraints in
    /// hnsw_rs).
    pub fn save_to_dir(&self, dir: &Path, name: &str) -> Result<()> {
        fs::create_dir_all(dir)
            .map_err(|e| MeshError::index(format!("failed to create HNSW directory: {}", e)))?;

        let deleted = self
            .deleted
            .read()
            .map_err(|_| MeshError::index("index state lock poisoned"))?;

        let metadata = IndexMetadata {
            dimension: self.dimension,
            deleted: deleted.iter().copied().collect(),
        };

        let meta_path = dir.join(format!("{}.hnsw.meta", name));
        let json = serde_json::to_string_pretty(&metadata)
            .map_err(|e| MeshError::index(format!("failed to serialize HNSW metadata: {}", e)))?;
        fs::write(&meta_path, json)
            .map_err(|e| MeshError::index(format!("failed to write HNSW metadata: {}", e)))?;

        if self.hnsw.get_nb_point() == 0 {
            return Ok(());
        }

        if let Err(e) = self.hnsw.file_dump(dir, name) {
            tracing::warn!(error = %e, "failed to dump HNSW graph (non-fatal, will rebuild on next open)");
        }

        Ok(())
    }

    /// Loads persisted metadata (tombstones) for an index, if present.
    pub fn load_metadata(dir: &Path, name: &str) -> Result<Option<IndexMetadata>> {
        let meta_path = dir.join(format!("{}.hnsw.meta", name));
        if !meta_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&meta_path)
            .map_err(|e| MeshError::index(format!("failed to read HNSW metadata: {}", e)))?;
        let metadata: IndexMetadata = serde_json::from_str(&json)
            .map_err(|e| MeshError::index(format!("failed to parse HNSW metadata: {}", e)))?;

        Ok(Some(metadata))
    }

    /// Rebuilds an index from a set of `(id, embedding)` pairs.
    ///
    /// Used by [`crate::node::DataNodeHandler::rebuild`] to reconstruct
    /// the HNSW graph from embeddings stored in the KV store (the
    /// source of truth), discarding tombstones entirely since a rebuild
    /// physically removes deleted vectors.
    pub fn rebuild_from_embeddings(
        dimension: usize,
        config: &HnswConfig,
        embeddings: Vec<(usize, Vec<f32>)>,
    ) -> Result<Self> {
        let index = Self::new(dimension, config);

        if embeddings.is_empty() {
            return Ok(index);
        }

        let batch: Vec<(&Vec<f32>, usize)> = embeddings.iter().map(|(id, v)| (v, *id)).collect();
        index.hnsw.parallel_insert(&batch);

        Ok(index)
    }

    /// Removes HNSW files for an index from disk.
    pub fn remove_files(dir: &Path, name: &str) -> Result<()> {
        let meta_path = dir.join(format!("{}.hnsw.meta", name));
        if meta_path.exists() {
            fs::remove_file(&meta_path)
                .map_err(|e| MeshError::index(format!("failed to remove HNSW metadata: {}", e)))?;
        }

        if let Ok(entries) = fs::read_dir(dir) {
            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let file_str = file_name.to_string_lossy();
                if file_str.starts_with(name) && file_str.contains("hnswdump") {
                    let _ = fs::remove_file(entry.path());
                }
            }
        }

        Ok(())
    }
}

impl VectorIndex for HnswIndex {
    fn insert(&self, id: usize, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(MeshError::index(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        self.hnsw.insert((embedding, id));
        Ok(())
    }

    fn insert_batch(&self, items: &[(&Vec<f32>, usize)]) -> Result<()> {
        self.hnsw.parallel_insert(items);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Result<Vec<(usize, f32)>> {
        let deleted = self
            .deleted
            .read()
            .map_err(|_| MeshError::index("index state lock poisoned"))?;
        let results = if deleted.is_empty() {
            self.hnsw.search(query, k, ef_search)
        } else {
            let filter_fn = |id: &usize| -> bool { !deleted.contains(id) };
            self.hnsw.search_filter(query, k, ef_search, Some(&filter_fn))
        };
        Ok(results.into_iter().map(|n| (n.d_id, n.distance)).collect())
    }

    fn search_filtered(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
        filter: &(dyn Fn(&usize) -> bool + Sync),
    ) -> Result<Vec<(usize, f32)>> {
        let bridge = FilterBridge(filter);
        let results = self.hnsw.search_filter(query, k, ef_search, Some(&bridge));
        Ok(results.into_iter().map(|n| (n.d_id, n.distance)).collect())
    }

    fn delete(&self, id: usize) -> Result<()> {
        let mut deleted = self
            .deleted
            .write()
            .map_err(|_| MeshError::index("index state lock poisoned"))?;
        deleted.insert(id);
        Ok(())
    }

    fn is_deleted(&self, id: usize) -> bool {
        self.deleted.read().ok().is_some_and(|d| d.contains(&id))
    }

    fn len(&self) -> usize {
        let total = self.hnsw.get_nb_point();
        let deleted = self.deleted.read().map(|d| d.len()).unwrap_or(0);
        total.saturating_sub(deleted)
    }

    fn total_count(&self) -> usize {
        self.hnsw.get_nb_point()
    }

    fn save(&self, dir: &Path, name: &str) -> Result<()> {
        self.save_to_dir(dir, name)
    }
}
