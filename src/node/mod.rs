//! Data node handler: the per-shard storage engine.
//!
//! A [`DataNodeHandler`] owns one shard's worth of vectors end to end:
//! the HNSW index, the durable KV store, the write-ahead log, and
//! periodic checkpointing. It exposes PUT/DELETE/GET/SEARCH and the
//! maintenance operations (`rebuild`, `snapshot`) that keep the HNSW
//! graph and on-disk footprint bounded over a long write history.
//!
//! # State machine
//!
//! ```text
//! Loading -> Ready -> (Rebuilding -> Ready)* -> ShuttingDown
//! ```
//!
//! All mutable state (the HNSW graph, id bookkeeping, status) lives
//! behind a single non-reentrant [`std::sync::Mutex`]. Internal helpers
//! that need to recurse into another operation (e.g. a PUT that
//! triggers a rebuild) take `&mut HandlerState` directly instead of
//! re-locking, since `std::sync::Mutex` is not reentrant.
//!
//! # Directory layout
//!
//! ```text
//! <node_dir>/
//!   .lock          <- fs2 advisory exclusive lock, held for the handler's life
//!   kv.redb        <- KvStore file (source of truth for vector records)
//!   wal/           <- write-ahead log segments
//!   checkpoint/    <- sealed checkpoint directories
//! ```

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use tracing::{info, instrument, warn};

use crate::config::{Config, HnswConfig};
use crate::error::{MeshError, NotFoundError, Result};
use crate::filter::SearchFilter;
use crate::kv::{open_kv, KvEntry, KvStore};
use crate::record::VectorRecord;
use crate::snapshot::SnapshotManager;
use crate::types::{HnswId, Timestamp};
use crate::vector::{HnswIndex, VectorIndex};
use crate::wal::{WalEntry, WalManager, WalOp};

/// Lifecycle status of a [`DataNodeHandler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeStatus {
    /// Restoring from checkpoint/WAL; requests are rejected.
    Loading,
    /// Serving PUT/DELETE/GET/SEARCH.
    Ready,
    /// A full HNSW rebuild is in progress; requests are rejected.
    Rebuilding,
    /// Draining for shutdown; requests are rejected.
    ShuttingDown,
}

/// All mutable handler state, behind one lock.
struct HandlerState {
    status: NodeStatus,
    hnsw: HnswIndex,
    key_to_hnsw_id: HashMap<String, HnswId>,
    hnsw_id_to_key: HashMap<HnswId, String>,
    next_hnsw_id: HnswId,
    put_count: u64,
}

/// The per-shard data node handler.
pub struct DataNodeHandler {
    dir: PathBuf,
    config: Config,
    kv: Box<dyn KvStore>,
    wal: WalManager,
    snapshot: SnapshotManager,
    state: Mutex<HandlerState>,
    _lock_file: File,
}

impl DataNodeHandler {
    /// Opens (or creates) a data node at `dir`, restoring from the
    /// latest checkpoint and replaying any WAL entries written since.
    ///
    /// Takes an exclusive advisory lock on `<dir>/.lock` for the life of
    /// the returned handler, enforcing the single-writer-per-directory
    /// invariant; a second `open()` on the same directory fails with
    /// `MeshError::Unavailable`.
    #[instrument(skip(config), fields(dir = %dir.as_ref().display()))]
    pub fn open(dir: impl AsRef<Path>, config: Config) -> Result<Self> {
        config.validate()?;
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(dir.join(".lock"))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| MeshError::unavailable("node directory is locked by another writer"))?;

        let kv_path = dir.join("kv.redb");
        let wal = WalManager::open(dir.join("wal"), config.wal.clone())?;
        let snapshot = SnapshotManager::new(dir.join("checkpoint"), config.snapshot_retain)?;

        let (kv, mut state) = Self::restore(&dir, &kv_path, &config, &snapshot, &wal)?;

        state.status = NodeStatus::Ready;
        info!(active = state.hnsw.len(), "data node ready");

        Ok(Self {
            dir,
            config,
            kv,
            wal,
            snapshot,
            state: Mutex::new(state),
            _lock_file: lock_file,
        })
    }

    fn restore(
        dir: &Path,
        kv_path: &Path,
        config: &Config,
        snapshot: &SnapshotManager,
        wal: &WalManager,
    ) -> Result<(Box<dyn KvStore>, HandlerState)> {
        let checkpoint = snapshot.load_latest()?;

        let deleted_from_checkpoint: Vec<HnswId> = if let Some(handle) = &checkpoint {
            if handle.kv_path().exists() {
                fs::copy(handle.kv_path(), kv_path)?;
            }
            HnswIndex::load_metadata(&handle.dir, "index")?
                .map(|m| m.deleted)
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let kv = open_kv(kv_path)?;
        let entries = kv.list_all()?;

        let headroom_config = HnswConfig {
            max_elements: entries.len() + config.rebuild_headroom,
            ..config.hnsw.clone()
        };
        let items: Vec<(HnswId, Vec<f32>)> = entries
            .iter()
            .map(|e| (e.hnsw_id, e.record.vector.clone()))
            .collect();
        let hnsw = HnswIndex::rebuild_from_embeddings(config.dimension, &headroom_config, items)?;
        hnsw.restore_deleted_set(&deleted_from_checkpoint)?;

        let key_to_hnsw_id: HashMap<String, HnswId> = entries
            .iter()
            .map(|e| (e.record.key.clone(), e.hnsw_id))
            .collect();
        let hnsw_id_to_key: HashMap<HnswId, String> = entries
            .iter()
            .map(|e| (e.hnsw_id, e.record.key.clone()))
            .collect();
        // Tombstoned ids are absent from `entries` (KV only holds live
        // records), so the live max alone would let a fresh PUT reuse an id
        // that's still in the restored deleted set, landing the new record
        // in a soft-deleted slot.
        let next_hnsw_id = entries
            .iter()
            .map(|e| e.hnsw_id)
            .chain(deleted_from_checkpoint.iter().copied())
            .map(|id| id + 1)
            .max()
            .unwrap_or(0);

        let mut state = HandlerState {
            status: NodeStatus::Loading,
            hnsw,
            key_to_hnsw_id,
            hnsw_id_to_key,
            next_hnsw_id,
            put_count: 0,
        };

        let replay = match &checkpoint {
            Some(handle) => wal.replay_since(handle.wal_cursor)?,
            None => wal.replay_all()?,
        };
        for entry in replay {
            Self::apply_replayed(&mut state, &kv, entry)?;
        }

        Ok((kv, state))
    }

    fn apply_replayed(
        state: &mut HandlerState,
        kv: &Box<dyn KvStore>,
        entry: WalEntry,
    ) -> Result<()> {
        match entry.op {
            WalOp::Put { mut record } => {
                record.timestamp = entry.timestamp;
                if let Some(&old_id) = state.key_to_hnsw_id.get(&record.key) {
                    state.hnsw.delete(old_id)?;
                    state.hnsw_id_to_key.remove(&old_id);
                }
                let id = state.next_hnsw_id;
                state.hnsw.insert(id, &record.vector)?;
                state.next_hnsw_id += 1;
                state.key_to_hnsw_id.insert(record.key.clone(), id);
                state.hnsw_id_to_key.insert(id, record.key.clone());
                kv.put(&KvEntry { hnsw_id: id, record })?;
            }
            WalOp::Delete { key } => {
                if let Some(id) = state.key_to_hnsw_id.remove(&key) {
                    state.hnsw.delete(id)?;
                    state.hnsw_id_to_key.remove(&id);
                }
                kv.delete(&key)?;
            }
        }
        Ok(())
    }

    /// Inserts or overwrites a vector record.
    ///
    /// Validates the record's dimension before acquiring any lock.
    /// Triggers an HNSW rebuild if the graph is at capacity (growing it
    /// with headroom), and again every `rebuild_interval` successful
    /// PUTs; triggers a checkpoint every `snapshot_interval` PUTs.
    #[instrument(skip(self, record), fields(key = %record.key))]
    pub fn put(&self, record: VectorRecord) -> Result<()> {
        record.validate(self.config.dimension)?;

        let mut state = self.lock_ready()?;

        if state.hnsw.total_count() >= self.config.hnsw.max_elements {
            self.rebuild_locked(&mut state)?;
        }

        if let Some(&old_id) = state.key_to_hnsw_id.get(&record.key) {
            state.hnsw.delete(old_id)?;
            state.hnsw_id_to_key.remove(&old_id);
        }

        let id = state.next_hnsw_id;
        match state.hnsw.insert(id, &record.vector) {
            Ok(()) => {}
            Err(e) if e.is_index() => {
                warn!(error = %e, "insert failed, rebuilding and retrying once");
                self.rebuild_locked(&mut state)?;
                state.hnsw.insert(id, &record.vector)?;
            }
            Err(e) => return Err(e),
        }
        state.next_hnsw_id += 1;
        state.key_to_hnsw_id.insert(record.key.clone(), id);
        state.hnsw_id_to_key.insert(id, record.key.clone());

        self.kv.put(&KvEntry {
            hnsw_id: id,
            record: record.clone(),
        })?;
        self.wal.append(&WalEntry::put(record))?;

        state.put_count += 1;
        if state.put_count % self.config.rebuild_interval == 0 {
            self.rebuild_locked(&mut state)?;
        }
        if state.put_count % self.config.snapshot_interval == 0 {
            self.snapshot_locked(&mut state)?;
        }

        Ok(())
    }

    /// Deletes a vector record by key.
    ///
    /// # Errors
    /// `MeshError::NotFound` if no record with `key` exists.
    #[instrument(skip(self))]
    pub fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.lock_ready()?;

        let id = state
            .key_to_hnsw_id
            .remove(key)
            .ok_or_else(|| NotFoundError::key(key))?;
        state.hnsw.delete(id)?;
        state.hnsw_id_to_key.remove(&id);

        self.kv.delete(key)?;
        self.wal.append(&WalEntry::delete(key, Timestamp::now()))?;

        Ok(())
    }

    /// Retrieves a vector record by key.
    ///
    /// # Errors
    /// `MeshError::NotFound` if no record with `key` exists.
    pub fn get(&self, key: &str) -> Result<VectorRecord> {
        self.kv
            .get(key)?
            .map(|e| e.record)
            .ok_or_else(|| NotFoundError::key(key).into())
    }

    /// Searches for the `top_k` nearest records to `query`, optionally
    /// restricted by a metadata filter and/or a maximum distance
    /// `threshold`.
    ///
    /// Over-fetches candidates (`2 * top_k`) from the HNSW graph to
    /// absorb filtered-out and soft-deleted points before truncating to
    /// `top_k`, matching the source system's `knn_query(k=k*2)` margin.
    #[instrument(skip(self, query, filter), fields(top_k))]
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
        threshold: Option<f32>,
    ) -> Result<Vec<(VectorRecord, f32)>> {
        if query.len() != self.config.dimension {
            return Err(MeshError::invalid_input(format!(
                "query has dimension {}, expected {}",
                query.len(),
                self.config.dimension
            )));
        }

        let state = self.lock_ready()?;

        let active = state.hnsw.len();
        if active == 0 {
            return Ok(Vec::new());
        }
        let k = top_k.min(active);
        let ef = self.config.hnsw.ef_search.max(2 * top_k);
        let candidates = state.hnsw.search(query, k * 2, ef)?;

        let mut results = Vec::with_capacity(top_k);
        for (id, dist) in candidates {
            if state.hnsw.is_deleted(id) {
                continue;
            }
            let Some(key) = state.hnsw_id_to_key.get(&id) else {
                continue;
            };
            let Some(entry) = self.kv.get(key)? else {
                continue;
            };
            if let Some(f) = filter {
                if !f.matches(&entry.record.metadata) {
                    continue;
                }
            }
            if let Some(t) = threshold {
                if dist > t {
                    continue;
                }
            }
            results.push((entry.record, dist));
            if results.len() >= top_k {
                break;
            }
        }

        Ok(results)
    }

    /// Applies a replicated PUT without appending to this node's own WAL.
    ///
    /// Used by a slave applying a master's `REPLICATE` call: the op was
    /// already durably logged on the master, so the slave only needs to
    /// update its own in-memory/KV state (mirrors `replay_mode = true`
    /// applied to the WAL replay path, reused here for the same reason).
    #[instrument(skip(self, record), fields(key = %record.key))]
    pub fn replicate_put(&self, record: VectorRecord) -> Result<()> {
        record.validate(self.config.dimension)?;
        let mut state = self.lock_ready()?;
        Self::apply_replayed(&mut state, &self.kv, WalEntry::put(record))
    }

    /// Applies a replicated DELETE without appending to this node's own
    /// WAL. See [`Self::replicate_put`].
    #[instrument(skip(self))]
    pub fn replicate_delete(&self, key: &str) -> Result<()> {
        let mut state = self.lock_ready()?;
        Self::apply_replayed(&mut state, &self.kv, WalEntry::delete(key, Timestamp::now()))
    }

    /// Re-applies WAL entries written since the last checkpoint.
    ///
    /// Used operationally to reconcile a handler's in-memory state with
    /// its WAL without a full restart (e.g. after restoring a KV file out
    /// of band).
    pub fn replay_wal(&self) -> Result<()> {
        let mut state = self.lock_ready()?;
        let cursor = self
            .snapshot
            .load_latest()?
            .map(|h| h.wal_cursor)
            .unwrap_or(Timestamp::from_millis(0));
        for entry in self.wal.replay_since(cursor)? {
            Self::apply_replayed(&mut state, &self.kv, entry)?;
        }
        Ok(())
    }

    /// Takes this node offline: seals a final checkpoint and stops
    /// serving requests. Alias of [`Self::shutdown`].
    pub fn offline(&self) -> Result<()> {
        self.shutdown()
    }

    /// Forces a full HNSW rebuild from the KV store, physically
    /// discarding tombstoned vectors.
    pub fn rebuild(&self) -> Result<()> {
        let mut state = self.lock_ready()?;
        self.rebuild_locked(&mut state)
    }

    fn rebuild_locked(&self, state: &mut HandlerState) -> Result<()> {
        state.status = NodeStatus::Rebuilding;
        let result = self.rebuild_inner(state);
        state.status = NodeStatus::Ready;
        result
    }

    fn rebuild_inner(&self, state: &mut HandlerState) -> Result<()> {
        let entries = self.kv.list_all()?;
        info!(count = entries.len(), "rebuilding hnsw index");

        let headroom_config = HnswConfig {
            max_elements: entries.len() + self.config.rebuild_headroom,
            ..self.config.hnsw.clone()
        };
        let items: Vec<(HnswId, Vec<f32>)> = entries
            .iter()
            .map(|e| (e.hnsw_id, e.record.vector.clone()))
            .collect();
        state.hnsw =
            HnswIndex::rebuild_from_embeddings(self.config.dimension, &headroom_config, items)?;

        state.key_to_hnsw_id = entries
            .iter()
            .map(|e| (e.record.key.clone(), e.hnsw_id))
            .collect();
        state.hnsw_id_to_key = entries
            .iter()
            .map(|e| (e.hnsw_id, e.record.key.clone()))
            .collect();
        state.next_hnsw_id = entries.iter().map(|e| e.hnsw_id + 1).max().unwrap_or(0);

        Ok(())
    }

    /// Forces a checkpoint, bundling the current HNSW image, a copy of
    /// the KV store, and the WAL cursor.
    pub fn snapshot(&self) -> Result<PathBuf> {
        let mut state = self.lock_ready()?;
        self.snapshot_locked(&mut state)
    }

    fn snapshot_locked(&self, state: &mut HandlerState) -> Result<PathBuf> {
        self.wal.rotate()?;
        let cursor = Timestamp::now();
        self.snapshot
            .save_checkpoint(&state.hnsw, &self.dir.join("kv.redb"), cursor)
    }

    /// Returns the current lifecycle status.
    pub fn status(&self) -> NodeStatus {
        self.state
            .lock()
            .map(|s| s.status)
            .unwrap_or(NodeStatus::ShuttingDown)
    }

    /// Marks the handler as shutting down and seals a final checkpoint.
    /// Further PUT/DELETE/GET/SEARCH calls fail with
    /// `MeshError::Unavailable`.
    pub fn shutdown(&self) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| MeshError::unavailable("handler state lock poisoned"))?;
        self.snapshot_locked(&mut state)?;
        state.status = NodeStatus::ShuttingDown;
        Ok(())
    }

    fn lock_ready(&self) -> Result<std::sync::MutexGuard<'_, HandlerState>> {
        let state = self
            .state
            .lock()
            .map_err(|_| MeshError::unavailable("handler state lock poisoned"))?;
        if state.status != NodeStatus::Ready {
            return Err(MeshError::unavailable(format!(
                "node is not ready (status: {:?})",
                state.status
            )));
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;
    use tempfile::tempdir;

    fn small_config() -> Config {
        Config {
            dimension: 4,
            rebuild_interval: 1_000_000,
            snapshot_interval: 1_000_000,
            hnsw: HnswConfig {
                max_elements: 1000,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_open_creates_directory_structure() {
        let dir = tempdir().unwrap();
        let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();
        assert_eq!(handler.status(), NodeStatus::Ready);
        assert!(dir.path().join("kv.redb").exists());
        assert!(dir.path().join("wal").exists());
    }

    #[test]
    fn test_put_get_delete() {
        let dir = tempdir().unwrap();
        let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();

        handler
            .put(VectorRecord::new("k1", vec![1.0, 2.0, 3.0, 4.0]))
            .unwrap();
        let got = handler.get("k1").unwrap();
        assert_eq!(got.key, "k1");

        handler.delete("k1").unwrap();
        assert!(handler.get("k1").unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_missing_key_not_found() {
        let dir = tempdir().unwrap();
        let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();
        assert!(handler.delete("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_put_wrong_dimension_rejected() {
        let dir = tempdir().unwrap();
        let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();
        let result = handler.put(VectorRecord::new("k1", vec![1.0, 2.0]));
        assert!(result.unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_overwrite_key_reassigns_id() {
        let dir = tempdir().unwrap();
        let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();

        handler
            .put(VectorRecord::new("k1", vec![1.0, 0.0, 0.0, 0.0]))
            .unwrap();
        handler
            .put(VectorRecord::new("k1", vec![0.0, 1.0, 0.0, 0.0]))
            .unwrap();

        let got = handler.get("k1").unwrap();
        assert_eq!(got.vector, vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_search_returns_nearest() {
        let dir = tempdir().unwrap();
        let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();

        for i in 0..10 {
            let v = vec![i as f32, 0.0, 0.0, 0.0];
            handler.put(VectorRecord::new(format!("k{i}"), v)).unwrap();
        }

        let results = handler.search(&[5.0, 0.0, 0.0, 0.0], 3, None, None).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0.key, "k5");
    }

    #[test]
    fn test_search_with_filter() {
        let dir = tempdir().unwrap();
        let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();

        for i in 0..5 {
            let mut meta = Map::new();
            meta.insert(
                "category".to_string(),
                if i % 2 == 0 { "even" } else { "odd" }.to_string(),
            );
            let record = VectorRecord::new(format!("k{i}"), vec![i as f32, 0.0, 0.0, 0.0])
                .with_metadata(meta);
            handler.put(record).unwrap();
        }

        let filter = SearchFilter::from_raw(
            [("category".to_string(), "even".to_string())]
                .into_iter()
                .collect(),
        );
        let results = handler
            .search(&[0.0, 0.0, 0.0, 0.0], 10, Some(&filter), None)
            .unwrap();
        assert!(results.iter().all(|(r, _)| r.metadata["category"] == "even"));
    }

    #[test]
    fn test_rebuild_reclaims_tombstones() {
        let dir = tempdir().unwrap();
        let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();

        for i in 0..5 {
            handler
                .put(VectorRecord::new(format!("k{i}"), vec![i as f32, 0.0, 0.0, 0.0]))
                .unwrap();
        }
        handler.delete("k0").unwrap();
        handler.delete("k1").unwrap();

        handler.rebuild().unwrap();

        let results = handler.search(&[0.0, 0.0, 0.0, 0.0], 10, None, None).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_reopen_restores_state_via_checkpoint() {
        let dir = tempdir().unwrap();
        {
            let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();
            for i in 0..3 {
                handler
                    .put(VectorRecord::new(format!("k{i}"), vec![i as f32, 0.0, 0.0, 0.0]))
                    .unwrap();
            }
            handler.snapshot().unwrap();
        }

        let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();
        for i in 0..3 {
            assert!(handler.get(&format!("k{i}")).is_ok());
        }
    }

    #[test]
    fn test_reopen_replays_wal_after_checkpoint() {
        let dir = tempdir().unwrap();
        {
            let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();
            handler
                .put(VectorRecord::new("k0", vec![0.0, 0.0, 0.0, 0.0]))
                .unwrap();
            handler.snapshot().unwrap();
            handler
                .put(VectorRecord::new("k1", vec![1.0, 0.0, 0.0, 0.0]))
                .unwrap();
        }

        let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();
        assert!(handler.get("k0").is_ok());
        assert!(handler.get("k1").is_ok());
    }

    #[test]
    fn test_reopen_after_delete_does_not_reuse_tombstoned_id() {
        let dir = tempdir().unwrap();
        {
            let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();
            handler
                .put(VectorRecord::new("a", vec![1.0, 0.0, 0.0, 0.0]))
                .unwrap();
            handler
                .put(VectorRecord::new("b", vec![0.0, 1.0, 0.0, 0.0]))
                .unwrap();
            handler.delete("b").unwrap();
            handler.snapshot().unwrap();
        }

        let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();
        handler
            .put(VectorRecord::new("c", vec![0.0, 0.0, 1.0, 0.0]))
            .unwrap();

        let results = handler
            .search(&[0.0, 0.0, 1.0, 0.0], 10, None, None)
            .unwrap();
        assert!(
            results.iter().any(|(r, _)| r.key == "c"),
            "record put after restore must be visible to search, not land in a tombstoned slot"
        );
        assert!(results.iter().all(|(r, _)| r.key != "b"));
    }

    #[test]
    fn test_second_open_fails_while_locked() {
        let dir = tempdir().unwrap();
        let _handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();
        let result = DataNodeHandler::open(dir.path(), small_config());
        assert!(result.unwrap_err().is_unavailable());
    }

    #[test]
    fn test_shutdown_rejects_further_writes() {
        let dir = tempdir().unwrap();
        let handler = DataNodeHandler::open(dir.path(), small_config()).unwrap();
        handler
            .put(VectorRecord::new("k0", vec![0.0, 0.0, 0.0, 0.0]))
            .unwrap();
        handler.shutdown().unwrap();
        assert_eq!(handler.status(), NodeStatus::ShuttingDown);
        assert!(handler
            .put(VectorRecord::new("k1", vec![1.0, 0.0, 0.0, 0.0]))
            .unwrap_err()
            .is_unavailable());
    }
}
