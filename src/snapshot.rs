//! Snapshot / checkpoint management.
//!
//! A checkpoint bundles everything needed to restore a shard without
//! replaying its entire history: the HNSW graph image, a copy of the KV
//! store, and the WAL cursor (the timestamp up to which the checkpoint
//! reflects applied writes). Checkpoints are written to a fresh,
//! timestamped directory and only considered valid once fully written —
//! a crash mid-write simply leaves an incomplete directory that
//! [`SnapshotManager::load_latest`] skips in favor of an older one.
//!
//! # Layout
//!
//! ```text
//! checkpoint/
//!   checkpoint_1700000000000/
//!     index.hnsw.meta   <- tombstones (+ best-effort graph dump files)
//!     kv.redb           <- copy of the KV store file at checkpoint time
//!     wal_pos.txt       <- WAL cursor: "<unix_ms>"
//!   checkpoint_1700000600000/
//!     ...
//! ```
//!
//! The original system's KV layer (LevelDB) is a directory tree, so its
//! checkpoint copied it with `shutil.copytree`. This system's KV layer
//! ([`crate::kv::RedbKv`]) is a single file, so the checkpoint copies
//! that one file instead — see SPEC_FULL.md's Open Questions.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::types::Timestamp;
use crate::vector::{HnswIndex, VectorIndex};

const CHECKPOINT_PREFIX: &str = "checkpoint_";
const HNSW_NAME: &str = "index";
const KV_FILE_NAME: &str = "kv.redb";
const WAL_POS_FILE: &str = "wal_pos.txt";

/// A located checkpoint directory and its WAL cursor.
pub struct CheckpointHandle {
    /// The checkpoint directory.
    pub dir: PathBuf,
    /// The WAL timestamp this checkpoint is consistent up to; replaying
    /// WAL entries strictly newer than this brings the shard fully
    /// current.
    pub wal_cursor: Timestamp,
}

impl CheckpointHandle {
    /// Path to the copied KV store file inside this checkpoint.
    pub fn kv_path(&self) -> PathBuf {
        self.dir.join(KV_FILE_NAME)
    }
}

/// Manages sealed checkpoint directories under a node's `checkpoint/`
/// directory.
pub struct SnapshotManager {
    dir: PathBuf,
    retain: usize,
}

impl SnapshotManager {
    /// Creates a manager rooted at `dir` (created if missing), retaining
    /// at most `retain` sealed checkpoints.
    pub fn new(dir: impl AsRef<Path>, retain: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, retain })
    }

    /// Seals a new checkpoint: writes the HNSW image, copies the KV
    /// store file, and records the WAL cursor. Returns the sealed
    /// directory's path.
    ///
    /// The directory is built under a temporary name and renamed into
    /// place only once every component has been written, so a reader
    /// (including [`Self::load_latest`]) never observes a partially
    /// written checkpoint under its final name.
    #[instrument(skip(self, hnsw, kv_path), fields(wal_cursor = wal_cursor.as_millis()))]
    pub fn save_checkpoint(
        &self,
        hnsw: &HnswIndex,
        kv_path: &Path,
        wal_cursor: Timestamp,
    ) -> Result<PathBuf> {
        let now = Timestamp::now();
        let final_dir = self.dir.join(format!("{CHECKPOINT_PREFIX}{}", now.as_millis()));
        let tmp_dir = self.dir.join(format!(".{CHECKPOINT_PREFIX}{}.tmp", now.as_millis()));

        if tmp_dir.exists() {
            fs::remove_dir_all(&tmp_dir)?;
        }
        fs::create_dir_all(&tmp_dir)?;

        hnsw.save(&tmp_dir, HNSW_NAME)?;
        fs::copy(kv_path, tmp_dir.join(KV_FILE_NAME))?;
        fs::write(tmp_dir.join(WAL_POS_FILE), wal_cursor.as_millis().to_string())?;

        fs::rename(&tmp_dir, &final_dir)?;

        info!(dir = %final_dir.display(), "checkpoint sealed");
        self.prune()?;
        Ok(final_dir)
    }

    /// Finds the most recent sealed checkpoint, if any.
    pub fn load_latest(&self) -> Result<Option<CheckpointHandle>> {
        let mut dirs = self.list_checkpoints()?;
        let Some((_, dir)) = dirs.pop() else {
            return Ok(None);
        };
        let wal_cursor = Self::read_wal_cursor(&dir)?;
        Ok(Some(CheckpointHandle { dir, wal_cursor }))
    }

    fn read_wal_cursor(dir: &Path) -> Result<Timestamp> {
        let raw = fs::read_to_string(dir.join(WAL_POS_FILE))?;
        let millis: i64 = raw.trim().parse().map_err(|_| {
            crate::error::MeshError::Storage(crate::error::StorageError::corrupted(
                "invalid wal_pos.txt contents",
            ))
        })?;
        Ok(Timestamp::from_millis(millis))
    }

    /// Lists sealed checkpoints, oldest first.
    fn list_checkpoints(&self) -> Result<Vec<(Timestamp, PathBuf)>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut dirs: Vec<(Timestamp, PathBuf)> = fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .filter_map(|p| {
                let name = p.file_name()?.to_str()?;
                let stem = name.strip_prefix(CHECKPOINT_PREFIX)?;
                stem.parse::<i64>().ok().map(|ms| (Timestamp::from_millis(ms), p))
            })
            .collect();
        dirs.sort_by_key(|(ts, _)| *ts);
        Ok(dirs)
    }

    /// Removes sealed checkpoints beyond the retention limit, oldest
    /// first.
    fn prune(&self) -> Result<()> {
        let dirs = self.list_checkpoints()?;
        if dirs.len() <= self.retain {
            return Ok(());
        }
        let excess = dirs.len() - self.retain;
        for (_, dir) in dirs.into_iter().take(excess) {
            if let Err(e) = fs::remove_dir_all(&dir) {
                warn!(dir = %dir.display(), error = %e, "failed to prune old checkpoint");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HnswConfig;
    use tempfile::tempdir;

    fn make_kv_file(dir: &Path) -> PathBuf {
        let path = dir.join("kv.redb");
        fs::write(&path, b"fake-redb-contents").unwrap();
        path
    }

    #[test]
    fn test_save_and_load_checkpoint() {
        let root = tempdir().unwrap();
        let manager = SnapshotManager::new(root.path().join("checkpoint"), 3).unwrap();
        let hnsw = HnswIndex::new(4, &HnswConfig::default());
        let kv_path = make_kv_file(root.path());

        manager
            .save_checkpoint(&hnsw, &kv_path, Timestamp::from_millis(42))
            .unwrap();

        let handle = manager.load_latest().unwrap().unwrap();
        assert_eq!(handle.wal_cursor, Timestamp::from_millis(42));
        assert!(handle.kv_path().exists());
        assert!(handle.dir.join("index.hnsw.meta").exists());
    }

    #[test]
    fn test_load_latest_none_when_empty() {
        let root = tempdir().unwrap();
        let manager = SnapshotManager::new(root.path().join("checkpoint"), 3).unwrap();
        assert!(manager.load_latest().unwrap().is_none());
    }

    #[test]
    fn test_load_latest_picks_newest() {
        let root = tempdir().unwrap();
        let manager = SnapshotManager::new(root.path().join("checkpoint"), 3).unwrap();
        let hnsw = HnswIndex::new(4, &HnswConfig::default());
        let kv_path = make_kv_file(root.path());

        manager
            .save_checkpoint(&hnsw, &kv_path, Timestamp::from_millis(1))
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        manager
            .save_checkpoint(&hnsw, &kv_path, Timestamp::from_millis(2))
            .unwrap();

        let handle = manager.load_latest().unwrap().unwrap();
        assert_eq!(handle.wal_cursor, Timestamp::from_millis(2));
    }

    #[test]
    fn test_prune_keeps_retention_limit() {
        let root = tempdir().unwrap();
        let manager = SnapshotManager::new(root.path().join("checkpoint"), 2).unwrap();
        let hnsw = HnswIndex::new(4, &HnswConfig::default());
        let kv_path = make_kv_file(root.path());

        for i in 0..4 {
            manager
                .save_checkpoint(&hnsw, &kv_path, Timestamp::from_millis(i))
                .unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        assert_eq!(manager.list_checkpoints().unwrap().len(), 2);
    }
}
