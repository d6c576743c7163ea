//! redb-backed key-value store.
//!
//! Uses [redb](https://docs.rs/redb), a pure Rust embedded key-value
//! store with ACID transactions and MVCC readers, as the durable
//! backing for each shard's vector records.
//!
//! # File Layout
//!
//! Opening a store at `./shard.kv` creates a single file at that path —
//! unlike the LevelDB backend this conceptually replaces, redb is not a
//! directory tree, which matters for how
//! [`crate::snapshot::SnapshotManager`] bundles a checkpoint (see
//! SPEC_FULL.md's Open Questions).

use std::path::{Path, PathBuf};

use redb::{Database, TableDefinition};
use tracing::{debug, info, instrument};

use super::{KvEntry, KvStore};
use crate::error::{Result, StorageError};

/// Records table: key (vector record key) -> bincode-serialized `KvEntry`.
const RECORDS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// redb-backed KV store.
///
/// # Thread Safety
///
/// `RedbKv` is `Send + Sync`; redb handles internal synchronization
/// (MVCC for readers, exclusive locking for writers).
pub struct RedbKv {
    db: Database,
    path: PathBuf,
}

impl RedbKv {
    /// Opens or creates a KV store at the given path.
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!("opening kv store");

        let db = Database::builder().create(&path).map_err(|e| {
            if e.to_string().contains("lock") {
                StorageError::Locked
            } else {
                StorageError::Redb(e.to_string())
            }
        })?;

        // Ensure the table exists even on a fresh database.
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RECORDS_TABLE)?;
        }
        write_txn.commit()?;

        info!("kv store opened");
        Ok(Self { db, path })
    }
}

impl KvStore for RedbKv {
    #[instrument(skip(self, entry), fields(key = %entry.record.key))]
    fn put(&self, entry: &KvEntry) -> Result<()> {
        let bytes = bincode::serialize(entry).map_err(StorageError::from)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECORDS_TABLE)?;
            table.insert(entry.record.key.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<KvEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(RECORDS_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(StorageError::from(e).into()),
        };
        let Some(value) = table.get(key)? else {
            return Ok(None);
        };
        let entry: KvEntry =
            bincode::deserialize(value.value()).map_err(StorageError::from)?;
        Ok(Some(entry))
    }

    #[instrument(skip(self))]
    fn delete(&self, key: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(RECORDS_TABLE)?;
            table.remove(key)?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    fn list_all(&self) -> Result<Vec<KvEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(RECORDS_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::from(e).into()),
        };

        let mut entries = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let entry: KvEntry =
                bincode::deserialize(value.value()).map_err(StorageError::from)?;
            entries.push(entry);
        }
        Ok(entries)
    }

    fn len(&self) -> Result<u64> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(RECORDS_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(0),
            Err(e) => return Err(StorageError::from(e).into()),
        };
        Ok(table.len()?)
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    #[instrument(skip(self))]
    fn close(self: Box<Self>) -> Result<()> {
        drop(self.db);
        Ok(())
    }
}

unsafe impl Send for RedbKv {}
unsafe impl Sync for RedbKv {}
