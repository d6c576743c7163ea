//! Key-value storage abstractions.
//!
//! This module provides a trait-based abstraction over the durable
//! key-value store that backs each shard's vector records. The
//! production implementation is [`RedbKv`], a pure-Rust embedded store
//! with ACID transactions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            DataNodeHandler                   │
//! │                   │                          │
//! │                   ▼                          │
//! │            ┌─────────────┐                  │
//! │            │  KvStore    │  ← Trait          │
//! │            └─────────────┘                  │
//! │              ▲         ▲                    │
//! │         ┌───┴──┐   ┌──┴────────┐           │
//! │         │RedbKv│   │ MemoryKv  │           │
//! │         └──────┘   └───────────┘           │
//! │          (prod)       (test)                │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The KV store is the source of truth for vector records; the HNSW
//! index is a derived, rebuildable view over it (see
//! [`crate::vector::HnswIndex::rebuild_from_embeddings`]).

mod redb_kv;

pub use redb_kv::RedbKv;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::VectorRecord;

/// One stored entry: a vector record plus the HNSW id it was inserted
/// under.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KvEntry {
    /// The HNSW-internal id this record's embedding was inserted under.
    pub hnsw_id: usize,
    /// The full vector record.
    pub record: VectorRecord,
}

/// Key-value store trait for durable vector record storage.
///
/// Implementations must be `Send + Sync` for use inside
/// [`crate::node::DataNodeHandler`].
pub trait KvStore: Send + Sync {
    /// Writes (or overwrites) an entry under its record's key.
    fn put(&self, entry: &KvEntry) -> Result<()>;

    /// Retrieves an entry by key.
    fn get(&self, key: &str) -> Result<Option<KvEntry>>;

    /// Deletes an entry by key. Returns true if it existed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Lists every stored entry, for index rebuild.
    fn list_all(&self) -> Result<Vec<KvEntry>>;

    /// Returns the number of stored entries.
    fn len(&self) -> Result<u64>;

    /// Returns the path to the backing file, if applicable.
    fn path(&self) -> Option<&Path>;

    /// Closes the store, flushing any pending writes.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Opens a [`RedbKv`] store at the given path.
pub fn open_kv(path: impl AsRef<Path>) -> Result<Box<dyn KvStore>> {
    let store = RedbKv::open(path)?;
    Ok(Box::new(store))
}
