//! Core type definitions for meshvec identifiers and timestamps.
//!
//! Unlike a single-process embedded store, this system's identifiers are
//! caller-supplied (vector keys, node ids) or small integers (shard ids,
//! HNSW ids) rather than generated UUIDs — there is no central authority
//! to hand out opaque ids to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one data node in the cluster.
///
/// Node ids are opaque strings chosen by the operator/launcher (e.g.
/// `"node-1"`) and used as the key under the membership store's nodes path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Creates a new NodeId from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the node id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Shard identifier, in `[0, shard_count)`.
pub type ShardId = u32;

/// HNSW-internal vector id, assigned by a per-node monotonic counter.
pub type HnswId = usize;

/// Unix timestamp in milliseconds.
///
/// Write timestamps, WAL segment names, and snapshot directory names all
/// use this type. Millisecond precision matches the spec's wire format
/// (`timestamp` field of `VectorRecord`/`WalEntry`) and the original
/// system's `int(time.time() * 1000)`.
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
