//! Write-ahead log entry types.

use serde::{Deserialize, Serialize};

use crate::record::VectorRecord;
use crate::types::Timestamp;

/// A single logical mutation recorded in the write-ahead log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WalOp {
    /// A PUT of a full vector record.
    Put {
        /// The record being written.
        record: VectorRecord,
    },
    /// A DELETE of a key.
    Delete {
        /// The key being removed.
        key: String,
    },
}

impl WalOp {
    /// Returns the key this operation applies to.
    pub fn key(&self) -> &str {
        match self {
            WalOp::Put { record } => &record.key,
            WalOp::Delete { key } => key,
        }
    }
}

/// One JSON line in a WAL segment: an operation plus the write
/// timestamp it was applied at.
///
/// During replay, entries are deduplicated by key, keeping the entry
/// with the latest `timestamp` — this matches a last-write-wins log
/// where a PUT followed by a DELETE (or vice versa) at a later
/// timestamp always wins, regardless of segment or line order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// When this operation was applied.
    pub timestamp: Timestamp,
    /// The operation itself.
    pub op: WalOp,
}

impl WalEntry {
    /// Creates a PUT entry.
    pub fn put(record: VectorRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            op: WalOp::Put { record },
        }
    }

    /// Creates a DELETE entry at the given timestamp.
    pub fn delete(key: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            op: WalOp::Delete { key: key.into() },
        }
    }

    /// Serializes this entry as one JSON line (no trailing newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a single JSON line into an entry.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_roundtrip() {
        let record = VectorRecord::new("k1", vec![1.0, 2.0]);
        let entry = WalEntry::put(record.clone());
        let line = entry.to_line().unwrap();
        let restored = WalEntry::from_line(&line).unwrap();
        assert_eq!(entry, restored);
        assert_eq!(restored.op.key(), "k1");
    }

    #[test]
    fn test_delete_roundtrip() {
        let entry = WalEntry::delete("k1", Timestamp::from_millis(100));
        let line = entry.to_line().unwrap();
        let restored = WalEntry::from_line(&line).unwrap();
        assert_eq!(entry, restored);
    }

    #[test]
    fn test_corrupt_line_fails_to_parse() {
        assert!(WalEntry::from_line("not json").is_err());
        assert!(WalEntry::from_line("{\"incomplete\":").is_err());
    }
}
