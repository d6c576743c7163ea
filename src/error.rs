//! Error types for meshvec.
//!
//! meshvec uses a hierarchical error system:
//! - [`MeshError`] is the top-level error returned by all public APIs
//! - Specific error types (`StorageError`, `TransportError`) provide detail
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use meshvec::{Config, Result};
//!
//! fn example() -> Result<()> {
//!     // ... operations that may fail ...
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for meshvec operations.
pub type Result<T> = std::result::Result<T, MeshError>;

/// Top-level error enum for all meshvec operations.
///
/// This is the only error type returned by public APIs. Use pattern
/// matching (or the `is_*` helpers) to handle specific error cases.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Caller-supplied input failed validation (bad dimension, empty key,
    /// malformed filter, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested entity not found.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// No live node could serve the request (shard unassigned, all
    /// replicas offline, RPC pool exhausted).
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Vector index (HNSW) operation failed.
    #[error("Index error: {0}")]
    Index(String),

    /// Storage layer error (I/O, corruption, transactions).
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// General I/O error (WAL, snapshot, file-lock).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RPC transport error (connect, framing, timeout).
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of what's wrong with the configuration.
        reason: String,
    },
}

impl MeshError {
    /// Creates an invalid-input error with the given message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates an unavailable error with the given message.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Creates an index error with the given message.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }

    /// Creates a configuration error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is an invalid-input error.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Returns true if this is an unavailable error.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Returns true if this is a storage error.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is an index error.
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// Returns true if this is a transport error.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Storage-related errors.
///
/// These errors indicate problems with the underlying KV/WAL/snapshot
/// storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// On-disk data is corrupted or unreadable.
    #[error("Storage corrupted: {0}")]
    Corrupted(String),

    /// Storage path not found at expected location.
    #[error("Storage not found: {0}")]
    NotFound(PathBuf),

    /// Storage directory is locked by another process.
    #[error("Storage directory is locked by another writer")]
    Locked,

    /// Transaction failed (commit, rollback, etc.).
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error from the redb storage engine.
    #[error("Storage engine error: {0}")]
    Redb(String),
}

impl StorageError {
    /// Creates a corruption error with the given message.
    pub fn corrupted(msg: impl Into<String>) -> Self {
        Self::Corrupted(msg.into())
    }

    /// Creates a transaction error with the given message.
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    /// Creates a serialization error with the given message.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a redb error with the given message.
    pub fn redb(msg: impl Into<String>) -> Self {
        Self::Redb(msg.into())
    }
}

// Conversions from redb error types
impl From<redb::Error> for StorageError {
    fn from(err: redb::Error) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(err: redb::DatabaseError) -> Self {
        StorageError::Redb(err.to_string())
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(err: redb::TransactionError) -> Self {
        StorageError::Transaction(err.to_string())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(err: redb::CommitError) -> Self {
        StorageError::Transaction(format!("Commit failed: {}", err))
    }
}

impl From<redb::TableError> for StorageError {
    fn from(err: redb::TableError) -> Self {
        StorageError::Redb(format!("Table error: {}", err))
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(err: redb::StorageError) -> Self {
        StorageError::Redb(format!("Storage error: {}", err))
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

// Convenience: allow these to convert directly to MeshError via Storage.
impl From<redb::Error> for MeshError {
    fn from(err: redb::Error) -> Self {
        MeshError::Storage(StorageError::from(err))
    }
}

impl From<redb::DatabaseError> for MeshError {
    fn from(err: redb::DatabaseError) -> Self {
        MeshError::Storage(StorageError::from(err))
    }
}

impl From<redb::TransactionError> for MeshError {
    fn from(err: redb::TransactionError) -> Self {
        MeshError::Storage(StorageError::from(err))
    }
}

impl From<redb::CommitError> for MeshError {
    fn from(err: redb::CommitError) -> Self {
        MeshError::Storage(StorageError::from(err))
    }
}

impl From<redb::TableError> for MeshError {
    fn from(err: redb::TableError) -> Self {
        MeshError::Storage(StorageError::from(err))
    }
}

impl From<redb::StorageError> for MeshError {
    fn from(err: redb::StorageError) -> Self {
        MeshError::Storage(StorageError::from(err))
    }
}

impl From<bincode::Error> for MeshError {
    fn from(err: bincode::Error) -> Self {
        MeshError::Storage(StorageError::from(err))
    }
}

/// RPC transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to connect to a peer.
    #[error("Connect failed: {0}")]
    Connect(String),

    /// Connection closed unexpectedly (peer hung up mid-frame).
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// Frame exceeded the configured maximum size.
    #[error("Frame too large: {size} bytes (max: {max} bytes)")]
    FrameTooLarge {
        /// Size of the offending frame.
        size: u32,
        /// Configured maximum frame size.
        max: u32,
    },

    /// Operation exceeded its configured timeout.
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Underlying socket I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl TransportError {
    /// Creates a connect error with the given message.
    pub fn connect(msg: impl Into<String>) -> Self {
        Self::Connect(msg.into())
    }

    /// Creates a decode error with the given message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }
}

/// Not found errors for specific entity types.
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// No vector record with the given key.
    #[error("Key not found: {0}")]
    Key(String),

    /// Shard has no assigned nodes.
    #[error("Shard not assigned: {0}")]
    Shard(u32),

    /// Node id is not present in the membership cache.
    #[error("Node not found: {0}")]
    Node(String),
}

impl NotFoundError {
    /// Creates a key-not-found error.
    pub fn key(k: impl ToString) -> Self {
        Self::Key(k.to_string())
    }

    /// Creates a shard-not-assigned error.
    pub fn shard(id: u32) -> Self {
        Self::Shard(id)
    }

    /// Creates a node-not-found error.
    pub fn node(id: impl ToString) -> Self {
        Self::Node(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MeshError::config("missing shard_count");
        assert_eq!(err.to_string(), "Configuration error: missing shard_count");
    }

    #[test]
    fn test_not_found_display() {
        let err = NotFoundError::key("user:42");
        assert_eq!(err.to_string(), "Key not found: user:42");
    }

    #[test]
    fn test_is_not_found() {
        let err: MeshError = NotFoundError::key("a").into();
        assert!(err.is_not_found());
        assert!(!err.is_storage());
    }

    #[test]
    fn test_is_invalid_input() {
        let err = MeshError::invalid_input("empty key");
        assert!(err.is_invalid_input());
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_is_unavailable() {
        let err = MeshError::unavailable("no live replicas");
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_is_index() {
        let err = MeshError::index("dimension mismatch");
        assert_eq!(err.to_string(), "Index error: dimension mismatch");
        assert!(err.is_index());
    }

    #[test]
    fn test_transport_error_conversion() {
        let err: MeshError = TransportError::connect("refused").into();
        assert!(err.is_transport());
    }

    #[test]
    fn test_error_conversion_chain() {
        fn inner() -> Result<()> {
            Err(StorageError::corrupted("bad magic"))?
        }
        let result = inner();
        assert!(result.is_err());
        assert!(result.unwrap_err().is_storage());
    }
}
