//! # meshvec
//!
//! A distributed, sharded, replicated vector database: each data node owns
//! an HNSW approximate-nearest-neighbor index backed by an embedded KV
//! store, a write-ahead log, and periodic snapshots; a coordinator layer
//! assigns shards to nodes, routes writes to shard masters, replicates
//! them to slaves, and merges broadcast searches across the cluster.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meshvec::{Config, DataNodeHandler, VectorRecord};
//!
//! # fn main() -> meshvec::Result<()> {
//! let handler = DataNodeHandler::open("./node-data", Config::default())?;
//! handler.put(VectorRecord::new("doc-1", vec![0.1; 384]))?;
//! let results = handler.search(&vec![0.1; 384], 10, None, None)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Concepts
//!
//! ### Data node
//!
//! A **data node** ([`node::DataNodeHandler`]) is the unit of storage: one
//! HNSW index, one KV store, one write-ahead log, living under one
//! directory locked for exclusive access by a single process.
//!
//! ### Coordinator
//!
//! A **coordinator** ([`coordinator::Coordinator`]) owns no vectors. It
//! tracks cluster membership, assigns shards to nodes by round robin, and
//! routes each request to the right node(s) over RPC.
//!
//! ### Shard
//!
//! A **shard** is `MD5(key) mod shard_count`: the unit of placement. Every
//! key in a shard lives on the same master node (and its replicas),
//! regardless of how many nodes join or leave.
//!
//! ## Thread Safety
//!
//! [`node::DataNodeHandler`] and [`coordinator::Coordinator`] are
//! `Send + Sync` and are meant to be shared via `Arc` across the tokio
//! tasks serving RPC connections.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod kv;
pub mod node;
pub mod record;
pub mod rpc;
pub mod snapshot;
pub mod types;
pub mod vector;
pub mod wal;

// Configuration
pub use config::{Config, HnswConfig, MembershipConfig, RpcConfig, WalConfig};

// Error handling
pub use error::{MeshError, NotFoundError, Result, StorageError, TransportError};

// Core types
pub use types::{HnswId, NodeId, ShardId, Timestamp};

// Domain types
pub use record::VectorRecord;
pub use filter::SearchFilter;

// Data node
pub use node::{DataNodeHandler, NodeStatus};

// Coordinator
pub use coordinator::{Coordinator, MembershipStore, MemoryMembershipStore};

// RPC
pub use rpc::{CoordinatorServer, DataNodeServer, RpcClient};

/// Convenient imports for common meshvec usage.
///
/// ```rust
/// use meshvec::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::coordinator::Coordinator;
    pub use crate::error::{MeshError, Result};
    pub use crate::filter::SearchFilter;
    pub use crate::node::DataNodeHandler;
    pub use crate::record::VectorRecord;
    pub use crate::types::{NodeId, ShardId, Timestamp};
}
