//! Configuration types for meshvec.
//!
//! [`Config`] controls the behavior of a single data node: vector
//! dimension, cluster shape (shard/replica counts), and the tuning knobs
//! of each subsystem ([`WalConfig`], [`HnswConfig`], [`RpcConfig`],
//! [`MembershipConfig`]).
//!
//! # Example
//! ```rust
//! use meshvec::Config;
//!
//! // Use defaults (dimension 384, 16 shards, 2 replicas)
//! let config = Config::default();
//!
//! // Customize for a specific deployment
//! let config = Config {
//!     dimension: 768,
//!     shard_count: 64,
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};

use crate::error::MeshError;

/// Node/cluster configuration.
///
/// All fields have sensible defaults. Use struct update syntax to override
/// specific settings:
///
/// ```rust
/// use meshvec::Config;
///
/// let config = Config {
///     shard_count: 32,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// `D`, the fixed vector dimension for this cluster.
    pub dimension: usize,

    /// `S`, the fixed number of shards.
    pub shard_count: u32,

    /// `R`, the configured replica count (slaves per shard, not counting
    /// the master).
    pub replica_count: usize,

    /// How many PUT/DELETE operations between automatic `snapshot()` calls.
    /// Default: 2,000 (matches the source's checkpoint cadence).
    pub snapshot_interval: u64,

    /// How many PUT operations between automatic `rebuild()` calls.
    /// Default: 200,000 (matches the source's rebuild cadence).
    pub rebuild_interval: u64,

    /// Extra capacity reserved above the live count when rebuilding, so
    /// the index doesn't immediately need to grow again.
    /// Default: 10,000.
    pub rebuild_headroom: usize,

    /// How many sealed snapshot directories to retain (oldest pruned).
    /// Default: 3.
    pub snapshot_retain: usize,

    /// Write-ahead log tuning.
    pub wal: WalConfig,

    /// HNSW vector index parameters.
    pub hnsw: HnswConfig,

    /// RPC client pool / transport parameters.
    pub rpc: RpcConfig,

    /// Membership cache / health probe parameters.
    pub membership: MembershipConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dimension: 384,
            shard_count: 16,
            replica_count: 2,
            snapshot_interval: 2_000,
            rebuild_interval: 200_000,
            rebuild_headroom: 10_000,
            snapshot_retain: 3,
            wal: WalConfig::default(),
            hnsw: HnswConfig::default(),
            rpc: RpcConfig::default(),
            membership: MembershipConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new Config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `MeshError::Config` if dimension, shard/replica counts, or
    /// any subsystem's parameters are out of range.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.dimension == 0 {
            return Err(MeshError::config("dimension must be greater than 0"));
        }
        if self.dimension > 8192 {
            return Err(MeshError::config("dimension must not exceed 8192"));
        }
        if self.shard_count == 0 {
            return Err(MeshError::config("shard_count must be greater than 0"));
        }
        if self.snapshot_interval == 0 {
            return Err(MeshError::config("snapshot_interval must be greater than 0"));
        }
        if self.rebuild_interval == 0 {
            return Err(MeshError::config("rebuild_interval must be greater than 0"));
        }
        self.wal.validate()?;
        self.hnsw.validate()?;
        self.rpc.validate()?;
        Ok(())
    }
}

/// Write-ahead log configuration.
#[derive(Clone, Debug)]
pub struct WalConfig {
    /// Segment rotation threshold in bytes. Default: 10 MiB.
    pub max_log_size: u64,

    /// Maximum segment age before GC eligibility, in seconds.
    /// Default: 7 days.
    pub max_log_age_secs: u64,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            max_log_size: 10 * 1024 * 1024,
            max_log_age_secs: 7 * 24 * 3600,
        }
    }
}

impl WalConfig {
    fn validate(&self) -> Result<(), MeshError> {
        if self.max_log_size == 0 {
            return Err(MeshError::config("wal.max_log_size must be greater than 0"));
        }
        Ok(())
    }
}

/// Configuration for the HNSW vector index.
///
/// Controls the trade-off between index build time, memory usage, and
/// search accuracy.
///
/// # Tuning Guide
///
/// | Use Case     | M  | ef_construction | ef_search |
/// |--------------|----|-----------------|-----------|
/// | Low memory   | 16 |             100 |        30 |
/// | Balanced     | 32 |             128 |        50 |
/// | High recall  | 48 |             256 |       100 |
#[derive(Clone, Debug)]
pub struct HnswConfig {
    /// Maximum bidirectional connections per node (M parameter).
    /// Default: 32.
    pub max_nb_connection: usize,

    /// Number of candidates tracked during index construction.
    /// Default: 128.
    pub ef_construction: usize,

    /// Number of candidates tracked during search when the caller does not
    /// request a specific value. Default: 50.
    ///
    /// Per spec.md §4.3, the effective ef used by a given search is
    /// `max(ef_search, 2 * top_k)`.
    pub ef_search: usize,

    /// Maximum number of layers in the skip-list structure. Default: 16.
    pub max_layer: usize,

    /// Initial pre-allocated capacity (number of vectors). Default: 10,000.
    pub max_elements: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            max_nb_connection: 32,
            ef_construction: 128,
            ef_search: 50,
            max_layer: 16,
            max_elements: 10_000,
        }
    }
}

impl HnswConfig {
    fn validate(&self) -> Result<(), MeshError> {
        if self.max_nb_connection == 0 {
            return Err(MeshError::config("hnsw.max_nb_connection must be greater than 0"));
        }
        if self.ef_construction == 0 {
            return Err(MeshError::config("hnsw.ef_construction must be greater than 0"));
        }
        if self.ef_search == 0 {
            return Err(MeshError::config("hnsw.ef_search must be greater than 0"));
        }
        Ok(())
    }
}

/// RPC client pool / transport configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Per-call timeout. Default: 5 s.
    pub timeout_ms: u64,

    /// Maximum idle connections retained per node. Default: 8.
    pub pool_size: usize,

    /// How long an idle pooled connection may sit before eviction.
    /// Default: 60 s.
    pub pool_idle_timeout_ms: u64,

    /// Maximum accepted frame size, guards against a corrupt length
    /// prefix causing an unbounded allocation. Default: 64 MiB.
    pub max_frame_size: u32,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            pool_size: 8,
            pool_idle_timeout_ms: 60_000,
            max_frame_size: 64 * 1024 * 1024,
        }
    }
}

impl RpcConfig {
    fn validate(&self) -> Result<(), MeshError> {
        if self.timeout_ms == 0 {
            return Err(MeshError::config("rpc.timeout_ms must be greater than 0"));
        }
        if self.max_frame_size == 0 {
            return Err(MeshError::config("rpc.max_frame_size must be greater than 0"));
        }
        Ok(())
    }
}

/// Membership cache / health probe configuration.
///
/// `base_path`/`session_timeout_ms` mirror the external coordination
/// service's configuration surface (spec.md §6: `ZK_BASE_PATH`,
/// `ZK_SESSION_TIMEOUT`) even though this crate ships only an in-process
/// reference [`crate::coordinator::MemoryMembershipStore`]
/// implementation, not a real ZooKeeper-equivalent client.
#[derive(Clone, Debug)]
pub struct MembershipConfig {
    /// Root path under which node/shard records live.
    pub base_path: String,

    /// Session timeout for the membership store connection, in
    /// milliseconds.
    pub session_timeout_ms: u64,

    /// Interval between active health probes. Default: 5 s.
    pub probe_interval_secs: u64,

    /// TCP connect timeout used by the health probe. Default: 2 s.
    pub probe_timeout_secs: u64,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            base_path: "/meshvec".to_string(),
            session_timeout_ms: 10_000,
            probe_interval_secs: 5,
            probe_timeout_secs: 2,
        }
    }
}
