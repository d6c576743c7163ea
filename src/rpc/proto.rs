//! Request/response types carried over the framed RPC transport.
//!
//! One enum covers both RPC surfaces spec.md §6 defines (coordinator and
//! data node); a given server only handles the subset relevant to its
//! role and returns [`Response::Error`] for the rest, the same way the
//! original Thrift services simply didn't expose the other role's
//! methods.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, NotFoundError, StorageError, TransportError};
use crate::record::VectorRecord;

/// A single RPC call, as it crosses the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Request {
    /// Data-node and coordinator: insert/overwrite a record.
    Put(VectorRecord),
    /// Data-node and coordinator: remove a record by key.
    Delete(String),
    /// Data-node and coordinator: fetch a record by key.
    Get(String),
    /// Data-node and coordinator: nearest-neighbor search.
    Search(SearchRequest),
    /// Data-node only: apply a replicated op without re-logging it.
    Replicate(ReplicateOp),
    /// Data-node only: re-apply WAL entries since the last checkpoint.
    ReplayWal,
    /// Data-node only: seal a final checkpoint and stop serving.
    Offline,
    /// Coordinator only: register a data node and recompute placement.
    RegisterNode {
        /// The node's id.
        node_id: String,
        /// The node's `host:port` address.
        address: String,
    },
    /// Coordinator only: list the current membership view.
    ListNodes,
}

/// A replicated mutation, sent by a shard master to drive its slaves.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ReplicateOp {
    /// Replicated PUT.
    Put(VectorRecord),
    /// Replicated DELETE.
    Delete(String),
}

/// Wire form of a SEARCH call's parameters (spec.md §6
/// `SearchRequest{query_vector, top_k, filter?, threshold?}`).
///
/// `filter` is the raw `key -> constraint` map; it's parsed into a
/// [`crate::filter::SearchFilter`] by whichever side executes the
/// search, since the grammar itself isn't part of the wire contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    /// The query embedding. Must match the cluster's configured dimension.
    pub query_vector: Vec<f32>,
    /// Number of results requested.
    pub top_k: usize,
    /// Optional metadata filter, raw `key -> constraint` strings.
    pub filter: Option<HashMap<String, String>>,
    /// Optional maximum distance; candidates scoring worse are dropped.
    pub threshold: Option<f32>,
}

/// Wire form of a SEARCH response's payload (spec.md §6
/// `search_result{keys, scores, vectors}`), ordered ascending by score.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matching keys, ascending by score.
    pub keys: Vec<String>,
    /// Parallel distance scores (smaller = closer).
    pub scores: Vec<f32>,
    /// Parallel embeddings.
    pub vectors: Vec<Vec<f32>>,
}

/// The caller-visible category of a failed call, carried over the wire
/// alongside the human-readable message so the coordinator can reconstruct
/// the same [`MeshError`] variant a client talking to the data node
/// directly would have seen (spec.md §7: node-side error kinds propagate
/// to the client as-is, not collapsed into a single wire-level failure).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Mirrors [`MeshError::InvalidInput`].
    InvalidInput,
    /// Mirrors [`MeshError::NotFound`].
    NotFound,
    /// Mirrors [`MeshError::Unavailable`].
    Unavailable,
    /// Mirrors [`MeshError::Index`].
    Index,
    /// Mirrors [`MeshError::Storage`].
    Storage,
    /// Mirrors [`MeshError::Io`].
    Io,
    /// Mirrors [`MeshError::Transport`].
    Transport,
    /// Mirrors [`MeshError::Config`].
    Config,
}

impl From<&MeshError> for ErrorKind {
    fn from(err: &MeshError) -> Self {
        match err {
            MeshError::InvalidInput(_) => ErrorKind::InvalidInput,
            MeshError::NotFound(_) => ErrorKind::NotFound,
            MeshError::Unavailable(_) => ErrorKind::Unavailable,
            MeshError::Index(_) => ErrorKind::Index,
            MeshError::Storage(_) => ErrorKind::Storage,
            MeshError::Io(_) => ErrorKind::Io,
            MeshError::Transport(_) => ErrorKind::Transport,
            MeshError::Config { .. } => ErrorKind::Config,
        }
    }
}

impl ErrorKind {
    /// Reconstructs the [`MeshError`] this kind/message pair came from on
    /// the other side of the wire. The exact inner payload (e.g. which
    /// `NotFoundError` variant) doesn't survive the hop, but the
    /// discriminant the `is_*()` predicates key off of does.
    pub fn into_mesh_error(self, message: String) -> MeshError {
        match self {
            ErrorKind::InvalidInput => MeshError::invalid_input(message),
            ErrorKind::NotFound => MeshError::from(NotFoundError::key(message)),
            ErrorKind::Unavailable => MeshError::unavailable(message),
            ErrorKind::Index => MeshError::index(message),
            ErrorKind::Storage => MeshError::Storage(StorageError::corrupted(message)),
            ErrorKind::Io => MeshError::Io(std::io::Error::new(std::io::ErrorKind::Other, message)),
            ErrorKind::Transport => MeshError::Transport(TransportError::decode(message)),
            ErrorKind::Config => MeshError::config(message),
        }
    }
}

/// A single RPC reply, as it crosses the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Response {
    /// The call succeeded with no payload beyond a message.
    Success {
        /// Human-readable confirmation, mirroring the source's
        /// `Response{success=True, message=...}`.
        message: String,
    },
    /// The call failed; `kind` carries the caller-visible error category
    /// and `message` the human-readable description (spec.md §7).
    Error {
        /// The error's category, for reconstructing a typed [`MeshError`].
        kind: ErrorKind,
        /// Error description.
        message: String,
    },
    /// A GET reply.
    Record(VectorRecord),
    /// A LIST_NODES reply: the coordinator's current membership view.
    Nodes(HashMap<String, String>),
    /// A SEARCH reply.
    Search(SearchResponse),
}

impl Response {
    /// Constructs a bare success response.
    pub fn ok() -> Self {
        Self::Success {
            message: "ok".to_string(),
        }
    }

    /// Constructs an error response carrying `err`'s kind and message.
    pub fn error(err: &MeshError) -> Self {
        Self::Error {
            kind: ErrorKind::from(err),
            message: err.to_string(),
        }
    }

    /// Constructs an error response for a failure that has no `MeshError`
    /// behind it (an unsupported request variant for this server role, or
    /// a panicked handler task).
    pub fn error_with(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    /// Returns true if this response represents success
    /// (`Success`/`Record`/`Nodes`/`Search`, not `Error`).
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Error { .. })
    }
}
