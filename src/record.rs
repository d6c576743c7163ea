//! The vector record payload type.
//!
//! A [`VectorRecord`] is the unit of storage: a caller-supplied key, a
//! dense embedding, and an arbitrary string/string metadata bag used by
//! [`crate::filter::SearchFilter`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::MeshError;
use crate::types::Timestamp;

/// A single vector record: key, embedding, metadata, write timestamp.
///
/// `metadata` values are stored as strings regardless of their logical
/// type (numbers included) since [`crate::filter::SearchFilter`]'s
/// `>`/`<` comparators operate on string representations — this matches
/// the spec's metadata filter grammar exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Caller-assigned unique key. Opaque to the storage engine.
    pub key: String,

    /// Dense embedding. Must match the cluster's configured dimension.
    pub vector: Vec<f32>,

    /// Arbitrary metadata, consulted by filtered search.
    pub metadata: HashMap<String, String>,

    /// When this record was written (or last overwritten).
    pub timestamp: Timestamp,
}

impl VectorRecord {
    /// Creates a new record with the current timestamp.
    pub fn new(key: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            key: key.into(),
            vector,
            metadata: HashMap::new(),
            timestamp: Timestamp::now(),
        }
    }

    /// Builder-style metadata attachment.
    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Validates the record against the cluster's configured vector
    /// dimension.
    ///
    /// # Errors
    /// - `MeshError::InvalidInput` if the key is empty.
    /// - `MeshError::InvalidInput` if the vector's length doesn't match
    ///   `expected_dim`, matches the original's shape check in
    ///   `datanode/handler.py::put` (performed before acquiring any lock).
    /// - `MeshError::InvalidInput` if the vector contains a NaN or
    ///   infinite component.
    pub fn validate(&self, expected_dim: usize) -> Result<(), MeshError> {
        if self.key.is_empty() {
            return Err(MeshError::invalid_input("key must not be empty"));
        }
        if self.vector.len() != expected_dim {
            return Err(MeshError::invalid_input(format!(
                "vector has dimension {}, expected {}",
                self.vector.len(),
                expected_dim
            )));
        }
        if self.vector.iter().any(|v| !v.is_finite()) {
            return Err(MeshError::invalid_input(
                "vector must not contain NaN or infinite components",
            ));
        }
        Ok(())
    }
}
