//! Domain Layer - Errors
//!
//! Build and mutation failures abort the whole operation. Fetch failures are
//! kept per node and can be retried.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Common result type for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

/// Result type returned by a child fetcher
pub type FetchResult<T> = Result<T, FetchError>;

/// Failure reported by the external child fetcher
///
/// Stored inside the node that issued the fetch, hence `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid page: {0}")]
    Invalid(String),
    #[error("fetch timed out after {0} ms")]
    Timeout(u64),
    #[error("fetcher is closed")]
    Closed,
}

/// Tree-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The batch handed to the builder is structurally invalid
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The child fetcher failed for one node; the rest of the tree is intact
    #[error("fetching children of {node} failed: {source}")]
    Fetch { node: String, source: FetchError },

    /// A reparent would create a cycle
    #[error("cannot move {node} under {target}: target is the node or one of its descendants")]
    CycleRejected { node: String, target: String },

    #[error("node not found: {0}")]
    NodeNotFound(String),
}

impl TreeError {
    /// Whether the caller may simply try the same operation again
    pub fn is_retryable(&self) -> bool {
        matches!(self, TreeError::Fetch { .. })
    }
}
